//! Request DTOs
//!
//! Caller-facing envelopes around the engine inputs. Volatile fields
//! (`idempotency_key`, `correlation_id`, `requested_at`) never take part in
//! the canonical request hash.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::portfolio::{
    MarketDataSnapshot, ModelPortfolio, PortfolioSnapshot, ReferenceModel, ShelfEntry,
};
use crate::domain::rebalance::value_objects::{EngineOptions, ProposedCashFlow, ProposedTrade};
use crate::domain::rebalance::{ProposalInputs, RebalanceInputs};
use crate::error::EngineError;

/// Fields excluded from the canonical request hash.
pub const VOLATILE_FIELDS: [&str; 3] = ["idempotency_key", "correlation_id", "requested_at"];

/// Request DTO for a model-driven rebalance run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebalanceRequest {
    /// Portfolio to rebalance.
    pub portfolio: PortfolioSnapshot,
    /// Prices and FX rates.
    pub market_data: MarketDataSnapshot,
    /// Target model.
    pub model: ModelPortfolio,
    /// Shelf entries.
    #[serde(default)]
    pub shelf: Vec<ShelfEntry>,
    /// Options. Configured defaults apply when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<EngineOptions>,
    /// Reference model for drift analytics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_model: Option<ReferenceModel>,
    /// Idempotency key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
    /// Caller correlation id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    /// Request time. Defaults to the time the request is handled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_at: Option<DateTime<Utc>>,
}

impl RebalanceRequest {
    /// Validate the request at the boundary.
    ///
    /// # Errors
    ///
    /// Returns `INVALID_REQUEST` for malformed snapshots and `INVALID_OPTIONS`
    /// for invalid option combinations.
    pub fn validate(&self) -> Result<(), EngineError> {
        validate_snapshots(&self.portfolio, &self.market_data)?;
        if self.model.targets.iter().any(|t| t.weight < Decimal::ZERO) {
            return Err(EngineError::invalid_request(
                "model.targets",
                "weights must not be negative",
            ));
        }
        validate_idempotency_key(self.idempotency_key.as_deref())?;
        if let Some(options) = &self.options {
            options.validate().map_err(|e| EngineError::invalid_options(&e))?;
        }
        Ok(())
    }

    /// Resolve engine inputs, falling back to `defaults` for options.
    #[must_use]
    pub fn to_inputs(&self, defaults: &EngineOptions) -> RebalanceInputs {
        RebalanceInputs {
            portfolio: self.portfolio.clone(),
            market_data: self.market_data.clone(),
            model: self.model.clone(),
            shelf: self.shelf.clone(),
            options: self.options.clone().unwrap_or_else(|| defaults.clone()),
            reference_model: self.reference_model.clone(),
        }
    }
}

/// Request DTO for an advisory proposal simulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalRequest {
    /// Portfolio the proposal applies to.
    pub portfolio: PortfolioSnapshot,
    /// Prices and FX rates.
    pub market_data: MarketDataSnapshot,
    /// Shelf entries.
    #[serde(default)]
    pub shelf: Vec<ShelfEntry>,
    /// Options. Configured defaults apply when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<EngineOptions>,
    /// Proposed cash flows.
    #[serde(default)]
    pub proposed_cash_flows: Vec<ProposedCashFlow>,
    /// Proposed trades.
    #[serde(default)]
    pub proposed_trades: Vec<ProposedTrade>,
    /// Reference model for drift analytics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_model: Option<ReferenceModel>,
    /// Idempotency key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
    /// Caller correlation id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    /// Request time. Defaults to the time the request is handled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_at: Option<DateTime<Utc>>,
}

impl ProposalRequest {
    /// Validate the request at the boundary.
    ///
    /// # Errors
    ///
    /// Returns `INVALID_REQUEST` for malformed snapshots or trades and
    /// `INVALID_OPTIONS` for invalid option combinations.
    pub fn validate(&self) -> Result<(), EngineError> {
        validate_snapshots(&self.portfolio, &self.market_data)?;
        for (index, trade) in self.proposed_trades.iter().enumerate() {
            trade.validate().map_err(|e| {
                EngineError::invalid_request(&format!("proposed_trades[{index}]"), e.to_string())
            })?;
        }
        if self.proposed_cash_flows.iter().any(|cf| cf.currency.is_empty()) {
            return Err(EngineError::invalid_request(
                "proposed_cash_flows",
                "currency must not be empty",
            ));
        }
        validate_idempotency_key(self.idempotency_key.as_deref())?;
        if let Some(options) = &self.options {
            options.validate().map_err(|e| EngineError::invalid_options(&e))?;
        }
        Ok(())
    }

    /// Resolve engine inputs, falling back to `defaults` for options.
    #[must_use]
    pub fn to_inputs(&self, defaults: &EngineOptions) -> ProposalInputs {
        ProposalInputs {
            portfolio: self.portfolio.clone(),
            market_data: self.market_data.clone(),
            shelf: self.shelf.clone(),
            options: self.options.clone().unwrap_or_else(|| defaults.clone()),
            cash_flows: self.proposed_cash_flows.clone(),
            trades: self.proposed_trades.clone(),
            reference_model: self.reference_model.clone(),
        }
    }
}

fn validate_snapshots(
    portfolio: &PortfolioSnapshot,
    market_data: &MarketDataSnapshot,
) -> Result<(), EngineError> {
    if portfolio.base_currency.is_empty() {
        return Err(EngineError::invalid_request(
            "portfolio.base_currency",
            "must not be empty",
        ));
    }

    let mut seen = BTreeSet::new();
    for position in &portfolio.positions {
        if !seen.insert(&position.instrument_id) {
            return Err(EngineError::invalid_request(
                "portfolio.positions",
                format!("duplicate instrument {}", position.instrument_id),
            ));
        }
    }

    if let Some(price) = market_data.prices.iter().find(|p| p.price < Decimal::ZERO) {
        return Err(EngineError::invalid_request(
            "market_data.prices",
            format!("negative price for {}", price.instrument_id),
        ));
    }
    for rate in &market_data.fx_rates {
        if rate.rate < Decimal::ZERO {
            return Err(EngineError::invalid_request(
                "market_data.fx_rates",
                format!("negative rate for {}", rate.pair),
            ));
        }
        if rate.currencies().is_none() {
            return Err(EngineError::invalid_request(
                "market_data.fx_rates",
                format!("pair '{}' must be <BASE>/<QUOTE>", rate.pair),
            ));
        }
    }
    Ok(())
}

fn validate_idempotency_key(key: Option<&str>) -> Result<(), EngineError> {
    if key.is_some_and(|k| k.trim().is_empty()) {
        return Err(EngineError::invalid_request(
            "idempotency_key",
            "must not be blank",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use rust_decimal_macros::dec;

    fn request() -> RebalanceRequest {
        let json = r#"{
            "portfolio": {
                "portfolio_id": "pf_1",
                "base_currency": "USD",
                "positions": [{"instrument_id": "EQ_1", "quantity": "10"}],
                "cash_balances": [{"currency": "USD", "amount": "1000"}]
            },
            "market_data": {
                "prices": [{"instrument_id": "EQ_1", "price": "100", "currency": "USD"}],
                "fx_rates": [{"pair": "USD/SGD", "rate": "1.35"}]
            },
            "model": {"model_id": "m_1", "targets": [{"instrument_id": "EQ_1", "weight": "1"}]}
        }"#;
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn valid_request_passes() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn duplicate_positions_rejected() {
        let mut req = request();
        req.portfolio.positions.push(req.portfolio.positions[0].clone());
        let err = req.validate().unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
        assert_eq!(
            err.details().get("field").map(String::as_str),
            Some("portfolio.positions")
        );
    }

    #[test]
    fn negative_price_rejected() {
        let mut req = request();
        req.market_data.prices[0].price = dec!(-1);
        assert_eq!(req.validate().unwrap_err().code(), ErrorCode::InvalidRequest);
    }

    #[test]
    fn malformed_pair_rejected() {
        let mut req = request();
        req.market_data.fx_rates[0].pair = "USDSGD".to_string();
        assert_eq!(req.validate().unwrap_err().code(), ErrorCode::InvalidRequest);
    }

    #[test]
    fn invalid_options_use_their_own_code() {
        let mut req = request();
        req.options = Some(EngineOptions {
            cash_band_min_weight: dec!(0.5),
            cash_band_max_weight: dec!(0.1),
            ..EngineOptions::default()
        });
        assert_eq!(req.validate().unwrap_err().code(), ErrorCode::InvalidOptions);
    }

    #[test]
    fn request_options_win_over_defaults() {
        let defaults = EngineOptions {
            min_trade_notional: Some(dec!(50)),
            ..EngineOptions::default()
        };
        let mut req = request();
        assert_eq!(req.to_inputs(&defaults).options.min_trade_notional, Some(dec!(50)));

        req.options = Some(EngineOptions::default());
        assert_eq!(req.to_inputs(&defaults).options.min_trade_notional, None);
    }

    #[test]
    fn proposal_trade_sizing_checked() {
        let json = r#"{
            "portfolio": {"portfolio_id": "pf_1", "base_currency": "USD"},
            "market_data": {},
            "proposed_trades": [{"side": "BUY", "instrument_id": "EQ_1"}]
        }"#;
        let req: ProposalRequest = serde_json::from_str(json).unwrap();
        let err = req.validate().unwrap_err();
        assert_eq!(
            err.details().get("field").map(String::as_str),
            Some("proposed_trades[0]")
        );
    }
}
