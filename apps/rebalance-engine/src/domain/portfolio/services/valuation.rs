//! Valuation of a portfolio snapshot into a simulated state.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::domain::portfolio::value_objects::{
    AllocationRow, CASH_BUCKET, CashValuation, MarketDataSnapshot, PortfolioSnapshot,
    PositionValuation, Shelf, SimulatedState, UNCLASSIFIED_BUCKET, pair_label,
};
use crate::domain::shared::{InstrumentId, Money, quantize_weight};

/// Bucket used in attribute tables for instruments without the attribute.
pub const UNASSIGNED_BUCKET: &str = "UNASSIGNED";

/// Result of valuing a snapshot.
#[derive(Debug, Clone)]
pub struct ValuationOutcome {
    /// The valued state.
    pub state: SimulatedState,
    /// Held instruments without a price, ascending.
    pub missing_prices: Vec<InstrumentId>,
    /// Pairs (`CCY/BASE`) needed but not quoted, ascending.
    pub missing_fx: Vec<String>,
}

/// Value a portfolio in its base currency.
///
/// Holdings with a missing price or rate are carried at zero value and
/// reported in the outcome; valuation itself never fails.
#[must_use]
pub fn value_portfolio(
    portfolio: &PortfolioSnapshot,
    market: &MarketDataSnapshot,
    shelf: &Shelf,
) -> ValuationOutcome {
    let base = portfolio.base_currency.clone();
    let mut missing_prices = Vec::new();
    let mut missing_fx = Vec::new();

    let mut quantities: BTreeMap<InstrumentId, Decimal> = BTreeMap::new();
    for position in &portfolio.positions {
        *quantities
            .entry(position.instrument_id.clone())
            .or_insert(Decimal::ZERO) += position.quantity;
    }

    let mut positions = Vec::new();
    for (instrument_id, quantity) in quantities {
        if quantity.is_zero() {
            continue;
        }
        let price = market.price_of(&instrument_id);
        let value = match price {
            None => {
                missing_prices.push(instrument_id.clone());
                Decimal::ZERO
            }
            Some(p) => match market.fx_rate(&p.currency, &base) {
                Some(rate) => quantity * p.price * rate,
                None => {
                    missing_fx.push(pair_label(&p.currency, &base));
                    Decimal::ZERO
                }
            },
        };
        positions.push(PositionValuation {
            instrument_id,
            quantity,
            price: price.map(|p| p.price),
            currency: price.map(|p| p.currency.clone()),
            value_base: Money::quantized(value, base.clone()),
            weight: Decimal::ZERO,
        });
    }

    let mut cash_by_currency = BTreeMap::new();
    for balance in &portfolio.cash_balances {
        *cash_by_currency
            .entry(balance.currency.clone())
            .or_insert(Decimal::ZERO) += balance.amount;
    }
    let mut cash_balances = Vec::new();
    for (currency, amount) in cash_by_currency {
        let value = market.convert(amount, &currency, &base).unwrap_or_else(|| {
            missing_fx.push(pair_label(&currency, &base));
            Decimal::ZERO
        });
        cash_balances.push(CashValuation {
            amount: Money::quantized(amount, currency.clone()),
            currency,
            value_base: Money::quantized(value, base.clone()),
        });
    }

    let positions_total: Decimal = positions.iter().map(|p| p.value_base.amount).sum();
    let cash_total: Decimal = cash_balances.iter().map(|c| c.value_base.amount).sum();
    let total = positions_total + cash_total;
    let weight = |value: Decimal| {
        if total.is_zero() {
            quantize_weight(Decimal::ZERO)
        } else {
            quantize_weight(value / total)
        }
    };
    for position in &mut positions {
        position.weight = weight(position.value_base.amount);
    }

    let has_cash = !cash_balances.is_empty();
    let mut by_asset_class: BTreeMap<String, Decimal> = BTreeMap::new();
    let mut by_instrument: BTreeMap<String, Decimal> = BTreeMap::new();
    let attribute_keys = shelf.attribute_keys();
    let mut by_attribute: BTreeMap<String, BTreeMap<String, Decimal>> = BTreeMap::new();
    for position in &positions {
        let entry = shelf.get(&position.instrument_id);
        let asset_class = entry
            .and_then(|e| e.asset_class.clone())
            .unwrap_or_else(|| UNCLASSIFIED_BUCKET.to_string());
        *by_asset_class.entry(asset_class).or_insert(Decimal::ZERO) += position.value_base.amount;
        *by_instrument
            .entry(position.instrument_id.to_string())
            .or_insert(Decimal::ZERO) += position.value_base.amount;
        for key in &attribute_keys {
            let bucket = entry
                .and_then(|e| e.attributes.get(key).cloned())
                .unwrap_or_else(|| UNASSIGNED_BUCKET.to_string());
            *by_attribute
                .entry(key.clone())
                .or_default()
                .entry(bucket)
                .or_insert(Decimal::ZERO) += position.value_base.amount;
        }
    }
    if has_cash {
        by_asset_class.insert(CASH_BUCKET.to_string(), cash_total);
        by_instrument.insert(CASH_BUCKET.to_string(), cash_total);
        for key in &attribute_keys {
            by_attribute
                .entry(key.clone())
                .or_default()
                .insert(CASH_BUCKET.to_string(), cash_total);
        }
    }

    let rows = |table: BTreeMap<String, Decimal>| -> Vec<AllocationRow> {
        table
            .into_iter()
            .map(|(key, value)| AllocationRow {
                key,
                weight: weight(value),
                value: Money::quantized(value, base.clone()),
            })
            .collect()
    };

    missing_fx.sort();
    missing_fx.dedup();

    let state = SimulatedState {
        base_currency: base.clone(),
        total_value: Money::quantized(total, base.clone()),
        positions,
        cash_balances,
        allocation_by_asset_class: rows(by_asset_class),
        allocation_by_instrument: rows(by_instrument),
        allocation_by_attribute: by_attribute
            .into_iter()
            .map(|(key, table)| (key, rows(table)))
            .collect(),
    };

    ValuationOutcome {
        state,
        missing_prices,
        missing_fx,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::portfolio::value_objects::{
        CashBalance, FxRate, Position, Price, ShelfEntry, ShelfStatus,
    };
    use crate::domain::shared::CurrencyCode;
    use rust_decimal_macros::dec;

    fn portfolio() -> PortfolioSnapshot {
        PortfolioSnapshot {
            portfolio_id: "pf".to_string(),
            base_currency: CurrencyCode::new("SGD"),
            positions: vec![
                Position {
                    instrument_id: InstrumentId::new("US_EQ"),
                    quantity: dec!(10),
                    lots: Vec::new(),
                },
                Position {
                    instrument_id: InstrumentId::new("SG_BOND"),
                    quantity: dec!(20),
                    lots: Vec::new(),
                },
            ],
            cash_balances: vec![CashBalance {
                currency: CurrencyCode::new("SGD"),
                amount: dec!(650),
            }],
        }
    }

    fn market() -> MarketDataSnapshot {
        MarketDataSnapshot {
            prices: vec![
                Price {
                    instrument_id: InstrumentId::new("US_EQ"),
                    price: dec!(100),
                    currency: CurrencyCode::new("USD"),
                },
                Price {
                    instrument_id: InstrumentId::new("SG_BOND"),
                    price: dec!(50),
                    currency: CurrencyCode::new("SGD"),
                },
            ],
            fx_rates: vec![FxRate {
                pair: "USD/SGD".to_string(),
                rate: dec!(1.35),
            }],
        }
    }

    fn shelf() -> Shelf {
        Shelf::new(vec![
            ShelfEntry::new("US_EQ", ShelfStatus::Approved)
                .with_asset_class("EQUITY")
                .with_attribute("region", "US"),
            ShelfEntry::new("SG_BOND", ShelfStatus::Approved).with_asset_class("FIXED_INCOME"),
        ])
    }

    #[test]
    fn values_positions_and_cash_in_base() {
        let outcome = value_portfolio(&portfolio(), &market(), &shelf());
        let state = outcome.state;
        // 10 * 100 * 1.35 + 20 * 50 + 650
        assert_eq!(state.total_value.amount, dec!(3000.00));
        assert_eq!(state.instrument_weight(&InstrumentId::new("US_EQ")), dec!(0.4500));
        assert_eq!(state.cash_weight(), dec!(0.2167));
        assert!(outcome.missing_prices.is_empty());
        assert!(outcome.missing_fx.is_empty());
    }

    #[test]
    fn attribute_table_has_unassigned_and_cash() {
        let state = value_portfolio(&portfolio(), &market(), &shelf()).state;
        let region = &state.allocation_by_attribute["region"];
        let keys: Vec<&str> = region.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["CASH", "UNASSIGNED", "US"]);
    }

    #[test]
    fn missing_price_and_fx_are_reported_not_fatal() {
        let mut pf = portfolio();
        pf.positions.push(Position {
            instrument_id: InstrumentId::new("UNPRICED"),
            quantity: dec!(1),
            lots: Vec::new(),
        });
        pf.cash_balances.push(CashBalance {
            currency: CurrencyCode::new("EUR"),
            amount: dec!(100),
        });
        let outcome = value_portfolio(&pf, &market(), &shelf());
        assert_eq!(outcome.missing_prices, vec![InstrumentId::new("UNPRICED")]);
        assert_eq!(outcome.missing_fx, vec!["EUR/SGD".to_string()]);
        assert_eq!(outcome.state.total_value.amount, dec!(3000.00));
    }

    #[test]
    fn empty_portfolio_has_zero_weights() {
        let pf = PortfolioSnapshot {
            portfolio_id: "empty".to_string(),
            base_currency: CurrencyCode::new("USD"),
            positions: Vec::new(),
            cash_balances: Vec::new(),
        };
        let state = value_portfolio(&pf, &market(), &shelf()).state;
        assert!(state.total_value.is_zero());
        assert!(state.allocation_by_instrument.is_empty());
        assert_eq!(state.cash_weight(), Decimal::ZERO);
    }
}
