//! Caller-proposed cash flows and trades for advisory runs.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::TradeSide;
use crate::domain::shared::{CurrencyCode, DomainError, InstrumentId, Money};

/// A signed cash movement. Negative amounts are withdrawals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposedCashFlow {
    /// Ledger currency.
    pub currency: CurrencyCode,
    /// Signed amount.
    pub amount: Decimal,
}

/// A proposed trade, sized by quantity or by notional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposedTrade {
    /// Side.
    pub side: TradeSide,
    /// Instrument to trade.
    pub instrument_id: InstrumentId,
    /// Units to trade.
    #[serde(default)]
    pub quantity: Option<Decimal>,
    /// Amount to trade; converted to whole units at the quoted price.
    #[serde(default)]
    pub notional: Option<Money>,
}

impl ProposedTrade {
    /// Check the trade is sized exactly one way with a positive amount.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidValue` when sizing is missing, ambiguous or
    /// not positive.
    pub fn validate(&self) -> Result<(), DomainError> {
        match (&self.quantity, &self.notional) {
            (Some(q), None) if *q > Decimal::ZERO => Ok(()),
            (None, Some(n)) if n.amount > Decimal::ZERO => Ok(()),
            (Some(_), Some(_)) => Err(DomainError::invalid(
                "proposed_trades",
                "quantity and notional are mutually exclusive",
            )),
            (None, None) => Err(DomainError::invalid(
                "proposed_trades",
                "one of quantity or notional is required",
            )),
            _ => Err(DomainError::invalid("proposed_trades", "size must be positive")),
        }
    }
}
