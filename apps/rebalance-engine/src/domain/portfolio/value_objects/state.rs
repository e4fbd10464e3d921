//! Valued portfolio state.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::CASH_BUCKET;
use crate::domain::shared::{CurrencyCode, InstrumentId, Money};

/// One row of an allocation table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationRow {
    /// Bucket key.
    pub key: String,
    /// Weight of the bucket, quantised to four places.
    pub weight: Decimal,
    /// Value of the bucket in base currency.
    pub value: Money,
}

/// A valued position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionValuation {
    /// Instrument held.
    pub instrument_id: InstrumentId,
    /// Units held.
    pub quantity: Decimal,
    /// Unit price used, if quoted.
    pub price: Option<Decimal>,
    /// Price currency, if quoted.
    pub currency: Option<CurrencyCode>,
    /// Value in base currency. Zero when the price or rate is missing.
    pub value_base: Money,
    /// Weight in the portfolio, quantised to four places.
    pub weight: Decimal,
}

/// A valued cash ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashValuation {
    /// Ledger currency.
    pub currency: CurrencyCode,
    /// Ledger amount in its own currency.
    pub amount: Money,
    /// Value in base currency. Zero when the rate is missing.
    pub value_base: Money,
}

/// Portfolio valued in base currency with allocation tables.
///
/// Weights within one allocation table sum to 1 up to rounding. They may be
/// negative while a simulated cash ledger is overdrawn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatedState {
    /// Base currency.
    pub base_currency: CurrencyCode,
    /// Total value in base currency.
    pub total_value: Money,
    /// Valued positions, ascending by instrument.
    pub positions: Vec<PositionValuation>,
    /// Valued cash ledgers, ascending by currency.
    pub cash_balances: Vec<CashValuation>,
    /// Allocation by shelf asset class, plus the cash bucket.
    pub allocation_by_asset_class: Vec<AllocationRow>,
    /// Allocation by instrument, plus the cash bucket.
    pub allocation_by_instrument: Vec<AllocationRow>,
    /// Allocation by each shelf attribute key.
    pub allocation_by_attribute: BTreeMap<String, Vec<AllocationRow>>,
}

impl SimulatedState {
    /// Weight of the cash bucket.
    #[must_use]
    pub fn cash_weight(&self) -> Decimal {
        row_weight(&self.allocation_by_asset_class, CASH_BUCKET)
    }

    /// Quantised weight of an instrument.
    #[must_use]
    pub fn instrument_weight(&self, instrument_id: &InstrumentId) -> Decimal {
        row_weight(&self.allocation_by_instrument, instrument_id.as_str())
    }

    /// Base-currency value of an instrument holding.
    #[must_use]
    pub fn position_value(&self, instrument_id: &InstrumentId) -> Decimal {
        self.positions
            .iter()
            .filter(|p| &p.instrument_id == instrument_id)
            .map(|p| p.value_base.amount)
            .sum()
    }

    /// Unrounded weight of an instrument holding.
    #[must_use]
    pub fn exact_weight(&self, instrument_id: &InstrumentId) -> Decimal {
        if self.total_value.amount.is_zero() {
            return Decimal::ZERO;
        }
        self.position_value(instrument_id) / self.total_value.amount
    }

    /// Asset-class weights keyed by bucket.
    #[must_use]
    pub fn asset_class_weights(&self) -> BTreeMap<String, Decimal> {
        table_weights(&self.allocation_by_asset_class)
    }

    /// Instrument weights keyed by instrument, including the cash bucket.
    #[must_use]
    pub fn instrument_weights(&self) -> BTreeMap<String, Decimal> {
        table_weights(&self.allocation_by_instrument)
    }
}

fn row_weight(rows: &[AllocationRow], key: &str) -> Decimal {
    rows.iter()
        .find(|r| r.key == key)
        .map_or(Decimal::ZERO, |r| r.weight)
}

fn table_weights(rows: &[AllocationRow]) -> BTreeMap<String, Decimal> {
    rows.iter().map(|r| (r.key.clone(), r.weight)).collect()
}
