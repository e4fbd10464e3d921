//! Portfolio snapshot supplied by the caller.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::shared::{CurrencyCode, InstrumentId};

/// A tax lot backing part of a position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxLot {
    /// Lot identifier.
    pub lot_id: String,
    /// Units held in this lot.
    pub quantity: Decimal,
    /// Unit cost in the instrument currency.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_cost: Option<Decimal>,
    /// Acquisition date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acquired_on: Option<NaiveDate>,
}

/// A holding in one instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Instrument held.
    pub instrument_id: InstrumentId,
    /// Units held. Negative only in simulated states.
    pub quantity: Decimal,
    /// Optional lot detail.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lots: Vec<TaxLot>,
}

/// A cash ledger in one currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashBalance {
    /// Ledger currency.
    pub currency: CurrencyCode,
    /// Ledger amount.
    pub amount: Decimal,
}

/// Positions and cash of one portfolio at one point in time.
///
/// The engine never mutates a caller's snapshot. Simulation works on a clone
/// through the `adjust_*` helpers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    /// Portfolio identifier.
    pub portfolio_id: String,
    /// Base (reporting) currency.
    pub base_currency: CurrencyCode,
    /// Holdings.
    #[serde(default)]
    pub positions: Vec<Position>,
    /// Cash ledgers.
    #[serde(default)]
    pub cash_balances: Vec<CashBalance>,
}

impl PortfolioSnapshot {
    /// Cash held in a currency, zero when the ledger does not exist.
    #[must_use]
    pub fn cash(&self, currency: &CurrencyCode) -> Decimal {
        self.cash_balances
            .iter()
            .filter(|c| &c.currency == currency)
            .map(|c| c.amount)
            .sum()
    }

    /// Units held of an instrument, zero when not held.
    #[must_use]
    pub fn quantity_of(&self, instrument_id: &InstrumentId) -> Decimal {
        self.positions
            .iter()
            .filter(|p| &p.instrument_id == instrument_id)
            .map(|p| p.quantity)
            .sum()
    }

    /// Add `delta` to a cash ledger, opening it if needed.
    pub fn adjust_cash(&mut self, currency: &CurrencyCode, delta: Decimal) {
        if let Some(balance) = self.cash_balances.iter_mut().find(|c| &c.currency == currency) {
            balance.amount += delta;
        } else {
            self.cash_balances.push(CashBalance {
                currency: currency.clone(),
                amount: delta,
            });
        }
    }

    /// Add `delta` units to a position, opening it if needed.
    pub fn adjust_position(&mut self, instrument_id: &InstrumentId, delta: Decimal) {
        if let Some(position) = self
            .positions
            .iter_mut()
            .find(|p| &p.instrument_id == instrument_id)
        {
            position.quantity += delta;
        } else {
            self.positions.push(Position {
                instrument_id: instrument_id.clone(),
                quantity: delta,
                lots: Vec::new(),
            });
        }
    }

    /// Currencies with a ledger entry, ascending.
    #[must_use]
    pub fn ledger_currencies(&self) -> Vec<CurrencyCode> {
        let mut currencies: Vec<CurrencyCode> =
            self.cash_balances.iter().map(|c| c.currency.clone()).collect();
        currencies.sort();
        currencies.dedup();
        currencies
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn snapshot() -> PortfolioSnapshot {
        PortfolioSnapshot {
            portfolio_id: "pf_1".to_string(),
            base_currency: CurrencyCode::new("SGD"),
            positions: vec![Position {
                instrument_id: InstrumentId::new("EQ_1"),
                quantity: dec!(10),
                lots: Vec::new(),
            }],
            cash_balances: vec![CashBalance {
                currency: CurrencyCode::new("SGD"),
                amount: dec!(1000),
            }],
        }
    }

    #[test]
    fn adjust_cash_opens_missing_ledger() {
        let mut pf = snapshot();
        let usd = CurrencyCode::new("USD");
        assert_eq!(pf.cash(&usd), Decimal::ZERO);
        pf.adjust_cash(&usd, dec!(500));
        pf.adjust_cash(&usd, dec!(-200));
        assert_eq!(pf.cash(&usd), dec!(300));
        assert_eq!(pf.cash_balances.len(), 2);
    }

    #[test]
    fn adjust_position_on_clone_leaves_original() {
        let original = snapshot();
        let mut working = original.clone();
        working.adjust_position(&InstrumentId::new("EQ_1"), dec!(-4));
        working.adjust_position(&InstrumentId::new("EQ_2"), dec!(3));
        assert_eq!(original.quantity_of(&InstrumentId::new("EQ_1")), dec!(10));
        assert_eq!(working.quantity_of(&InstrumentId::new("EQ_1")), dec!(6));
        assert_eq!(working.quantity_of(&InstrumentId::new("EQ_2")), dec!(3));
    }

    #[test]
    fn ledger_currencies_sorted() {
        let mut pf = snapshot();
        pf.adjust_cash(&CurrencyCode::new("EUR"), dec!(1));
        let ccys: Vec<String> = pf.ledger_currencies().iter().map(ToString::to_string).collect();
        assert_eq!(ccys, vec!["EUR", "SGD"]);
    }

    #[test]
    fn snapshot_deserializes_with_lots() {
        let json = r#"{
            "portfolio_id": "pf_2",
            "base_currency": "usd",
            "positions": [{"instrument_id": "A", "quantity": "5",
                "lots": [{"lot_id": "L1", "quantity": "5", "acquired_on": "2024-01-02"}]}]
        }"#;
        let pf: PortfolioSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(pf.base_currency.as_str(), "USD");
        assert_eq!(pf.positions[0].lots.len(), 1);
        assert!(pf.cash_balances.is_empty());
    }
}
