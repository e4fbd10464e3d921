//! Universe builder: classifies every referenced instrument.

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::portfolio::{
    MarketDataSnapshot, ModelPortfolio, PortfolioSnapshot, Shelf, ShelfStatus, SimulatedState,
    pair_label,
};
use crate::domain::rebalance::value_objects::{DiagnosticsData, EngineOptions};
use crate::domain::shared::{CurrencyCode, InstrumentId};

/// Held instrument without a shelf entry.
pub const LOCKED_DUE_TO_MISSING_SHELF: &str = "LOCKED_DUE_TO_MISSING_SHELF";
/// Shelf status BANNED.
pub const SHELF_STATUS_BANNED: &str = "SHELF_STATUS_BANNED";
/// Shelf status RESTRICTED without `allow_restricted`.
pub const SHELF_STATUS_RESTRICTED: &str = "SHELF_STATUS_RESTRICTED";
/// Shelf status SUSPENDED.
pub const LOCKED_DUE_TO_SUSPENDED: &str = "LOCKED_DUE_TO_SUSPENDED";
/// No price quoted.
pub const LOCKED_DUE_TO_MISSING_PRICE: &str = "LOCKED_DUE_TO_MISSING_PRICE";
/// No rate from the price currency to base.
pub const LOCKED_DUE_TO_MISSING_FX: &str = "LOCKED_DUE_TO_MISSING_FX";

/// What a run may do with an instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tradeability {
    /// May buy and sell.
    Tradeable,
    /// May only reduce.
    SellOnly,
    /// May not trade; weight held at current.
    Locked,
}

/// One classified instrument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniverseEntry {
    /// Instrument.
    pub instrument_id: InstrumentId,
    /// Classification.
    pub tradeability: Tradeability,
    /// Model weight.
    pub model_weight: Decimal,
    /// Current exact weight.
    pub current_weight: Decimal,
    /// Current base-currency value.
    pub current_value: Decimal,
    /// Units held.
    pub current_quantity: Decimal,
    /// Unit price, when quoted.
    pub price: Option<Decimal>,
    /// Price currency, when quoted.
    pub currency: Option<CurrencyCode>,
    /// Rate from price currency to base, when quoted.
    pub fx_to_base: Option<Decimal>,
    /// Why the instrument is locked.
    pub reason: Option<&'static str>,
}

impl UniverseEntry {
    /// Whether the instrument may receive redistributed weight.
    #[must_use]
    pub fn is_buy_eligible(&self) -> bool {
        self.tradeability == Tradeability::Tradeable && self.model_weight > Decimal::ZERO
    }
}

/// Classified instruments of one run.
#[derive(Debug, Clone)]
pub struct Universe {
    /// Entries ascending by instrument.
    pub entries: Vec<UniverseEntry>,
    /// Before-state total value in base currency.
    pub total_value: Decimal,
}

impl Universe {
    /// Entry for an instrument.
    #[must_use]
    pub fn get(&self, instrument_id: &InstrumentId) -> Option<&UniverseEntry> {
        self.entries.iter().find(|e| &e.instrument_id == instrument_id)
    }

    /// Current weight held in locked instruments.
    #[must_use]
    pub fn locked_weight(&self) -> Decimal {
        self.entries
            .iter()
            .filter(|e| e.tradeability == Tradeability::Locked)
            .map(|e| e.current_weight)
            .sum()
    }

    /// Instruments eligible to receive new weight.
    #[must_use]
    pub fn buy_list(&self) -> BTreeSet<InstrumentId> {
        self.entries
            .iter()
            .filter(|e| e.is_buy_eligible())
            .map(|e| e.instrument_id.clone())
            .collect()
    }
}

/// Classify every instrument in the model or held in the portfolio.
///
/// Missing reference data is recorded in `diagnostics`; this never fails.
#[must_use]
pub fn build_universe(
    portfolio: &PortfolioSnapshot,
    before: &SimulatedState,
    market: &MarketDataSnapshot,
    model: &ModelPortfolio,
    shelf: &Shelf,
    options: &EngineOptions,
    diagnostics: &mut DiagnosticsData,
) -> Universe {
    let base = &portfolio.base_currency;
    let model_weights = model.weights();
    let mut ids: BTreeSet<InstrumentId> = model_weights.keys().cloned().collect();
    ids.extend(
        portfolio
            .positions
            .iter()
            .filter(|p| !p.quantity.is_zero())
            .map(|p| p.instrument_id.clone()),
    );

    let total_value = before.total_value.amount;
    let mut entries = Vec::with_capacity(ids.len());
    for instrument_id in ids {
        let price = market.price_of(&instrument_id);
        let fx_to_base = price.and_then(|p| market.fx_rate(&p.currency, base));
        let current_quantity = portfolio.quantity_of(&instrument_id);

        let (mut tradeability, mut reason) = match shelf.get(&instrument_id) {
            None => {
                diagnostics.record_missing_shelf(&instrument_id);
                // Only held instruments carry the exclusion flag.
                let flag = (!current_quantity.is_zero()).then_some(LOCKED_DUE_TO_MISSING_SHELF);
                (Tradeability::Locked, flag)
            }
            Some(entry) => match entry.status {
                ShelfStatus::Banned => (Tradeability::Locked, Some(SHELF_STATUS_BANNED)),
                ShelfStatus::Suspended => (Tradeability::Locked, Some(LOCKED_DUE_TO_SUSPENDED)),
                ShelfStatus::Restricted if !options.allow_restricted => {
                    (Tradeability::Locked, Some(SHELF_STATUS_RESTRICTED))
                }
                ShelfStatus::SellOnly => (Tradeability::SellOnly, None),
                ShelfStatus::Approved | ShelfStatus::Restricted => (Tradeability::Tradeable, None),
            },
        };

        if tradeability != Tradeability::Locked {
            match price {
                None => {
                    diagnostics.record_missing_price(&instrument_id);
                    tradeability = Tradeability::Locked;
                    reason = Some(LOCKED_DUE_TO_MISSING_PRICE);
                }
                Some(p) if fx_to_base.is_none() => {
                    diagnostics.record_missing_fx(pair_label(&p.currency, base));
                    tradeability = Tradeability::Locked;
                    reason = Some(LOCKED_DUE_TO_MISSING_FX);
                }
                Some(_) => {}
            }
        }
        if let Some(code) = reason {
            diagnostics.exclude(&instrument_id, code);
        }

        let current_value = before.position_value(&instrument_id);
        let current_weight = if total_value.is_zero() {
            Decimal::ZERO
        } else {
            current_value / total_value
        };
        entries.push(UniverseEntry {
            model_weight: model_weights
                .get(&instrument_id)
                .copied()
                .unwrap_or(Decimal::ZERO),
            current_quantity,
            price: price.map(|p| p.price),
            currency: price.map(|p| p.currency.clone()),
            instrument_id,
            tradeability,
            current_weight,
            current_value,
            fx_to_base,
            reason,
        });
    }

    Universe {
        entries,
        total_value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::portfolio::{
        CashBalance, ModelTarget, Position, Price, ShelfEntry, value_portfolio,
    };
    use rust_decimal_macros::dec;

    fn fixture(
        statuses: &[(&str, ShelfStatus)],
        options: &EngineOptions,
    ) -> (Universe, DiagnosticsData) {
        let portfolio = PortfolioSnapshot {
            portfolio_id: "pf".to_string(),
            base_currency: CurrencyCode::new("USD"),
            positions: vec![
                Position {
                    instrument_id: InstrumentId::new("HELD"),
                    quantity: dec!(10),
                    lots: Vec::new(),
                },
                Position {
                    instrument_id: InstrumentId::new("ORPHAN"),
                    quantity: dec!(1),
                    lots: Vec::new(),
                },
            ],
            cash_balances: vec![CashBalance {
                currency: CurrencyCode::new("USD"),
                amount: dec!(1000),
            }],
        };
        let market = MarketDataSnapshot {
            prices: ["HELD", "ORPHAN", "NEW"]
                .iter()
                .map(|id| Price {
                    instrument_id: InstrumentId::new(*id),
                    price: dec!(10),
                    currency: CurrencyCode::new("USD"),
                })
                .collect(),
            fx_rates: Vec::new(),
        };
        let model = ModelPortfolio {
            model_id: "m".to_string(),
            targets: vec![
                ModelTarget {
                    instrument_id: InstrumentId::new("HELD"),
                    weight: dec!(0.5),
                },
                ModelTarget {
                    instrument_id: InstrumentId::new("NEW"),
                    weight: dec!(0.4),
                },
            ],
        };
        let shelf = Shelf::new(
            statuses
                .iter()
                .map(|(id, status)| ShelfEntry::new(*id, *status))
                .collect(),
        );
        let before = value_portfolio(&portfolio, &market, &shelf).state;
        let mut diagnostics = DiagnosticsData::default();
        let universe = build_universe(
            &portfolio,
            &before,
            &market,
            &model,
            &shelf,
            options,
            &mut diagnostics,
        );
        (universe, diagnostics)
    }

    #[test]
    fn missing_shelf_locks_and_flags() {
        let (universe, diagnostics) = fixture(
            &[("HELD", ShelfStatus::Approved), ("NEW", ShelfStatus::Approved)],
            &EngineOptions::default(),
        );
        let orphan = universe.get(&InstrumentId::new("ORPHAN")).unwrap();
        assert_eq!(orphan.tradeability, Tradeability::Locked);
        assert_eq!(orphan.reason, Some(LOCKED_DUE_TO_MISSING_SHELF));
        assert_eq!(diagnostics.data_quality.shelf_missing, vec![InstrumentId::new("ORPHAN")]);
        assert_eq!(universe.locked_weight().round_dp(6), dec!(0.009009));
    }

    #[test]
    fn unheld_missing_shelf_locks_without_flag() {
        let (universe, diagnostics) = fixture(
            &[("HELD", ShelfStatus::Approved), ("ORPHAN", ShelfStatus::Approved)],
            &EngineOptions::default(),
        );
        let new = universe.get(&InstrumentId::new("NEW")).unwrap();
        assert_eq!(new.tradeability, Tradeability::Locked);
        assert_eq!(new.reason, None);
        assert!(!universe.buy_list().contains(&new.instrument_id));
        assert_eq!(diagnostics.data_quality.shelf_missing, vec![InstrumentId::new("NEW")]);
        assert!(diagnostics.excluded_instruments.is_empty());
    }

    #[test]
    fn restricted_needs_allowance() {
        let statuses = [
            ("HELD", ShelfStatus::Restricted),
            ("NEW", ShelfStatus::Approved),
            ("ORPHAN", ShelfStatus::Approved),
        ];
        let (universe, _) = fixture(&statuses, &EngineOptions::default());
        assert_eq!(
            universe.get(&InstrumentId::new("HELD")).unwrap().reason,
            Some(SHELF_STATUS_RESTRICTED)
        );
        let allow = EngineOptions {
            allow_restricted: true,
            ..EngineOptions::default()
        };
        let (universe, _) = fixture(&statuses, &allow);
        assert_eq!(
            universe.get(&InstrumentId::new("HELD")).unwrap().tradeability,
            Tradeability::Tradeable
        );
    }

    #[test]
    fn sell_only_and_suspended() {
        let (universe, diagnostics) = fixture(
            &[
                ("HELD", ShelfStatus::SellOnly),
                ("NEW", ShelfStatus::Suspended),
                ("ORPHAN", ShelfStatus::Banned),
            ],
            &EngineOptions::default(),
        );
        assert_eq!(
            universe.get(&InstrumentId::new("HELD")).unwrap().tradeability,
            Tradeability::SellOnly
        );
        assert_eq!(
            universe.get(&InstrumentId::new("NEW")).unwrap().reason,
            Some(LOCKED_DUE_TO_SUSPENDED)
        );
        assert!(universe.buy_list().is_empty());
        assert_eq!(diagnostics.excluded_instruments.len(), 2);
    }

    #[test]
    fn buy_list_requires_model_weight() {
        let (universe, _) = fixture(
            &[
                ("HELD", ShelfStatus::Approved),
                ("NEW", ShelfStatus::Approved),
                ("ORPHAN", ShelfStatus::Approved),
            ],
            &EngineOptions::default(),
        );
        let buy_list: Vec<String> = universe.buy_list().iter().map(ToString::to_string).collect();
        assert_eq!(buy_list, vec!["HELD", "NEW"]);
    }
}
