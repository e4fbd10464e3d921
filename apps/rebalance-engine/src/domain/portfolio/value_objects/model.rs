//! Target and reference models.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Shelf;
use crate::domain::shared::InstrumentId;

/// Bucket key for cash in allocation tables and reference models.
pub const CASH_BUCKET: &str = "CASH";

/// Bucket key for instruments without a classification.
pub const UNCLASSIFIED_BUCKET: &str = "UNCLASSIFIED";

/// One instrument weight in a model portfolio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelTarget {
    /// Target instrument.
    pub instrument_id: InstrumentId,
    /// Advisory target weight.
    pub weight: Decimal,
}

/// Instrument-level target model used for rebalancing.
///
/// Weights are advisory. They need not sum to 1 once governance exclusions
/// have been applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelPortfolio {
    /// Model identifier.
    pub model_id: String,
    /// Instrument targets.
    #[serde(default)]
    pub targets: Vec<ModelTarget>,
}

impl ModelPortfolio {
    /// Model weight for an instrument, zero when absent.
    #[must_use]
    pub fn weight_of(&self, instrument_id: &InstrumentId) -> Decimal {
        self.targets
            .iter()
            .filter(|t| &t.instrument_id == instrument_id)
            .map(|t| t.weight)
            .sum()
    }

    /// Weights keyed by instrument.
    #[must_use]
    pub fn weights(&self) -> BTreeMap<InstrumentId, Decimal> {
        let mut weights = BTreeMap::new();
        for target in &self.targets {
            *weights.entry(target.instrument_id.clone()).or_insert(Decimal::ZERO) += target.weight;
        }
        weights
    }
}

/// Reference model used for drift analytics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceModel {
    /// Model identifier.
    pub model_id: String,
    /// Target weight per asset class bucket.
    #[serde(default)]
    pub asset_class_targets: BTreeMap<String, Decimal>,
    /// Target weight per instrument.
    #[serde(default)]
    pub instrument_targets: BTreeMap<String, Decimal>,
}

impl ReferenceModel {
    /// Derive a reference model from a target model and the shelf.
    ///
    /// Asset-class weights aggregate instrument weights by shelf asset class;
    /// any unallocated remainder is assigned to the cash bucket.
    #[must_use]
    pub fn from_model(model: &ModelPortfolio, shelf: &Shelf) -> Self {
        let mut asset_class_targets: BTreeMap<String, Decimal> = BTreeMap::new();
        let mut instrument_targets = BTreeMap::new();
        let mut allocated = Decimal::ZERO;
        for (instrument_id, weight) in model.weights() {
            let bucket = shelf
                .get(&instrument_id)
                .and_then(|e| e.asset_class.clone())
                .unwrap_or_else(|| UNCLASSIFIED_BUCKET.to_string());
            *asset_class_targets.entry(bucket).or_insert(Decimal::ZERO) += weight;
            instrument_targets.insert(instrument_id.to_string(), weight);
            allocated += weight;
        }
        let remainder = Decimal::ONE - allocated;
        if remainder > Decimal::ZERO {
            *asset_class_targets
                .entry(CASH_BUCKET.to_string())
                .or_insert(Decimal::ZERO) += remainder;
        }
        Self {
            model_id: model.model_id.clone(),
            asset_class_targets,
            instrument_targets,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::portfolio::value_objects::{ShelfEntry, ShelfStatus};
    use rust_decimal_macros::dec;

    #[test]
    fn reference_model_from_model_adds_cash_remainder() {
        let model = ModelPortfolio {
            model_id: "m1".to_string(),
            targets: vec![
                ModelTarget {
                    instrument_id: InstrumentId::new("EQ"),
                    weight: dec!(0.6),
                },
                ModelTarget {
                    instrument_id: InstrumentId::new("FI"),
                    weight: dec!(0.35),
                },
            ],
        };
        let shelf = Shelf::new(vec![
            ShelfEntry::new("EQ", ShelfStatus::Approved).with_asset_class("EQUITY"),
            ShelfEntry::new("FI", ShelfStatus::Approved).with_asset_class("FIXED_INCOME"),
        ]);
        let reference = ReferenceModel::from_model(&model, &shelf);
        assert_eq!(reference.asset_class_targets["EQUITY"], dec!(0.6));
        assert_eq!(reference.asset_class_targets["FIXED_INCOME"], dec!(0.35));
        assert_eq!(reference.asset_class_targets[CASH_BUCKET], dec!(0.05));
        assert_eq!(reference.instrument_targets.len(), 2);
    }

    #[test]
    fn model_weight_of_missing_is_zero() {
        let model = ModelPortfolio {
            model_id: "m".to_string(),
            targets: Vec::new(),
        };
        assert_eq!(model.weight_of(&InstrumentId::new("X")), Decimal::ZERO);
    }
}
