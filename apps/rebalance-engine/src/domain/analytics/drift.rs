//! Drift of before and after states against a reference model.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::portfolio::{CASH_BUCKET, ReferenceModel, SimulatedState};
use crate::domain::rebalance::value_objects::DriftOptions;

/// Allocation dimension analysed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DriftDimension {
    /// Shelf asset class.
    AssetClass,
    /// Individual instrument.
    Instrument,
}

/// Drift of one bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketDrift {
    /// Bucket key.
    pub bucket: String,
    /// Reference weight.
    pub model_weight: Decimal,
    /// Weight before the run.
    pub weight_before: Decimal,
    /// Weight after the run.
    pub weight_after: Decimal,
    /// Signed drift before.
    pub drift_before: Decimal,
    /// Signed drift after.
    pub drift_after: Decimal,
    /// `|drift_before| - |drift_after|`; positive is an improvement.
    pub improvement: Decimal,
}

/// Bucket held without a reference weight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnmodeledExposure {
    /// Bucket key.
    pub bucket: String,
    /// Weight before the run.
    pub weight_before: Decimal,
    /// Weight after the run.
    pub weight_after: Decimal,
    /// Larger of the two.
    pub max_weight: Decimal,
}

/// Drift for one dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionDrift {
    /// Dimension.
    pub dimension: DriftDimension,
    /// Half the L1 distance to the model, before.
    pub drift_total_before: Decimal,
    /// Half the L1 distance to the model, after.
    pub drift_total_after: Decimal,
    /// Every bucket, ascending by key.
    pub buckets: Vec<BucketDrift>,
    /// Largest contributors to drift before the run.
    pub top_contributors_before: Vec<BucketDrift>,
    /// Buckets whose drift shrank the most.
    pub largest_improvements: Vec<BucketDrift>,
    /// Buckets whose drift grew the most.
    pub largest_deteriorations: Vec<BucketDrift>,
    /// Unmodeled buckets above the configured threshold.
    pub unmodeled_exposures: Vec<UnmodeledExposure>,
}

/// Drift analysis of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftAnalysis {
    /// Reference model identifier.
    pub reference_model_id: String,
    /// Asset-class dimension.
    pub asset_class: DimensionDrift,
    /// Instrument dimension, when requested.
    pub instrument: Option<DimensionDrift>,
}

/// Analyse drift of both states against the reference model.
#[must_use]
pub fn analyze_drift(
    reference: &ReferenceModel,
    before: &SimulatedState,
    after: &SimulatedState,
    options: &DriftOptions,
) -> DriftAnalysis {
    let asset_class = dimension_drift(
        DriftDimension::AssetClass,
        &reference.asset_class_targets,
        &before.asset_class_weights(),
        &after.asset_class_weights(),
        options,
    );
    let instrument = options.include_instrument.then(|| {
        let mut model = reference.instrument_targets.clone();
        if !model.contains_key(CASH_BUCKET) {
            let invested: Decimal = model.values().copied().sum();
            model.insert(CASH_BUCKET.to_string(), (Decimal::ONE - invested).max(Decimal::ZERO));
        }
        dimension_drift(
            DriftDimension::Instrument,
            &model,
            &before.instrument_weights(),
            &after.instrument_weights(),
            options,
        )
    });
    DriftAnalysis {
        reference_model_id: reference.model_id.clone(),
        asset_class,
        instrument,
    }
}

/// Drift of one dimension over the union of model, before and after keys.
#[must_use]
pub fn dimension_drift(
    dimension: DriftDimension,
    model: &BTreeMap<String, Decimal>,
    before: &BTreeMap<String, Decimal>,
    after: &BTreeMap<String, Decimal>,
    options: &DriftOptions,
) -> DimensionDrift {
    let weight = |map: &BTreeMap<String, Decimal>, key: &str| {
        map.get(key).copied().unwrap_or(Decimal::ZERO)
    };
    let keys: BTreeSet<&String> = model.keys().chain(before.keys()).chain(after.keys()).collect();
    let buckets: Vec<BucketDrift> = keys
        .into_iter()
        .map(|key| {
            let model_weight = weight(model, key);
            let weight_before = weight(before, key);
            let weight_after = weight(after, key);
            let drift_before = weight_before - model_weight;
            let drift_after = weight_after - model_weight;
            BucketDrift {
                bucket: key.clone(),
                model_weight,
                weight_before,
                weight_after,
                drift_before,
                drift_after,
                improvement: drift_before.abs() - drift_after.abs(),
            }
        })
        .collect();

    let half = Decimal::new(5, 1);
    let drift_total_before = half * buckets.iter().map(|b| b.drift_before.abs()).sum::<Decimal>();
    let drift_total_after = half * buckets.iter().map(|b| b.drift_after.abs()).sum::<Decimal>();

    let top = options.top_n;
    let mut top_contributors_before = buckets.clone();
    top_contributors_before.sort_by(|a, b| {
        b.drift_before
            .abs()
            .cmp(&a.drift_before.abs())
            .then_with(|| a.bucket.cmp(&b.bucket))
    });
    top_contributors_before.truncate(top);

    let mut largest_improvements: Vec<BucketDrift> = buckets
        .iter()
        .filter(|b| b.improvement > Decimal::ZERO)
        .cloned()
        .collect();
    largest_improvements.sort_by_key(|b| (Reverse(b.improvement), b.bucket.clone()));
    largest_improvements.truncate(top);

    let mut largest_deteriorations: Vec<BucketDrift> = buckets
        .iter()
        .filter(|b| b.improvement < Decimal::ZERO)
        .cloned()
        .collect();
    largest_deteriorations.sort_by_key(|b| (b.improvement, b.bucket.clone()));
    largest_deteriorations.truncate(top);

    let mut unmodeled_exposures: Vec<UnmodeledExposure> = buckets
        .iter()
        .filter(|b| b.model_weight.is_zero())
        .map(|b| UnmodeledExposure {
            bucket: b.bucket.clone(),
            weight_before: b.weight_before,
            weight_after: b.weight_after,
            max_weight: b.weight_before.max(b.weight_after),
        })
        .filter(|u| u.max_weight >= options.unmodeled_exposure_threshold)
        .collect();
    unmodeled_exposures.sort_by_key(|u| (Reverse(u.max_weight), u.bucket.clone()));
    unmodeled_exposures.truncate(top);

    DimensionDrift {
        dimension,
        drift_total_before,
        drift_total_after,
        buckets,
        top_contributors_before,
        largest_improvements,
        largest_deteriorations,
        unmodeled_exposures,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn weights(entries: &[(&str, Decimal)]) -> BTreeMap<String, Decimal> {
        entries.iter().map(|(k, w)| ((*k).to_string(), *w)).collect()
    }

    fn model() -> BTreeMap<String, Decimal> {
        weights(&[
            ("EQUITY", dec!(0.60)),
            ("FIXED_INCOME", dec!(0.35)),
            ("CASH", dec!(0.05)),
        ])
    }

    #[test]
    fn drift_total_is_half_l1() {
        let before = weights(&[
            ("EQUITY", dec!(0.70)),
            ("FIXED_INCOME", dec!(0.20)),
            ("CASH", dec!(0.10)),
        ]);
        let drift = dimension_drift(
            DriftDimension::AssetClass,
            &model(),
            &before,
            &model(),
            &DriftOptions::default(),
        );
        assert_eq!(drift.drift_total_before, dec!(0.15));
        assert_eq!(drift.drift_total_after, Decimal::ZERO);
        let top: Vec<&str> = drift
            .top_contributors_before
            .iter()
            .map(|b| b.bucket.as_str())
            .collect();
        assert_eq!(top, vec!["FIXED_INCOME", "EQUITY", "CASH"]);
        assert_eq!(drift.largest_improvements.len(), 3);
        assert!(drift.largest_deteriorations.is_empty());
    }

    #[test]
    fn unmodeled_buckets_above_threshold() {
        let before = weights(&[
            ("EQUITY", dec!(0.60)),
            ("CASH", dec!(0.05)),
            ("CRYPTO", dec!(0.30)),
            ("ART", dec!(0.005)),
        ]);
        let after = weights(&[
            ("EQUITY", dec!(0.60)),
            ("CASH", dec!(0.05)),
            ("CRYPTO", dec!(0.35)),
        ]);
        let drift = dimension_drift(
            DriftDimension::AssetClass,
            &model(),
            &before,
            &after,
            &DriftOptions::default(),
        );
        assert_eq!(drift.unmodeled_exposures.len(), 1);
        assert_eq!(drift.unmodeled_exposures[0].bucket, "CRYPTO");
        assert_eq!(drift.unmodeled_exposures[0].max_weight, dec!(0.35));
        assert_eq!(drift.largest_deteriorations[0].bucket, "CRYPTO");
    }

    proptest! {
        #[test]
        fn identical_weights_have_zero_drift(a in 0u32..=100, b in 0u32..=100) {
            let total = Decimal::from(a + b + 1);
            let w = weights(&[
                ("A", Decimal::from(a) / total),
                ("B", Decimal::from(b) / total),
                ("CASH", Decimal::ONE / total),
            ]);
            let options = DriftOptions::default();
            let drift = dimension_drift(DriftDimension::AssetClass, &w, &w, &w, &options);
            prop_assert_eq!(drift.drift_total_before, Decimal::ZERO);
            prop_assert!(drift.largest_improvements.is_empty());
        }
    }
}
