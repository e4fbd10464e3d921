//! Engine policy constants: reconciliation tolerance, position tolerance,
//! funding order and consent default.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::domain::rebalance::value_objects::{EnginePolicy, FundingTieBreak};

/// Policy configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Reconciliation tolerance constants.
    #[serde(default)]
    pub reconciliation: ReconciliationToleranceConfig,
    /// Allowed excess over the single position cap.
    #[serde(default = "default_single_position_tolerance")]
    pub single_position_tolerance: Decimal,
    /// Funding currency order.
    #[serde(default)]
    pub funding_tie_break: FundingTieBreak,
    /// Require client consent unless a request overrides it.
    #[serde(default = "default_true")]
    pub require_client_consent: bool,
}

/// Reconciliation tolerance: `absolute + expected * relative`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationToleranceConfig {
    /// Absolute part, in base currency.
    #[serde(default = "default_absolute_tolerance")]
    pub absolute: Decimal,
    /// Relative part.
    #[serde(default = "default_relative_tolerance")]
    pub relative: Decimal,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            reconciliation: ReconciliationToleranceConfig::default(),
            single_position_tolerance: default_single_position_tolerance(),
            funding_tie_break: FundingTieBreak::default(),
            require_client_consent: true,
        }
    }
}

impl Default for ReconciliationToleranceConfig {
    fn default() -> Self {
        Self {
            absolute: default_absolute_tolerance(),
            relative: default_relative_tolerance(),
        }
    }
}

impl PolicyConfig {
    /// Convert to the domain policy.
    #[must_use]
    pub fn to_policy(&self) -> EnginePolicy {
        EnginePolicy {
            reconciliation_absolute_tolerance: self.reconciliation.absolute,
            reconciliation_relative_tolerance: self.reconciliation.relative,
            single_position_tolerance: self.single_position_tolerance,
            funding_tie_break: self.funding_tie_break,
            require_client_consent: self.require_client_consent,
        }
    }
}

const fn default_absolute_tolerance() -> Decimal {
    dec!(0.5)
}

const fn default_relative_tolerance() -> Decimal {
    dec!(0.0005)
}

const fn default_single_position_tolerance() -> Decimal {
    dec!(0.001)
}

const fn default_true() -> bool {
    true
}
