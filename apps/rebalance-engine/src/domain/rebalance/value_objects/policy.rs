//! Policy constants that shape funding, reconciliation, and workflow.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Order in which funding currencies are tried.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FundingTieBreak {
    /// Base currency first, then other ledgers ascending.
    #[default]
    BaseFirstThenLexical,
    /// All ledgers ascending, base included.
    Lexical,
}

/// Engine-wide policy, fixed for the lifetime of an engine instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnginePolicy {
    /// Absolute part of the reconciliation tolerance.
    pub reconciliation_absolute_tolerance: Decimal,
    /// Relative part of the reconciliation tolerance.
    pub reconciliation_relative_tolerance: Decimal,
    /// Tolerance above the position cap before the rule fails.
    pub single_position_tolerance: Decimal,
    /// Funding currency order.
    pub funding_tie_break: FundingTieBreak,
    /// Whether client consent is required unless a run overrides it.
    pub require_client_consent: bool,
}

impl Default for EnginePolicy {
    fn default() -> Self {
        Self {
            reconciliation_absolute_tolerance: dec!(0.5),
            reconciliation_relative_tolerance: dec!(0.0005),
            single_position_tolerance: dec!(0.001),
            funding_tie_break: FundingTieBreak::BaseFirstThenLexical,
            require_client_consent: true,
        }
    }
}
