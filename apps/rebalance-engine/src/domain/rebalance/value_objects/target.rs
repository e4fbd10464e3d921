//! Target weight trace.

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{RunStatus, TargetMethod};
use crate::domain::shared::{InstrumentId, Money};

/// Decimal places kept for target weights in the trace.
pub const TARGET_WEIGHT_DP: u32 = 8;

/// Annotation explaining how a final weight came about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TargetTag {
    /// Weight was reduced to the position cap.
    CappedByMaxWeight,
    /// Weight received redistributed weight.
    RedistributedRecipient,
    /// Held but not in the model; target is zero.
    ImplicitSellToZero,
    /// Cannot trade; weight held at current.
    LockedPosition,
}

/// Final target of one instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetInstrument {
    /// Instrument.
    pub instrument_id: InstrumentId,
    /// Weight in the model.
    pub model_weight: Decimal,
    /// Final target weight.
    pub final_weight: Decimal,
    /// Final target value in base currency.
    pub final_value: Money,
    /// Annotations.
    pub tags: BTreeSet<TargetTag>,
}

/// Output of target generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetTrace {
    /// Strategy used.
    pub method: TargetMethod,
    /// Status of the stage.
    pub status: RunStatus,
    /// Targets ascending by instrument. Empty when generation failed.
    pub instruments: Vec<TargetInstrument>,
}

impl TargetTrace {
    /// Final weight of an instrument, if targeted.
    #[must_use]
    pub fn final_weight(&self, instrument_id: &InstrumentId) -> Option<Decimal> {
        self.instruments
            .iter()
            .find(|t| &t.instrument_id == instrument_id)
            .map(|t| t.final_weight)
    }
}

/// Round a target weight for the trace.
#[must_use]
pub fn round_target_weight(weight: Decimal) -> Decimal {
    let mut rounded = weight.round_dp(TARGET_WEIGHT_DP);
    rounded.rescale(TARGET_WEIGHT_DP);
    rounded.normalize()
}
