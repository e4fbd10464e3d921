//! Shared Value Objects
//!
//! Immutable domain types used across bounded contexts.
//! Value objects are compared by value, not identity.

mod currency;
mod identifiers;
mod money;

pub use currency::CurrencyCode;
pub use identifiers::{CorrelationId, InstrumentId, IntentId, RunId};
pub use money::{Money, WEIGHT_DP, quantize_weight};
