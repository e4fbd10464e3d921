//! Portfolio services.

mod valuation;

pub use valuation::{UNASSIGNED_BUCKET, ValuationOutcome, value_portfolio};
