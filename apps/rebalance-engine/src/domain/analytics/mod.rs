//! Analytics Bounded Context
//!
//! Before/after comparisons that inform review: drift against a reference
//! model and suitability issue tracking.

pub mod drift;
pub mod suitability;

pub use drift::{
    BucketDrift, DimensionDrift, DriftAnalysis, DriftDimension, UnmodeledExposure, analyze_drift,
};
pub use suitability::{
    IssueDimension, IssueStatus, RecommendedGate, SuitabilityIssue, SuitabilityResult,
    SuitabilitySummary, assess_suitability,
};
