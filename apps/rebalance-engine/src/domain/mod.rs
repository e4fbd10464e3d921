//! Domain Layer
//!
//! The innermost layer containing business logic with zero infrastructure dependencies.
//! This layer defines:
//!
//! - **Value Objects**: Immutable domain types with equality by value
//! - **Domain Services**: Stateless business logic
//! - **Capability Traits**: Pluggable solver backends
//!
//! # Bounded Contexts
//!
//! - [`portfolio`]: Snapshots, reference data and valuation
//! - [`rebalance`]: Targets, funding, sequencing, rules and reconciliation
//! - [`analytics`]: Drift and suitability comparisons
//! - [`workflow`]: Gate decision routing

pub mod analytics;
pub mod portfolio;
pub mod rebalance;
pub mod shared;
pub mod workflow;
