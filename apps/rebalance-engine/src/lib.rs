// Allow unwrap/expect in tests - tests should panic on unexpected errors
// Allow test-specific patterns and pedantic lints in test code
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements
    )
)]

//! Rebalance Engine - Rust Core Library
//!
//! Deterministic rebalance and advisory decision engine.
//!
//! # Architecture (Clean Architecture + DDD)
//!
//! ## Layers (inside → outside)
//!
//! - **Domain**: Pure business logic, no I/O
//!   - `shared`: Money, currency minor units, identifiers
//!   - `portfolio`: Snapshots, market data, models, shelf, valuation
//!   - `rebalance`: Universe, targets, solver chain, trades, funding,
//!     sequencing, simulation, rules, reconciliation, pipeline
//!   - `analytics`: Drift against a reference model, suitability scanner
//!   - `workflow`: Gate decision
//!
//! - **Application**: Use cases and orchestration
//!   - `dto`: Request envelopes and boundary validation
//!   - `services`: Canonical request hashing, idempotency cache
//!   - `use_cases`: `RunRebalance`, `SimulateProposal`
//!
//! - **Config / Telemetry**: YAML configuration and tracing setup

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Clean Architecture Layers
// =============================================================================

/// Domain layer - Core business logic with no external dependencies.
pub mod domain;

/// Application layer - Use cases, DTOs and request hashing.
pub mod application;

// =============================================================================
// Ambient Modules
// =============================================================================

/// Configuration loading and validation.
pub mod config;

/// Boundary errors.
pub mod error;

/// Tracing subscriber setup.
pub mod telemetry;

// =============================================================================
// Re-exports
// =============================================================================

// Domain re-exports
pub use domain::analytics::{DriftAnalysis, SuitabilityResult};
pub use domain::portfolio::{
    MarketDataSnapshot, ModelPortfolio, PortfolioSnapshot, ReferenceModel, ShelfEntry,
};
pub use domain::rebalance::value_objects::{EngineOptions, RebalanceResult, RunStatus};
pub use domain::rebalance::{ProposalInputs, RebalanceEngine, RebalanceInputs};
pub use domain::shared::{CurrencyCode, InstrumentId, Money};
pub use domain::workflow::{Gate, GateDecision};

// Application re-exports
pub use application::dto::{ProposalRequest, RebalanceRequest};
pub use application::use_cases::{RunRebalanceUseCase, SimulateProposalUseCase};

// Ambient re-exports
pub use config::{Config, ConfigError, load_config, load_config_from_string};
pub use error::{EngineError, ErrorCode};
