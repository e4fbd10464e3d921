//! Rebalance Bounded Context
//!
//! Turns a portfolio, market data, a target model and the shelf into
//! sequenced order intents with rule results and a gate decision.
//!
//! # Key Concepts
//!
//! - **Universe**: Every model or held instrument classified by tradeability
//! - **Target Trace**: Final weights with the tags explaining them
//! - **Funding**: FX spots covering currency shortfalls of buys
//! - **Rules**: Fixed HARD/SOFT checks that derive the run status

pub mod services;
pub mod value_objects;

pub use services::{ProposalInputs, RebalanceEngine, RebalanceInputs, SolverBackend, SolverSettings};
