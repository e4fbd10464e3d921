//! Rebalance domain services, in pipeline order.

pub mod funding;
pub mod pipeline;
pub mod proposal;
pub mod reconciliation;
pub mod rules;
pub mod sequencer;
pub mod simulation;
pub mod solver;
pub mod targets;
pub mod trade_generation;
pub mod universe;

pub use funding::{FundingOutcome, plan_funding};
pub use pipeline::{ProposalInputs, RebalanceEngine, RebalanceInputs};
pub use proposal::proposal_intents;
pub use reconciliation::reconcile;
pub use rules::{derive_status, evaluate_rules};
pub use sequencer::sequence_intents;
pub use simulation::simulate;
pub use solver::{SolverBackend, SolverSettings, TargetSolver};
pub use targets::heuristic_targets;
pub use trade_generation::generate_trades;
pub use universe::{Tradeability, Universe, UniverseEntry, build_universe};
