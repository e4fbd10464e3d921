//! Use Cases
//!
//! Application-specific orchestration around the rebalance engine.

mod run_rebalance;
mod run_report;
mod simulate_proposal;

pub use run_rebalance::{REBALANCE_RUN_PREFIX, RunRebalanceUseCase};
pub use simulate_proposal::{PROPOSAL_RUN_PREFIX, SimulateProposalUseCase};
