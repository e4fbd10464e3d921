//! Rebalance value objects.

mod diagnostics;
mod intents;
mod options;
mod policy;
mod proposal;
mod result;
mod target;

pub use diagnostics::{
    DataQuality, DiagnosticsData, DroppedIntent, ExcludedInstrument, FundingPlanEntry,
    FundingStatus, GroupConstraintEvent, InsufficientCashEntry, SolverAttempt, SolverDiagnostics,
    SuppressedIntent,
};
pub use intents::{CashFlowIntent, FxSpotIntent, OrderIntent, SecurityTradeIntent, TradeSide};
pub use options::{
    DriftOptions, EngineOptions, FundingMode, FxFundingSource, GroupConstraint, IssueSeverity,
    SuitabilityOptions, TargetMethod, WorkflowOptions, parse_group_key,
};
pub use policy::{EnginePolicy, FundingTieBreak};
pub use proposal::{ProposedCashFlow, ProposedTrade};
pub use result::{
    RebalanceResult, Reconciliation, ReconciliationStatus, RuleResult, RuleSeverity, RuleStatus,
    RunIdentity, RunMode, RunStatus,
};
pub use target::{
    TARGET_WEIGHT_DP, TargetInstrument, TargetTag, TargetTrace, round_target_weight,
};
