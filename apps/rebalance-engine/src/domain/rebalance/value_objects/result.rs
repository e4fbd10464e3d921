//! Run status, rule results, reconciliation, and the run result.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{DiagnosticsData, OrderIntent, TargetTrace};
use crate::domain::analytics::{DriftAnalysis, SuitabilityResult};
use crate::domain::portfolio::SimulatedState;
use crate::domain::shared::{CorrelationId, Money, RunId};
use crate::domain::workflow::GateDecision;

/// Overall status of a run. Ordered from best to worst.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    /// Ready for execution.
    #[default]
    Ready,
    /// Needs review.
    PendingReview,
    /// Cannot proceed.
    Blocked,
}

impl RunStatus {
    /// The worse of two statuses.
    #[must_use]
    pub fn worst(self, other: Self) -> Self {
        self.max(other)
    }

    /// Wire name of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ready => "READY",
            Self::PendingReview => "PENDING_REVIEW",
            Self::Blocked => "BLOCKED",
        }
    }
}

/// Rule severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleSeverity {
    /// Failure blocks the run.
    Hard,
    /// Failure requires review.
    Soft,
}

/// Rule outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleStatus {
    /// Rule satisfied.
    Pass,
    /// Rule violated.
    Fail,
}

/// Result of one rule evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleResult {
    /// Rule identifier.
    pub rule_id: String,
    /// Severity.
    pub severity: RuleSeverity,
    /// Outcome.
    pub status: RuleStatus,
    /// Measured value.
    pub measured: Decimal,
    /// Threshold compared against.
    pub threshold: Decimal,
    /// Reason code.
    pub reason_code: String,
}

impl RuleResult {
    /// Build a passing result.
    #[must_use]
    pub fn pass(
        rule_id: &str,
        severity: RuleSeverity,
        measured: Decimal,
        threshold: Decimal,
        reason_code: &str,
    ) -> Self {
        Self {
            rule_id: rule_id.to_string(),
            severity,
            status: RuleStatus::Pass,
            measured,
            threshold,
            reason_code: reason_code.to_string(),
        }
    }

    /// Build a failing result.
    #[must_use]
    pub fn fail(
        rule_id: &str,
        severity: RuleSeverity,
        measured: Decimal,
        threshold: Decimal,
        reason_code: &str,
    ) -> Self {
        Self {
            status: RuleStatus::Fail,
            ..Self::pass(rule_id, severity, measured, threshold, reason_code)
        }
    }

    /// Whether this is a HARD failure.
    #[must_use]
    pub fn is_hard_fail(&self) -> bool {
        self.status == RuleStatus::Fail && self.severity == RuleSeverity::Hard
    }

    /// Whether this is a SOFT failure.
    #[must_use]
    pub fn is_soft_fail(&self) -> bool {
        self.status == RuleStatus::Fail && self.severity == RuleSeverity::Soft
    }
}

/// Reconciliation outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReconciliationStatus {
    /// Within tolerance.
    Ok,
    /// Outside tolerance.
    Mismatch,
}

/// Cross-check of the after-state total against the expected total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciliation {
    /// Outcome.
    pub status: ReconciliationStatus,
    /// Before-state total.
    pub before_total: Money,
    /// After-state total.
    pub after_total: Money,
    /// Independently projected total.
    pub expected_total: Money,
    /// Absolute difference.
    pub diff: Decimal,
    /// Tolerance applied.
    pub tolerance: Decimal,
}

/// Kind of run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunMode {
    /// Model-driven rebalance.
    Rebalance,
    /// Advisory proposal simulation.
    Advisory,
}

/// Identity assigned to a run by the caller-facing layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunIdentity {
    /// Run identifier.
    pub run_id: RunId,
    /// Correlation identifier.
    pub correlation_id: CorrelationId,
    /// Canonical request hash.
    pub request_hash: String,
    /// Request time.
    pub requested_at: DateTime<Utc>,
}

/// Complete result of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebalanceResult {
    /// Run identity.
    #[serde(flatten)]
    pub identity: RunIdentity,
    /// Kind of run.
    pub mode: RunMode,
    /// Final status: worst of every stage.
    pub status: RunStatus,
    /// Valued state before any intent.
    pub before: SimulatedState,
    /// Valued state after simulating the intents.
    pub after: SimulatedState,
    /// Target trace. Advisory runs carry none.
    pub target: Option<TargetTrace>,
    /// Sequenced intents.
    pub intents: Vec<OrderIntent>,
    /// Rule results.
    pub rule_results: Vec<RuleResult>,
    /// Reconciliation.
    pub reconciliation: Reconciliation,
    /// Drift analysis, when enabled and a reference model is available.
    pub drift: Option<DriftAnalysis>,
    /// Suitability diff, when enabled.
    pub suitability: Option<SuitabilityResult>,
    /// Gate decision.
    pub gate: GateDecision,
    /// Diagnostics.
    pub diagnostics: DiagnosticsData,
}
