//! Workflow gate: routes a run to its next step.

use serde::{Deserialize, Serialize};

use crate::domain::analytics::{IssueStatus, SuitabilityResult};
use crate::domain::rebalance::value_objects::{
    DiagnosticsData, IssueSeverity, RuleResult, RuleSeverity, RunStatus, WorkflowOptions,
};

/// Gate verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gate {
    /// Inputs must be fixed before anything else.
    Blocked,
    /// Compliance must review.
    ComplianceReviewRequired,
    /// Risk must review.
    RiskReviewRequired,
    /// Client consent must be requested.
    ClientConsentRequired,
    /// Ready to execute.
    ExecutionReady,
}

impl Gate {
    /// Action that follows the gate.
    #[must_use]
    pub const fn next_step(&self) -> NextStep {
        match self {
            Self::Blocked => NextStep::FixInput,
            Self::ComplianceReviewRequired => NextStep::ComplianceReview,
            Self::RiskReviewRequired => NextStep::RiskReview,
            Self::ClientConsentRequired => NextStep::RequestClientConsent,
            Self::ExecutionReady => NextStep::Execute,
        }
    }
}

/// Next workflow step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NextStep {
    /// Correct the inputs.
    FixInput,
    /// Send to compliance.
    ComplianceReview,
    /// Send to risk.
    RiskReview,
    /// Ask the client.
    RequestClientConsent,
    /// Execute the intents.
    Execute,
}

/// Where a gate reason came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonSource {
    /// Overall run status.
    RunStatus,
    /// Rule engine.
    Rule,
    /// Missing reference data.
    DataQuality,
    /// Suitability scanner.
    Suitability,
}

/// One reason behind a gate verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateReason {
    /// Severity.
    pub severity: IssueSeverity,
    /// Origin.
    pub source: ReasonSource,
    /// Reason code.
    pub reason_code: String,
    /// Detail key, e.g. the instrument or issue key.
    pub detail: String,
}

/// Gate verdict with its reasons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateDecision {
    /// Verdict.
    pub gate: Gate,
    /// Next step.
    pub next_step: NextStep,
    /// Reasons, sorted by severity, source, code, detail.
    pub reasons: Vec<GateReason>,
}

/// Decide the gate from run outcomes.
///
/// Rule failures and suitability issues are re-derived rather than read from
/// the status text; `require_client_consent` is the policy default that the
/// workflow options may override.
#[must_use]
pub fn decide_gate(
    status: RunStatus,
    rule_results: &[RuleResult],
    diagnostics: &DiagnosticsData,
    suitability: Option<&SuitabilityResult>,
    workflow: &WorkflowOptions,
    require_client_consent: bool,
) -> GateDecision {
    let mut reasons = Vec::new();
    let mut reason = |severity, source, code: &str, detail: &str| {
        reasons.push(GateReason {
            severity,
            source,
            reason_code: code.to_string(),
            detail: detail.to_string(),
        });
    };

    if status != RunStatus::Ready {
        let severity = if status == RunStatus::Blocked {
            IssueSeverity::High
        } else {
            IssueSeverity::Medium
        };
        reason(severity, ReasonSource::RunStatus, status.as_str(), "");
    }
    for rule in rule_results {
        if rule.is_hard_fail() || rule.is_soft_fail() {
            let severity = match rule.severity {
                RuleSeverity::Hard => IssueSeverity::High,
                RuleSeverity::Soft => IssueSeverity::Medium,
            };
            reason(severity, ReasonSource::Rule, &rule.rule_id, &rule.reason_code);
        }
    }
    for instrument in &diagnostics.data_quality.price_missing {
        let subject = instrument.as_str();
        reason(IssueSeverity::High, ReasonSource::DataQuality, "MISSING_PRICE", subject);
    }
    for pair in &diagnostics.data_quality.fx_missing {
        reason(IssueSeverity::High, ReasonSource::DataQuality, "MISSING_FX", pair);
    }
    let new_issues: Vec<_> = suitability
        .map(|s| s.issues.iter().filter(|i| i.status == IssueStatus::New).collect())
        .unwrap_or_default();
    for issue in &new_issues {
        reason(
            issue.severity,
            ReasonSource::Suitability,
            issue.dimension.as_str(),
            &issue.issue_key,
        );
    }

    let hard_fail = rule_results.iter().any(RuleResult::is_hard_fail);
    let soft_fail = rule_results.iter().any(RuleResult::is_soft_fail);
    let new_with = |severity| new_issues.iter().any(|i| i.severity == severity);
    let consent_required = workflow.require_client_consent.unwrap_or(require_client_consent);

    let gate = if hard_fail || status == RunStatus::Blocked {
        Gate::Blocked
    } else if new_with(IssueSeverity::High) {
        Gate::ComplianceReviewRequired
    } else if soft_fail || new_with(IssueSeverity::Medium) || status == RunStatus::PendingReview {
        Gate::RiskReviewRequired
    } else if workflow.client_consent_already_obtained || !consent_required {
        Gate::ExecutionReady
    } else {
        Gate::ClientConsentRequired
    };

    reasons.sort_by(|a, b| {
        (a.severity, a.source, &a.reason_code, &a.detail).cmp(&(
            b.severity,
            b.source,
            &b.reason_code,
            &b.detail,
        ))
    });
    GateDecision {
        gate,
        next_step: gate.next_step(),
        reasons,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::analytics::{
        IssueDimension, RecommendedGate, SuitabilityIssue, SuitabilitySummary,
    };
    use crate::domain::shared::InstrumentId;
    use rust_decimal::Decimal;
    use test_case::test_case;

    fn suitability(severity: IssueSeverity, status: IssueStatus) -> SuitabilityResult {
        SuitabilityResult {
            issues: vec![SuitabilityIssue {
                issue_key: "ISSUER_MAX|ISS_A".to_string(),
                dimension: IssueDimension::Issuer,
                severity,
                status,
                measured_before: None,
                measured_after: Some(Decimal::ONE),
                threshold: None,
            }],
            summary: SuitabilitySummary::default(),
            recommended_gate: RecommendedGate::None,
        }
    }

    fn decide(
        status: RunStatus,
        rules: &[RuleResult],
        suitability: Option<&SuitabilityResult>,
        workflow: &WorkflowOptions,
    ) -> GateDecision {
        decide_gate(status, rules, &DiagnosticsData::default(), suitability, workflow, true)
    }

    #[test]
    fn hard_failure_blocks() {
        let rules = [RuleResult::fail(
            "NO_SHORTING",
            RuleSeverity::Hard,
            Decimal::ONE,
            Decimal::ZERO,
            "SHORT_POSITION",
        )];
        let decision = decide(RunStatus::Blocked, &rules, None, &WorkflowOptions::default());
        assert_eq!(decision.gate, Gate::Blocked);
        assert_eq!(decision.next_step, NextStep::FixInput);
        assert_eq!(decision.reasons[0].severity, IssueSeverity::High);
    }

    #[test_case(IssueSeverity::High, IssueStatus::New, Gate::ComplianceReviewRequired ; "new high")]
    #[test_case(IssueSeverity::Medium, IssueStatus::New, Gate::RiskReviewRequired ; "new medium")]
    #[test_case(
        IssueSeverity::High, IssueStatus::Persistent, Gate::ClientConsentRequired ;
        "persistent high"
    )]
    #[test_case(IssueSeverity::Low, IssueStatus::New, Gate::ClientConsentRequired ; "new low")]
    fn suitability_routes(severity: IssueSeverity, status: IssueStatus, expected: Gate) {
        let result = suitability(severity, status);
        let decision = decide(RunStatus::Ready, &[], Some(&result), &WorkflowOptions::default());
        assert_eq!(decision.gate, expected);
    }

    #[test]
    fn pending_review_routes_to_risk() {
        let decision = decide(RunStatus::PendingReview, &[], None, &WorkflowOptions::default());
        assert_eq!(decision.gate, Gate::RiskReviewRequired);
        assert_eq!(decision.next_step, NextStep::RiskReview);
    }

    #[test]
    fn consent_settings() {
        let obtained = WorkflowOptions {
            require_client_consent: None,
            client_consent_already_obtained: true,
        };
        assert_eq!(decide(RunStatus::Ready, &[], None, &obtained).gate, Gate::ExecutionReady);
        let not_required = WorkflowOptions {
            require_client_consent: Some(false),
            client_consent_already_obtained: false,
        };
        assert_eq!(decide(RunStatus::Ready, &[], None, &not_required).gate, Gate::ExecutionReady);
    }

    #[test]
    fn reasons_are_sorted() {
        let mut diagnostics = DiagnosticsData::default();
        diagnostics.record_missing_price(&InstrumentId::new("EQ_B"));
        diagnostics.record_missing_price(&InstrumentId::new("EQ_A"));
        let rules = [RuleResult::fail(
            "CASH_BAND",
            RuleSeverity::Soft,
            Decimal::ONE,
            Decimal::ZERO,
            "CASH_WEIGHT_ABOVE_MAX",
        )];
        let decision = decide_gate(
            RunStatus::PendingReview,
            &rules,
            &diagnostics,
            None,
            &WorkflowOptions::default(),
            true,
        );
        let details: Vec<(&str, &str)> = decision
            .reasons
            .iter()
            .map(|r| (r.reason_code.as_str(), r.detail.as_str()))
            .collect();
        assert_eq!(
            details,
            vec![
                ("MISSING_PRICE", "EQ_A"),
                ("MISSING_PRICE", "EQ_B"),
                ("PENDING_REVIEW", ""),
                ("CASH_BAND", "CASH_WEIGHT_ABOVE_MAX"),
            ]
        );
    }
}
