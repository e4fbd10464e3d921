//! Suitability issues tracked across the before and after states.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::domain::portfolio::{Shelf, ShelfStatus, SimulatedState};
use crate::domain::rebalance::value_objects::{EngineOptions, IssueSeverity};
use crate::domain::shared::InstrumentId;

/// Multiple of a concentration threshold above which a breach is HIGH.
const HIGH_SEVERITY_MULTIPLE: Decimal = dec!(1.25);

/// Area an issue belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueDimension {
    /// Single instrument concentration.
    Concentration,
    /// Issuer concentration.
    Issuer,
    /// Liquidity tier exposure.
    Liquidity,
    /// Shelf governance.
    Governance,
    /// Cash band.
    Cash,
    /// Missing enrichment data.
    DataQuality,
}

impl IssueDimension {
    /// Wire name of the dimension.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Concentration => "CONCENTRATION",
            Self::Issuer => "ISSUER",
            Self::Liquidity => "LIQUIDITY",
            Self::Governance => "GOVERNANCE",
            Self::Cash => "CASH",
            Self::DataQuality => "DATA_QUALITY",
        }
    }
}

/// Classification of an issue across the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueStatus {
    /// Present only after.
    New,
    /// Present before and after.
    Persistent,
    /// Present only before.
    Resolved,
}

/// Review route suggested by the issues.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecommendedGate {
    /// No review needed.
    #[default]
    None,
    /// Risk review.
    RiskReview,
    /// Compliance review.
    ComplianceReview,
}

/// One suitability issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuitabilityIssue {
    /// Stable composite key, e.g. `ISSUER_MAX|ISS_1`.
    pub issue_key: String,
    /// Area.
    pub dimension: IssueDimension,
    /// Severity.
    pub severity: IssueSeverity,
    /// Classification.
    pub status: IssueStatus,
    /// Measured value before, when present before.
    pub measured_before: Option<Decimal>,
    /// Measured value after, when present after.
    pub measured_after: Option<Decimal>,
    /// Threshold breached, when numeric.
    pub threshold: Option<Decimal>,
}

/// Issue counts by status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuitabilitySummary {
    /// New issues.
    pub new: usize,
    /// Persistent issues.
    pub persistent: usize,
    /// Resolved issues.
    pub resolved: usize,
    /// New issues of HIGH severity.
    pub new_high: usize,
}

/// Suitability diff of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuitabilityResult {
    /// Issues sorted by status, severity, dimension, key.
    pub issues: Vec<SuitabilityIssue>,
    /// Counts.
    pub summary: SuitabilitySummary,
    /// Suggested review route.
    pub recommended_gate: RecommendedGate,
}

#[derive(Debug, Clone)]
struct Candidate {
    dimension: IssueDimension,
    severity: IssueSeverity,
    measured: Option<Decimal>,
    threshold: Option<Decimal>,
}

fn concentration(
    measured: Decimal,
    threshold: Decimal,
    dimension: IssueDimension,
) -> Option<Candidate> {
    (measured > threshold).then(|| Candidate {
        dimension,
        severity: if measured > threshold * HIGH_SEVERITY_MULTIPLE {
            IssueSeverity::High
        } else {
            IssueSeverity::Medium
        },
        measured: Some(measured),
        threshold: Some(threshold),
    })
}

/// Issue candidates of one state. `prior` enables the increase checks.
fn scan(
    state: &SimulatedState,
    prior: Option<&SimulatedState>,
    shelf: &Shelf,
    options: &EngineOptions,
) -> BTreeMap<String, Candidate> {
    let settings = &options.suitability;
    let mut found = BTreeMap::new();
    let mut by_issuer: BTreeMap<&str, Decimal> = BTreeMap::new();
    let mut by_tier: BTreeMap<&str, Decimal> = BTreeMap::new();
    let data_quality = |measured: Option<Decimal>| Candidate {
        dimension: IssueDimension::DataQuality,
        severity: settings.data_quality_issue_severity,
        measured,
        threshold: None,
    };

    for position in state.positions.iter().filter(|p| p.quantity > Decimal::ZERO) {
        let id = &position.instrument_id;
        let weight = position.weight;
        let cap = settings.single_position_max_weight;
        if let Some(c) = concentration(weight, cap, IssueDimension::Concentration) {
            found.insert(format!("SINGLE_POSITION_MAX|{id}"), c);
        }
        if position.price.is_none() {
            found.insert(format!("DQ|PRICE|{id}"), data_quality(None));
        }
        let Some(entry) = shelf.get(id) else {
            found.insert(format!("DQ|SHELF|{id}"), data_quality(None));
            continue;
        };
        match &entry.issuer_id {
            Some(issuer) => *by_issuer.entry(issuer.as_str()).or_insert(Decimal::ZERO) += weight,
            None => {
                found.insert(format!("DQ|ISSUER|{id}"), data_quality(Some(weight)));
            }
        }
        match &entry.liquidity_tier {
            Some(tier) => *by_tier.entry(tier.as_str()).or_insert(Decimal::ZERO) += weight,
            None => {
                found.insert(format!("DQ|LIQUIDITY_TIER|{id}"), data_quality(Some(weight)));
            }
        }
        if let Some(severity) = governance_severity(entry.status, id, weight, prior, options) {
            found.insert(
                format!("GOVERNANCE|{id}|{}", entry.status),
                Candidate {
                    dimension: IssueDimension::Governance,
                    severity,
                    measured: Some(weight),
                    threshold: None,
                },
            );
        }
    }

    for (issuer, weight) in by_issuer {
        if let Some(c) = concentration(weight, settings.issuer_max_weight, IssueDimension::Issuer) {
            found.insert(format!("ISSUER_MAX|{issuer}"), c);
        }
    }
    for (tier, weight) in by_tier {
        let Some(max) = settings.max_weight_by_liquidity_tier.get(tier) else {
            continue;
        };
        if let Some(c) = concentration(weight, *max, IssueDimension::Liquidity) {
            found.insert(format!("LIQUIDITY_TIER_MAX|{tier}"), c);
        }
    }

    let cash = state.cash_weight();
    if cash < options.cash_band_min_weight || cash > options.cash_band_max_weight {
        let threshold = if cash < options.cash_band_min_weight {
            options.cash_band_min_weight
        } else {
            options.cash_band_max_weight
        };
        found.insert(
            "CASH_BAND".to_string(),
            Candidate {
                dimension: IssueDimension::Cash,
                severity: IssueSeverity::Low,
                measured: Some(cash),
                threshold: Some(threshold),
            },
        );
    }
    found
}

fn governance_severity(
    status: ShelfStatus,
    id: &InstrumentId,
    weight: Decimal,
    prior: Option<&SimulatedState>,
    options: &EngineOptions,
) -> Option<IssueSeverity> {
    let increased = prior.is_some_and(|p| weight > p.instrument_weight(id));
    match status {
        ShelfStatus::Banned | ShelfStatus::Suspended => Some(IssueSeverity::High),
        ShelfStatus::SellOnly if increased => Some(IssueSeverity::High),
        ShelfStatus::Restricted if increased && options.allow_restricted => {
            Some(IssueSeverity::Medium)
        }
        ShelfStatus::Restricted if increased => Some(IssueSeverity::High),
        _ => None,
    }
}

/// Compare issues of the before and after states.
#[must_use]
pub fn assess_suitability(
    before: &SimulatedState,
    after: &SimulatedState,
    shelf: &Shelf,
    options: &EngineOptions,
) -> SuitabilityResult {
    let mut before_issues = scan(before, None, shelf, options);
    let after_issues = scan(after, Some(before), shelf, options);

    let mut issues = Vec::new();
    for (key, candidate) in after_issues {
        let prior = before_issues.remove(&key);
        issues.push(SuitabilityIssue {
            status: if prior.is_some() {
                IssueStatus::Persistent
            } else {
                IssueStatus::New
            },
            measured_before: prior.and_then(|p| p.measured),
            measured_after: candidate.measured,
            threshold: candidate.threshold,
            issue_key: key,
            dimension: candidate.dimension,
            severity: candidate.severity,
        });
    }
    for (key, candidate) in before_issues {
        issues.push(SuitabilityIssue {
            issue_key: key,
            dimension: candidate.dimension,
            severity: candidate.severity,
            status: IssueStatus::Resolved,
            measured_before: candidate.measured,
            measured_after: None,
            threshold: candidate.threshold,
        });
    }
    issues.sort_by(|a, b| {
        (a.status, a.severity, a.dimension, &a.issue_key).cmp(&(
            b.status,
            b.severity,
            b.dimension,
            &b.issue_key,
        ))
    });

    let count = |status| issues.iter().filter(|i| i.status == status).count();
    let new_with = |severity| {
        issues
            .iter()
            .any(|i| i.status == IssueStatus::New && i.severity == severity)
    };
    let summary = SuitabilitySummary {
        new: count(IssueStatus::New),
        persistent: count(IssueStatus::Persistent),
        resolved: count(IssueStatus::Resolved),
        new_high: issues
            .iter()
            .filter(|i| i.status == IssueStatus::New && i.severity == IssueSeverity::High)
            .count(),
    };
    let recommended_gate = if new_with(IssueSeverity::High) {
        RecommendedGate::ComplianceReview
    } else if new_with(IssueSeverity::Medium) {
        RecommendedGate::RiskReview
    } else {
        RecommendedGate::None
    };
    SuitabilityResult {
        issues,
        summary,
        recommended_gate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::portfolio::{AllocationRow, PositionValuation, ShelfEntry};
    use crate::domain::shared::{CurrencyCode, Money};

    fn sgd(amount: Decimal) -> Money {
        Money::new(amount, CurrencyCode::new("SGD"))
    }

    fn state(holdings: &[(&str, Decimal)]) -> SimulatedState {
        let invested: Decimal = holdings.iter().map(|(_, w)| *w).sum();
        let cash = Decimal::ONE - invested;
        let positions = holdings
            .iter()
            .map(|(id, w)| PositionValuation {
                instrument_id: InstrumentId::new(*id),
                quantity: dec!(1),
                price: Some(*w * dec!(10000)),
                currency: Some(CurrencyCode::new("SGD")),
                value_base: sgd(*w * dec!(10000)),
                weight: *w,
            })
            .collect();
        let mut rows: Vec<AllocationRow> = holdings
            .iter()
            .map(|(id, w)| AllocationRow {
                key: (*id).to_string(),
                weight: *w,
                value: sgd(*w * dec!(10000)),
            })
            .collect();
        rows.push(AllocationRow {
            key: "CASH".to_string(),
            weight: cash,
            value: sgd(cash * dec!(10000)),
        });
        SimulatedState {
            base_currency: CurrencyCode::new("SGD"),
            total_value: sgd(dec!(10000)),
            positions,
            cash_balances: Vec::new(),
            allocation_by_asset_class: rows.clone(),
            allocation_by_instrument: rows,
            allocation_by_attribute: BTreeMap::new(),
        }
    }

    fn shelf() -> Shelf {
        Shelf::new(vec![
            ShelfEntry::new("EQ_A", ShelfStatus::Approved)
                .with_issuer("ISS_A")
                .with_liquidity_tier("L1"),
            ShelfEntry::new("EQ_B", ShelfStatus::Approved)
                .with_issuer("ISS_B")
                .with_liquidity_tier("L1"),
            ShelfEntry::new("EQ_R", ShelfStatus::Restricted)
                .with_issuer("ISS_R")
                .with_liquidity_tier("L1"),
        ])
    }

    fn issue<'a>(result: &'a SuitabilityResult, key: &str) -> &'a SuitabilityIssue {
        result.issues.iter().find(|i| i.issue_key == key).unwrap()
    }

    #[test]
    fn classifies_new_persistent_resolved() {
        let before = state(&[("EQ_A", dec!(0.15)), ("EQ_B", dec!(0.11))]);
        let after = state(&[("EQ_A", dec!(0.05)), ("EQ_B", dec!(0.12))]);
        let result = assess_suitability(&before, &after, &shelf(), &EngineOptions::default());
        assert_eq!(issue(&result, "SINGLE_POSITION_MAX|EQ_A").status, IssueStatus::Resolved);
        assert_eq!(issue(&result, "SINGLE_POSITION_MAX|EQ_B").status, IssueStatus::Persistent);
        assert_eq!(result.recommended_gate, RecommendedGate::None);
    }

    #[test]
    fn new_high_recommends_compliance_review() {
        let before = state(&[("EQ_A", dec!(0.05))]);
        let after = state(&[("EQ_A", dec!(0.30))]);
        let result = assess_suitability(&before, &after, &shelf(), &EngineOptions::default());
        let concentration = issue(&result, "SINGLE_POSITION_MAX|EQ_A");
        assert_eq!(concentration.status, IssueStatus::New);
        assert_eq!(concentration.severity, IssueSeverity::High);
        assert_eq!(result.recommended_gate, RecommendedGate::ComplianceReview);
        assert_eq!(result.issues[0].status, IssueStatus::New);
    }

    #[test]
    fn new_medium_recommends_risk_review() {
        let before = state(&[("EQ_A", dec!(0.05))]);
        let after = state(&[("EQ_A", dec!(0.12))]);
        let result = assess_suitability(&before, &after, &shelf(), &EngineOptions::default());
        assert_eq!(issue(&result, "SINGLE_POSITION_MAX|EQ_A").severity, IssueSeverity::Medium);
        assert_eq!(result.recommended_gate, RecommendedGate::RiskReview);
    }

    #[test]
    fn restricted_increase_depends_on_allowance() {
        let before = state(&[("EQ_R", dec!(0.02))]);
        let after = state(&[("EQ_R", dec!(0.05))]);
        let strict = assess_suitability(&before, &after, &shelf(), &EngineOptions::default());
        assert_eq!(issue(&strict, "GOVERNANCE|EQ_R|RESTRICTED").severity, IssueSeverity::High);

        let options = EngineOptions {
            allow_restricted: true,
            ..EngineOptions::default()
        };
        let allowed = assess_suitability(&before, &after, &shelf(), &options);
        assert_eq!(issue(&allowed, "GOVERNANCE|EQ_R|RESTRICTED").severity, IssueSeverity::Medium);
    }

    #[test]
    fn missing_enrichment_uses_configured_severity() {
        let before = state(&[]);
        let after = state(&[("EQ_X", dec!(0.05))]);
        let result = assess_suitability(&before, &after, &shelf(), &EngineOptions::default());
        let dq = issue(&result, "DQ|SHELF|EQ_X");
        assert_eq!(dq.severity, IssueSeverity::Low);
        assert_eq!(dq.dimension, IssueDimension::DataQuality);
        assert_eq!(result.recommended_gate, RecommendedGate::None);
    }
}
