//! Fixed rule set evaluated against the simulated after-state.

use rust_decimal::Decimal;

use crate::domain::portfolio::{CASH_BUCKET, PortfolioSnapshot, SimulatedState};
use crate::domain::rebalance::value_objects::{
    DiagnosticsData, EngineOptions, EnginePolicy, RuleResult, RuleSeverity, RunStatus,
};

/// Reason code of a passing rule.
pub const OK: &str = "OK";

/// Evaluate every rule. Always returns the same six rule ids in order.
#[must_use]
pub fn evaluate_rules(
    after: &SimulatedState,
    after_portfolio: &PortfolioSnapshot,
    options: &EngineOptions,
    policy: &EnginePolicy,
    diagnostics: &DiagnosticsData,
) -> Vec<RuleResult> {
    vec![
        cash_band(after, options),
        single_position_max(after, options, policy),
        data_quality(options, diagnostics),
        min_trade_size(options, diagnostics),
        no_shorting(after_portfolio),
        insufficient_cash(after_portfolio),
    ]
}

fn cash_band(after: &SimulatedState, options: &EngineOptions) -> RuleResult {
    let weight = after.cash_weight();
    if weight < options.cash_band_min_weight {
        RuleResult::fail(
            "CASH_BAND",
            RuleSeverity::Soft,
            weight,
            options.cash_band_min_weight,
            "CASH_WEIGHT_BELOW_MIN",
        )
    } else if weight > options.cash_band_max_weight {
        RuleResult::fail(
            "CASH_BAND",
            RuleSeverity::Soft,
            weight,
            options.cash_band_max_weight,
            "CASH_WEIGHT_ABOVE_MAX",
        )
    } else {
        RuleResult::pass("CASH_BAND", RuleSeverity::Soft, weight, options.cash_band_max_weight, OK)
    }
}

fn single_position_max(
    after: &SimulatedState,
    options: &EngineOptions,
    policy: &EnginePolicy,
) -> RuleResult {
    let largest = after
        .allocation_by_instrument
        .iter()
        .filter(|row| row.key != CASH_BUCKET)
        .map(|row| row.weight)
        .max()
        .unwrap_or(Decimal::ZERO);
    let Some(cap) = options.single_position_max_weight else {
        return RuleResult::pass(
            "SINGLE_POSITION_MAX",
            RuleSeverity::Hard,
            largest,
            Decimal::ZERO,
            "NO_LIMIT_SET",
        );
    };
    if largest > cap + policy.single_position_tolerance {
        RuleResult::fail(
            "SINGLE_POSITION_MAX",
            RuleSeverity::Hard,
            largest,
            cap,
            "POSITION_WEIGHT_EXCEEDS_MAX",
        )
    } else {
        RuleResult::pass("SINGLE_POSITION_MAX", RuleSeverity::Hard, largest, cap, OK)
    }
}

fn data_quality(options: &EngineOptions, diagnostics: &DiagnosticsData) -> RuleResult {
    let quality = &diagnostics.data_quality;
    let mut missing = quality.shelf_missing.len();
    if options.block_on_missing_prices {
        missing += quality.price_missing.len();
    }
    if options.block_on_missing_fx {
        missing += quality.fx_missing.len();
    }
    let measured = Decimal::from(missing);
    if missing > 0 {
        RuleResult::fail(
            "DATA_QUALITY",
            RuleSeverity::Hard,
            measured,
            Decimal::ZERO,
            "MISSING_REFERENCE_DATA",
        )
    } else {
        RuleResult::pass("DATA_QUALITY", RuleSeverity::Hard, measured, Decimal::ZERO, OK)
    }
}

fn min_trade_size(options: &EngineOptions, diagnostics: &DiagnosticsData) -> RuleResult {
    let suppressed = diagnostics.suppressed_intents.len();
    let reason = if suppressed > 0 { "INTENTS_SUPPRESSED" } else { OK };
    RuleResult::pass(
        "MIN_TRADE_SIZE",
        RuleSeverity::Soft,
        Decimal::from(suppressed),
        options.min_trade_notional.unwrap_or(Decimal::ZERO),
        reason,
    )
}

fn no_shorting(after: &PortfolioSnapshot) -> RuleResult {
    let shorts = after
        .positions
        .iter()
        .filter(|p| p.quantity < Decimal::ZERO)
        .count();
    let measured = Decimal::from(shorts);
    if shorts > 0 {
        RuleResult::fail(
            "NO_SHORTING",
            RuleSeverity::Hard,
            measured,
            Decimal::ZERO,
            "SHORT_POSITION",
        )
    } else {
        RuleResult::pass("NO_SHORTING", RuleSeverity::Hard, measured, Decimal::ZERO, OK)
    }
}

fn insufficient_cash(after: &PortfolioSnapshot) -> RuleResult {
    let overdrawn = after
        .cash_balances
        .iter()
        .filter(|c| c.amount < Decimal::ZERO)
        .count();
    let measured = Decimal::from(overdrawn);
    if overdrawn > 0 {
        RuleResult::fail(
            "INSUFFICIENT_CASH",
            RuleSeverity::Hard,
            measured,
            Decimal::ZERO,
            "NEGATIVE_CASH_BALANCE",
        )
    } else {
        RuleResult::pass("INSUFFICIENT_CASH", RuleSeverity::Hard, measured, Decimal::ZERO, OK)
    }
}

/// Status implied by rule results alone.
#[must_use]
pub fn derive_status(results: &[RuleResult]) -> RunStatus {
    if results.iter().any(RuleResult::is_hard_fail) {
        RunStatus::Blocked
    } else if results.iter().any(RuleResult::is_soft_fail) {
        RunStatus::PendingReview
    } else {
        RunStatus::Ready
    }
}
