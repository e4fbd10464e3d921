//! FX funding planner: covers currency shortfalls of buys with FX spots.

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;

use super::simulation::apply_intent;
use crate::domain::portfolio::{MarketDataSnapshot, PortfolioSnapshot, pair_label};
use crate::domain::rebalance::value_objects::{
    DiagnosticsData, EngineOptions, FundingPlanEntry, FundingStatus, FundingTieBreak,
    FxFundingSource, FxSpotIntent, InsufficientCashEntry, OrderIntent, RuleResult, RuleSeverity,
    RunStatus, TradeSide,
};
use crate::domain::shared::{CurrencyCode, IntentId};

/// Rule id added when funding fails hard.
pub const FX_FUNDING_RULE: &str = "FX_FUNDING";
/// Funding failed because a rate was missing.
pub const MISSING_FX_FOR_FUNDING: &str = "PROPOSAL_MISSING_FX_FOR_FUNDING";
/// Funding failed because no ledger held enough cash.
pub const INSUFFICIENT_FUNDING_CASH: &str = "INSUFFICIENT_FUNDING_CASH";

/// Result of planning FX funding.
#[derive(Debug, Clone, Default)]
pub struct FundingOutcome {
    /// FX spot intents, `oi_fx_<n>` in currency order.
    pub fx_intents: Vec<OrderIntent>,
    /// Currencies whose buys must not execute.
    pub unfunded: BTreeSet<CurrencyCode>,
    /// Status contribution of the stage.
    pub status: RunStatus,
    /// HARD rule result when funding failed hard.
    pub rule: Option<RuleResult>,
}

struct Failure {
    missing_fx: bool,
}

/// Plan FX spots so every buy currency holds enough cash.
///
/// `working` is the portfolio after cash flows and sells; it is updated with
/// each FX spot so later currencies see the remaining cash.
#[must_use]
pub fn plan_funding(
    working: &mut PortfolioSnapshot,
    intents: &[OrderIntent],
    market: &MarketDataSnapshot,
    options: &EngineOptions,
    tie_break: FundingTieBreak,
    diagnostics: &mut DiagnosticsData,
) -> FundingOutcome {
    let mut outcome = FundingOutcome::default();
    if !options.fx_funding_enabled() {
        return outcome;
    }

    let mut required: BTreeMap<CurrencyCode, Decimal> = BTreeMap::new();
    for trade in intents.iter().filter_map(OrderIntent::as_trade) {
        if trade.side == TradeSide::Buy {
            *required
                .entry(trade.notional.currency.clone())
                .or_insert(Decimal::ZERO) += trade.notional.amount;
        }
    }

    let base = working.base_currency.clone();
    let mut failures = Vec::new();
    for (currency, needed) in &required {
        let available = working.cash(currency).max(Decimal::ZERO);
        let fx_needed = (*needed - available).max(Decimal::ZERO);
        let mut plan = FundingPlanEntry {
            target_currency: currency.clone(),
            required: *needed,
            available_before_fx: available,
            fx_needed,
            funding_currency: None,
            fx_pair: None,
            sell_amount_estimated: None,
            fx_intent_id: None,
            status: FundingStatus::NoFxNeeded,
        };
        if fx_needed.is_zero() {
            diagnostics.funding_plan.push(plan);
            continue;
        }

        let mut missing_rate = false;
        let mut closest: Option<(CurrencyCode, Decimal)> = None;
        let mut funded = false;
        for candidate in candidates(working, currency, &base, options, tie_break) {
            let pair = pair_label(currency, &candidate);
            let Some(rate) = market.fx_rate(currency, &candidate) else {
                diagnostics.record_missing_funding_pair(&pair);
                missing_rate = true;
                continue;
            };
            let sell_amount = candidate.quantize(fx_needed * rate);
            let reserved = required.get(&candidate).copied().unwrap_or(Decimal::ZERO);
            let spare = (working.cash(&candidate) - reserved).max(Decimal::ZERO);
            if spare >= sell_amount {
                let intent_id = IntentId::new(format!("oi_fx_{}", outcome.fx_intents.len() + 1));
                let intent = OrderIntent::FxSpot(FxSpotIntent {
                    intent_id: intent_id.clone(),
                    pair: pair.clone(),
                    buy_currency: currency.clone(),
                    buy_amount: currency.quantize(fx_needed),
                    sell_currency: candidate.clone(),
                    sell_amount_estimated: sell_amount,
                    rate,
                    dependencies: Vec::new(),
                });
                apply_intent(working, &intent);
                outcome.fx_intents.push(intent);
                plan.funding_currency = Some(candidate);
                plan.fx_pair = Some(pair);
                plan.sell_amount_estimated = Some(sell_amount);
                plan.fx_intent_id = Some(intent_id);
                plan.status = FundingStatus::Funded;
                funded = true;
                break;
            }
            let deficit = sell_amount - spare;
            if closest.as_ref().is_none_or(|(_, best)| deficit < *best) {
                closest = Some((candidate, deficit));
            }
        }

        if !funded {
            if missing_rate && !options.block_on_missing_fx {
                plan.status = FundingStatus::Unfunded;
                outcome.status = outcome.status.worst(RunStatus::PendingReview);
                diagnostics.warn(format!("FX_FUNDING_UNAVAILABLE:{currency}"));
            } else if missing_rate {
                plan.status = FundingStatus::MissingFx;
                failures.push(Failure { missing_fx: true });
            } else {
                plan.status = FundingStatus::InsufficientCash;
                let (funding_currency, deficit) = match closest {
                    Some((c, d)) => (Some(c), d),
                    None => (None, fx_needed),
                };
                diagnostics.insufficient_cash.push(InsufficientCashEntry {
                    currency: currency.clone(),
                    required: fx_needed,
                    funding_currency,
                    deficit,
                });
                failures.push(Failure { missing_fx: false });
            }
            diagnostics.mark_unfunded(currency);
            outcome.unfunded.insert(currency.clone());
        }
        diagnostics.funding_plan.push(plan);
    }

    if !failures.is_empty() {
        let reason = if failures.iter().any(|f| f.missing_fx) {
            MISSING_FX_FOR_FUNDING
        } else {
            INSUFFICIENT_FUNDING_CASH
        };
        outcome.status = RunStatus::Blocked;
        outcome.rule = Some(RuleResult::fail(
            FX_FUNDING_RULE,
            RuleSeverity::Hard,
            Decimal::from(failures.len()),
            Decimal::ZERO,
            reason,
        ));
    }
    outcome
}

/// Funding currencies to try for `target`, in order.
fn candidates(
    working: &PortfolioSnapshot,
    target: &CurrencyCode,
    base: &CurrencyCode,
    options: &EngineOptions,
    tie_break: FundingTieBreak,
) -> Vec<CurrencyCode> {
    if options.fx_funding_source == FxFundingSource::BaseOnly {
        return if base == target { Vec::new() } else { vec![base.clone()] };
    }
    let mut ledgers: Vec<CurrencyCode> = working
        .ledger_currencies()
        .into_iter()
        .filter(|c| c != target && working.cash(c) > Decimal::ZERO)
        .collect();
    match tie_break {
        FundingTieBreak::BaseFirstThenLexical => {
            ledgers.retain(|c| c != base);
            if base != target {
                ledgers.insert(0, base.clone());
            }
        }
        FundingTieBreak::Lexical => {
            if base != target && !ledgers.contains(base) {
                ledgers.push(base.clone());
                ledgers.sort();
            }
        }
    }
    ledgers
}
