//! After-state total versus an independently projected total.

use rust_decimal::Decimal;

use crate::domain::portfolio::{MarketDataSnapshot, SimulatedState};
use crate::domain::rebalance::value_objects::{
    EnginePolicy, OrderIntent, Reconciliation, ReconciliationStatus, RuleResult, RuleSeverity,
    RunMode,
};
use crate::domain::shared::Money;

/// Rule id added on mismatch.
pub const RECONCILIATION_RULE: &str = "RECONCILIATION";

/// Compare the after total with before total plus external cash flows.
///
/// Trades and FX spots are value-neutral at the snapshot prices, so only cash
/// flows move the expected total. A mismatch also returns a HARD rule failure.
#[must_use]
pub fn reconcile(
    mode: RunMode,
    before: &SimulatedState,
    after: &SimulatedState,
    intents: &[OrderIntent],
    market: &MarketDataSnapshot,
    policy: &EnginePolicy,
) -> (Reconciliation, Option<RuleResult>) {
    let base = &before.base_currency;
    let flows: Decimal = intents
        .iter()
        .filter_map(|intent| match intent {
            OrderIntent::CashFlow(flow) => {
                market.convert(flow.amount.amount, &flow.amount.currency, base)
            }
            _ => None,
        })
        .sum();
    let expected = before.total_value.amount + flows;
    let scale = match mode {
        RunMode::Rebalance => expected,
        RunMode::Advisory => expected.abs(),
    };
    let tolerance = policy.reconciliation_absolute_tolerance
        + scale * policy.reconciliation_relative_tolerance;
    let diff = (after.total_value.amount - expected).abs();
    let status = if diff > tolerance {
        ReconciliationStatus::Mismatch
    } else {
        ReconciliationStatus::Ok
    };

    let reconciliation = Reconciliation {
        status,
        before_total: before.total_value.clone(),
        after_total: after.total_value.clone(),
        expected_total: Money::quantized(expected, base.clone()),
        diff,
        tolerance,
    };
    let rule = (status == ReconciliationStatus::Mismatch).then(|| {
        RuleResult::fail(
            RECONCILIATION_RULE,
            RuleSeverity::Hard,
            diff,
            tolerance,
            "RECONCILIATION_MISMATCH",
        )
    });
    (reconciliation, rule)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rebalance::value_objects::CashFlowIntent;
    use crate::domain::shared::{CurrencyCode, IntentId};
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    fn state(total: Decimal) -> SimulatedState {
        SimulatedState {
            base_currency: CurrencyCode::new("SGD"),
            total_value: Money::new(total, CurrencyCode::new("SGD")),
            positions: Vec::new(),
            cash_balances: Vec::new(),
            allocation_by_asset_class: Vec::new(),
            allocation_by_instrument: Vec::new(),
            allocation_by_attribute: BTreeMap::new(),
        }
    }

    fn market() -> MarketDataSnapshot {
        MarketDataSnapshot {
            prices: Vec::new(),
            fx_rates: Vec::new(),
        }
    }

    #[test]
    fn within_tolerance_is_ok() {
        // tolerance = 0.5 + 10000 * 0.0005 = 5.5
        let (rec, rule) = reconcile(
            RunMode::Rebalance,
            &state(dec!(10000)),
            &state(dec!(10005.50)),
            &[],
            &market(),
            &EnginePolicy::default(),
        );
        assert_eq!(rec.status, ReconciliationStatus::Ok);
        assert_eq!(rec.tolerance, dec!(5.5));
        assert!(rule.is_none());
    }

    #[test]
    fn beyond_tolerance_adds_hard_rule() {
        let (rec, rule) = reconcile(
            RunMode::Rebalance,
            &state(dec!(10000)),
            &state(dec!(10005.51)),
            &[],
            &market(),
            &EnginePolicy::default(),
        );
        assert_eq!(rec.status, ReconciliationStatus::Mismatch);
        assert!(rule.unwrap().is_hard_fail());
    }

    #[test]
    fn advisory_expects_cash_flows() {
        let withdrawal = OrderIntent::CashFlow(CashFlowIntent {
            intent_id: IntentId::new("oi_cf_1"),
            amount: Money::new(dec!(-12000), CurrencyCode::new("SGD")),
            dependencies: Vec::new(),
        });
        let (rec, rule) = reconcile(
            RunMode::Advisory,
            &state(dec!(10000)),
            &state(dec!(-2000)),
            &[withdrawal],
            &market(),
            &EnginePolicy::default(),
        );
        assert_eq!(rec.expected_total.amount, dec!(-2000));
        assert_eq!(rec.tolerance, dec!(1.5));
        assert!(rule.is_none());
    }
}
