//! Rebalance and advisory pipelines.

use serde::{Deserialize, Serialize};

use super::funding::plan_funding;
use super::proposal::proposal_intents;
use super::reconciliation::reconcile;
use super::rules::{derive_status, evaluate_rules};
use super::sequencer::sequence_intents;
use super::simulation::{apply_intent, simulate};
use super::solver::{SolverSettings, TargetSolver, solver_targets};
use super::targets::heuristic_targets;
use super::trade_generation::generate_trades;
use super::universe::build_universe;
use crate::domain::analytics::{analyze_drift, assess_suitability};
use crate::domain::portfolio::{
    MarketDataSnapshot, ModelPortfolio, PortfolioSnapshot, ReferenceModel, Shelf, ShelfEntry,
    SimulatedState, value_portfolio,
};
use crate::domain::rebalance::value_objects::{
    DiagnosticsData, EngineOptions, EnginePolicy, OrderIntent, ProposedCashFlow, ProposedTrade,
    RebalanceResult, RunIdentity, RunMode, RunStatus, TargetMethod, TargetTrace,
};
use crate::domain::workflow::decide_gate;

/// Inputs of a model-driven rebalance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebalanceInputs {
    /// Current holdings.
    pub portfolio: PortfolioSnapshot,
    /// Prices and rates.
    pub market_data: MarketDataSnapshot,
    /// Target model.
    pub model: ModelPortfolio,
    /// Governance shelf.
    pub shelf: Vec<ShelfEntry>,
    /// Run options.
    #[serde(default)]
    pub options: EngineOptions,
    /// Reference model for drift; derived from the model when absent.
    #[serde(default)]
    pub reference_model: Option<ReferenceModel>,
}

/// Inputs of an advisory proposal simulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalInputs {
    /// Current holdings.
    pub portfolio: PortfolioSnapshot,
    /// Prices and rates.
    pub market_data: MarketDataSnapshot,
    /// Governance shelf.
    pub shelf: Vec<ShelfEntry>,
    /// Run options.
    #[serde(default)]
    pub options: EngineOptions,
    /// Proposed cash movements.
    #[serde(default)]
    pub cash_flows: Vec<ProposedCashFlow>,
    /// Proposed trades.
    #[serde(default)]
    pub trades: Vec<ProposedTrade>,
    /// Reference model for drift; drift is skipped when absent.
    #[serde(default)]
    pub reference_model: Option<ReferenceModel>,
}

/// The decision engine. Stateless between runs; safe to share.
pub struct RebalanceEngine {
    policy: EnginePolicy,
    solvers: Vec<Box<dyn TargetSolver>>,
    solver_settings: SolverSettings,
}

impl std::fmt::Debug for RebalanceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RebalanceEngine")
            .field("policy", &self.policy)
            .field("solvers", &self.solvers.iter().map(|s| s.name()).collect::<Vec<_>>())
            .field("solver_settings", &self.solver_settings)
            .finish()
    }
}

impl Default for RebalanceEngine {
    fn default() -> Self {
        Self::new(EnginePolicy::default(), SolverSettings::default())
    }
}

/// Stage results shared by both run modes before the common tail.
struct Prepared<'a> {
    mode: RunMode,
    portfolio: &'a PortfolioSnapshot,
    market: &'a MarketDataSnapshot,
    shelf: &'a Shelf,
    options: &'a EngineOptions,
    before: SimulatedState,
    target: Option<TargetTrace>,
    intents: Vec<OrderIntent>,
    status: RunStatus,
    reference: Option<ReferenceModel>,
    diagnostics: DiagnosticsData,
}

impl RebalanceEngine {
    /// Create an engine with the configured backend chain.
    #[must_use]
    pub fn new(policy: EnginePolicy, solver_settings: SolverSettings) -> Self {
        let solvers = solver_settings
            .backends
            .iter()
            .map(|backend| backend.instantiate())
            .collect();
        Self::with_solvers(policy, solver_settings, solvers)
    }

    /// Create an engine with explicit solver instances.
    #[must_use]
    pub fn with_solvers(
        policy: EnginePolicy,
        solver_settings: SolverSettings,
        solvers: Vec<Box<dyn TargetSolver>>,
    ) -> Self {
        Self {
            policy,
            solvers,
            solver_settings,
        }
    }

    /// Engine policy.
    #[must_use]
    pub const fn policy(&self) -> &EnginePolicy {
        &self.policy
    }

    /// Run a model-driven rebalance.
    #[must_use]
    pub fn run_rebalance(
        &self,
        inputs: &RebalanceInputs,
        identity: RunIdentity,
    ) -> RebalanceResult {
        let shelf = Shelf::new(inputs.shelf.clone());
        let options = &inputs.options;
        let portfolio = &inputs.portfolio;
        let market = &inputs.market_data;
        let base = &portfolio.base_currency;

        // 1. Value the starting state
        let mut diagnostics = DiagnosticsData::default();
        let before = valued(portfolio, market, &shelf, &mut diagnostics);

        // 2. Classify instruments
        let universe = build_universe(
            portfolio,
            &before,
            market,
            &inputs.model,
            &shelf,
            options,
            &mut diagnostics,
        );

        // 3. Final targets
        let trace = match options.target_method {
            TargetMethod::Heuristic => {
                heuristic_targets(&universe, &shelf, options, base, &mut diagnostics)
            }
            TargetMethod::Solver => solver_targets(
                &universe,
                &shelf,
                options,
                &self.solvers,
                &self.solver_settings,
                base,
                &mut diagnostics,
            ),
        };

        // 4. Trades, unless targets are blocked
        let intents = if trace.status == RunStatus::Blocked {
            Vec::new()
        } else {
            generate_trades(&universe, &trace, base, options, &mut diagnostics)
        };

        let reference = inputs
            .reference_model
            .clone()
            .unwrap_or_else(|| ReferenceModel::from_model(&inputs.model, &shelf));
        self.finish(
            Prepared {
                mode: RunMode::Rebalance,
                portfolio,
                market,
                shelf: &shelf,
                options,
                before,
                status: trace.status,
                target: Some(trace),
                intents,
                reference: Some(reference),
                diagnostics,
            },
            identity,
        )
    }

    /// Simulate caller-proposed cash flows and trades.
    #[must_use]
    pub fn simulate_proposal(
        &self,
        inputs: &ProposalInputs,
        identity: RunIdentity,
    ) -> RebalanceResult {
        let shelf = Shelf::new(inputs.shelf.clone());
        let options = &inputs.options;
        let portfolio = &inputs.portfolio;
        let market = &inputs.market_data;

        let mut diagnostics = DiagnosticsData::default();
        let before = valued(portfolio, market, &shelf, &mut diagnostics);
        let intents = proposal_intents(
            &portfolio.base_currency,
            market,
            &shelf,
            options,
            &inputs.cash_flows,
            &inputs.trades,
            &mut diagnostics,
        );
        self.finish(
            Prepared {
                mode: RunMode::Advisory,
                portfolio,
                market,
                shelf: &shelf,
                options,
                before,
                target: None,
                intents,
                status: RunStatus::Ready,
                reference: inputs.reference_model.clone(),
                diagnostics,
            },
            identity,
        )
    }

    /// Funding, sequencing, simulation, rules, reconciliation and analytics.
    fn finish(&self, prepared: Prepared<'_>, identity: RunIdentity) -> RebalanceResult {
        let Prepared {
            mode,
            portfolio,
            market,
            shelf,
            options,
            before,
            target,
            intents,
            mut status,
            reference,
            mut diagnostics,
        } = prepared;

        // 5. Fund buys from the cash left after flows and sells
        let mut working = portfolio.clone();
        for intent in intents.iter().filter(|i| !i.is_buy() && i.as_fx().is_none()) {
            apply_intent(&mut working, intent);
        }
        let funding = plan_funding(
            &mut working,
            &intents,
            market,
            options,
            self.policy.funding_tie_break,
            &mut diagnostics,
        );
        status = status.worst(funding.status);

        // 6. Order, drop unfunded buys, simulate
        let mut all = intents;
        all.extend(funding.fx_intents);
        let intents = sequence_intents(all, &funding.unfunded, options, &mut diagnostics);
        let after_portfolio = simulate(portfolio, &intents);
        let after = value_portfolio(&after_portfolio, market, shelf).state;

        // 7. Rules and reconciliation
        let mut rule_results =
            evaluate_rules(&after, &after_portfolio, options, &self.policy, &diagnostics);
        rule_results.extend(funding.rule);
        let (reconciliation, mismatch) =
            reconcile(mode, &before, &after, &intents, market, &self.policy);
        rule_results.extend(mismatch);
        status = status.worst(derive_status(&rule_results));

        // 8. Analytics and gate
        let drift = reference
            .as_ref()
            .filter(|_| options.drift.enabled)
            .map(|reference| analyze_drift(reference, &before, &after, &options.drift));
        let suitability = options
            .suitability
            .enabled
            .then(|| assess_suitability(&before, &after, shelf, options));
        diagnostics.normalize();
        let gate = decide_gate(
            status,
            &rule_results,
            &diagnostics,
            suitability.as_ref(),
            &options.workflow,
            self.policy.require_client_consent,
        );

        RebalanceResult {
            identity,
            mode,
            status,
            before,
            after,
            target,
            intents,
            rule_results,
            reconciliation,
            drift,
            suitability,
            gate,
            diagnostics,
        }
    }
}

fn valued(
    portfolio: &PortfolioSnapshot,
    market: &MarketDataSnapshot,
    shelf: &Shelf,
    diagnostics: &mut DiagnosticsData,
) -> SimulatedState {
    let outcome = value_portfolio(portfolio, market, shelf);
    for instrument_id in &outcome.missing_prices {
        diagnostics.record_missing_price(instrument_id);
    }
    for pair in outcome.missing_fx {
        diagnostics.record_missing_fx(pair);
    }
    outcome.state
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::portfolio::{CashBalance, FxRate, ModelTarget, Price, ShelfStatus};
    use crate::domain::rebalance::value_objects::{RuleStatus, TradeSide};
    use crate::domain::shared::{CorrelationId, CurrencyCode, InstrumentId, RunId};
    use crate::domain::workflow::Gate;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn identity() -> RunIdentity {
        RunIdentity {
            run_id: RunId::new("rr_test"),
            correlation_id: CorrelationId::new("corr_test"),
            request_hash: "sha256:test".to_string(),
            requested_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn inputs(weight: Decimal) -> RebalanceInputs {
        RebalanceInputs {
            portfolio: PortfolioSnapshot {
                portfolio_id: "pf".to_string(),
                base_currency: CurrencyCode::new("SGD"),
                positions: Vec::new(),
                cash_balances: vec![CashBalance {
                    currency: CurrencyCode::new("SGD"),
                    amount: dec!(10000),
                }],
            },
            market_data: MarketDataSnapshot {
                prices: vec![Price {
                    instrument_id: InstrumentId::new("US_EQ"),
                    price: dec!(100),
                    currency: CurrencyCode::new("USD"),
                }],
                fx_rates: vec![FxRate {
                    pair: "USD/SGD".to_string(),
                    rate: dec!(1.35),
                }],
            },
            model: ModelPortfolio {
                model_id: "m1".to_string(),
                targets: vec![ModelTarget {
                    instrument_id: InstrumentId::new("US_EQ"),
                    weight,
                }],
            },
            shelf: vec![
                ShelfEntry::new("US_EQ", ShelfStatus::Approved)
                    .with_asset_class("EQUITY")
                    .with_issuer("ISS_US")
                    .with_liquidity_tier("L1"),
            ],
            options: EngineOptions::default(),
            reference_model: None,
        }
    }

    #[test]
    fn funds_foreign_buy_with_fx() {
        let mut request = inputs(dec!(0.675));
        request.options.suitability.enabled = false;
        let result = RebalanceEngine::default().run_rebalance(&request, identity());

        assert_eq!(result.intents.len(), 2);
        let fx = result.intents[0].as_fx().unwrap();
        assert_eq!(fx.buy_amount, dec!(5000.00));
        assert_eq!(fx.sell_amount_estimated, dec!(6750.00));
        let buy = result.intents[1].as_trade().unwrap();
        assert_eq!(buy.side, TradeSide::Buy);
        assert_eq!(buy.quantity, dec!(50));
        assert_eq!(buy.dependencies, vec![fx.intent_id.clone()]);

        assert_eq!(result.status, RunStatus::Ready);
        assert!(result.rule_results.iter().all(|r| r.status == RuleStatus::Pass));
        assert_eq!(result.gate.gate, Gate::ClientConsentRequired);
        assert_eq!(result.after.total_value.amount, dec!(10000.00));
    }

    #[test]
    fn caller_snapshot_is_not_mutated() {
        let request = inputs(dec!(0.5));
        let copy = request.clone();
        let _ = RebalanceEngine::default().run_rebalance(&request, identity());
        assert_eq!(request, copy);
    }

    #[test]
    fn identical_inputs_give_identical_results() {
        let request = inputs(dec!(0.4));
        let engine = RebalanceEngine::default();
        let a = engine.run_rebalance(&request, identity());
        let b = engine.run_rebalance(&request, identity());
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn solver_method_without_backends_blocks() {
        let mut request = inputs(dec!(0.5));
        request.options.target_method = TargetMethod::Solver;
        let engine = RebalanceEngine::with_solvers(
            EnginePolicy::default(),
            SolverSettings::default(),
            Vec::new(),
        );
        let result = engine.run_rebalance(&request, identity());
        assert_eq!(result.status, RunStatus::Blocked);
        assert!(result.intents.is_empty());
        assert!(result.target.unwrap().instruments.is_empty());
        assert_eq!(
            result.diagnostics.solver.unwrap().failure.as_deref(),
            Some("SOLVER_ERROR")
        );
        assert_eq!(result.gate.gate, Gate::Blocked);
    }
}
