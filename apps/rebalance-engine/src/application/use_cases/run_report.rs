//! Structured logging of a finished run.

use tracing::{debug, info, warn};

use crate::domain::rebalance::value_objects::{OrderIntent, RebalanceResult};

/// Emit per-stage debug events, warnings and the closing summary.
pub(crate) fn log_run(result: &RebalanceResult) {
    let run_id = result.identity.run_id.as_str();
    let diagnostics = &result.diagnostics;

    if let Some(target) = &result.target {
        debug!(
            run_id,
            targets = target.instruments.len(),
            target_status = target.status.as_str(),
            excluded = diagnostics.excluded_instruments.len(),
            "Targets generated"
        );
    }
    if let Some(solver) = &diagnostics.solver {
        for attempt in &solver.attempts {
            debug!(
                run_id,
                backend = %attempt.backend,
                profile = %attempt.profile,
                outcome = %attempt.outcome,
                "Solver attempt"
            );
        }
        if solver.attempts.len() > 1 {
            warn!(run_id, attempts = solver.attempts.len(), "Solver fell back to another attempt");
        }
    }
    debug!(
        run_id,
        funding_entries = diagnostics.funding_plan.len(),
        unfunded = diagnostics.unfunded_currencies.len(),
        suppressed = diagnostics.suppressed_intents.len(),
        dropped = diagnostics.dropped_intents.len(),
        "Intents planned"
    );
    debug!(
        run_id,
        reconciliation = ?result.reconciliation.status,
        rules = result.rule_results.len(),
        "Rules evaluated"
    );

    for warning in &diagnostics.warnings {
        warn!(run_id, warning = %warning, "Run warning");
    }

    let fx_intents = result
        .intents
        .iter()
        .filter(|i| matches!(i, OrderIntent::FxSpot(_)))
        .count();
    info!(
        run_id,
        correlation_id = result.identity.correlation_id.as_str(),
        mode = ?result.mode,
        status = result.status.as_str(),
        gate = ?result.gate.gate,
        intents = result.intents.len(),
        fx_intents,
        "Run finished"
    );
}
