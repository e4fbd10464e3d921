//! Simulate Proposal Use Case

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tracing::{info, warn};

use crate::application::dto::{ProposalRequest, VOLATILE_FIELDS};
use crate::application::services::{
    IdempotencyCache, IdempotencyLookup, correlation_id, request_hash, run_id,
};
use crate::application::use_cases::run_report::log_run;
use crate::domain::rebalance::RebalanceEngine;
use crate::domain::rebalance::value_objects::{EngineOptions, RebalanceResult, RunIdentity};
use crate::error::EngineError;

/// Run id prefix for advisory proposal runs.
pub const PROPOSAL_RUN_PREFIX: &str = "pr_";

/// Use case for advisory proposal simulation.
#[derive(Debug)]
pub struct SimulateProposalUseCase {
    engine: Arc<RebalanceEngine>,
    default_options: EngineOptions,
    cache: Mutex<IdempotencyCache<RebalanceResult>>,
}

impl SimulateProposalUseCase {
    /// Create a new SimulateProposalUseCase.
    #[must_use]
    pub fn new(
        engine: Arc<RebalanceEngine>,
        default_options: EngineOptions,
        cache_capacity: usize,
    ) -> Self {
        Self {
            engine,
            default_options,
            cache: Mutex::new(IdempotencyCache::new(cache_capacity)),
        }
    }

    /// Execute the use case.
    ///
    /// # Errors
    ///
    /// Returns `INVALID_REQUEST`/`INVALID_OPTIONS` for rejected requests and
    /// `IDEMPOTENCY_CONFLICT` when the key was used for a different request.
    pub fn execute(&self, request: &ProposalRequest) -> Result<RebalanceResult, EngineError> {
        // 1. Validate at the boundary
        request.validate()?;

        // 2. Resolve options and hash the request
        let inputs = request.to_inputs(&self.default_options);
        let mut hashed = request.clone();
        hashed.options = Some(inputs.options.clone());
        let hash = request_hash(&hashed, &VOLATILE_FIELDS)
            .map_err(|e| EngineError::invalid_request("request", e.to_string()))?;

        // 3. Replay or reject a reused key
        let key = request.idempotency_key.as_deref();
        if let Some(key) = key {
            if let Some(replayed) = self.check_key(key, &hash)? {
                return Ok(replayed);
            }
        }

        // 4. Simulate
        let identity = RunIdentity {
            run_id: run_id(PROPOSAL_RUN_PREFIX, &hash),
            correlation_id: correlation_id(request.correlation_id.as_deref(), &hash),
            request_hash: hash.clone(),
            requested_at: request.requested_at.unwrap_or_else(Utc::now),
        };
        info!(
            run_id = identity.run_id.as_str(),
            correlation_id = identity.correlation_id.as_str(),
            portfolio_id = %request.portfolio.portfolio_id,
            cash_flows = request.proposed_cash_flows.len(),
            trades = request.proposed_trades.len(),
            "Starting proposal simulation"
        );
        let result = self.engine.simulate_proposal(&inputs, identity);
        log_run(&result);

        // 5. Remember the result; an entry stored meanwhile wins
        if let Some(key) = key {
            if let Some(stored) = self.check_key(key, &hash)? {
                return Ok(stored);
            }
            self.lock_cache().insert(key, hash, result.clone());
        }

        Ok(result)
    }

    fn check_key(&self, key: &str, hash: &str) -> Result<Option<RebalanceResult>, EngineError> {
        let lookup = self.lock_cache().lookup(key, hash);
        match lookup {
            IdempotencyLookup::Miss => Ok(None),
            IdempotencyLookup::Replay(result) => {
                info!(
                    idempotency_key = key,
                    run_id = result.identity.run_id.as_str(),
                    "Replaying cached proposal result"
                );
                Ok(Some(result))
            }
            IdempotencyLookup::Conflict { stored_hash } => {
                warn!(
                    idempotency_key = key,
                    stored_hash = %stored_hash,
                    request_hash = hash,
                    "Idempotency key reused with a different proposal"
                );
                Err(EngineError::idempotency_conflict(key))
            }
        }
    }

    fn lock_cache(&self) -> MutexGuard<'_, IdempotencyCache<RebalanceResult>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rebalance::value_objects::{OrderIntent, RunMode};
    use crate::error::ErrorCode;

    fn use_case() -> SimulateProposalUseCase {
        SimulateProposalUseCase::new(
            Arc::new(RebalanceEngine::default()),
            EngineOptions::default(),
            8,
        )
    }

    fn request() -> ProposalRequest {
        let json = r#"{
            "portfolio": {
                "portfolio_id": "pf_adv",
                "base_currency": "USD",
                "cash_balances": [{"currency": "USD", "amount": "10000"}]
            },
            "market_data": {
                "prices": [{"instrument_id": "EQ_1", "price": "100", "currency": "USD"}]
            },
            "shelf": [{"instrument_id": "EQ_1", "status": "APPROVED"}],
            "proposed_cash_flows": [{"currency": "USD", "amount": "1000"}],
            "proposed_trades": [{"side": "BUY", "instrument_id": "EQ_1", "quantity": "10"}]
        }"#;
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn proposal_run_uses_advisory_identity() {
        let result = use_case().execute(&request()).unwrap();
        assert!(result.identity.run_id.as_str().starts_with("pr_"));
        assert_eq!(result.mode, RunMode::Advisory);
        assert!(result.target.is_none());
        assert!(matches!(result.intents.first(), Some(OrderIntent::CashFlow(_))));
    }

    #[test]
    fn proposal_key_conflict() {
        let uc = use_case();
        let mut req = request();
        req.idempotency_key = Some("adv-1".to_string());
        uc.execute(&req).unwrap();

        req.proposed_trades.clear();
        assert_eq!(
            uc.execute(&req).unwrap_err().code(),
            ErrorCode::IdempotencyConflict
        );
    }
}
