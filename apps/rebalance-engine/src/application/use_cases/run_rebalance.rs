//! Run Rebalance Use Case

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tracing::{info, warn};

use crate::application::dto::{RebalanceRequest, VOLATILE_FIELDS};
use crate::application::services::{
    IdempotencyCache, IdempotencyLookup, correlation_id, request_hash, run_id,
};
use crate::application::use_cases::run_report::log_run;
use crate::domain::rebalance::RebalanceEngine;
use crate::domain::rebalance::value_objects::{EngineOptions, RebalanceResult, RunIdentity};
use crate::error::EngineError;

/// Run id prefix for rebalance runs.
pub const REBALANCE_RUN_PREFIX: &str = "rr_";

/// Use case for model-driven rebalance runs.
#[derive(Debug)]
pub struct RunRebalanceUseCase {
    engine: Arc<RebalanceEngine>,
    default_options: EngineOptions,
    cache: Mutex<IdempotencyCache<RebalanceResult>>,
}

impl RunRebalanceUseCase {
    /// Create a new RunRebalanceUseCase.
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
    pub fn execute(&self, request: &RebalanceRequest) -> Result<RebalanceResult, EngineError> {
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

        // 4. Run the engine
        let identity = RunIdentity {
            run_id: run_id(REBALANCE_RUN_PREFIX, &hash),
            correlation_id: correlation_id(request.correlation_id.as_deref(), &hash),
            request_hash: hash.clone(),
            requested_at: request.requested_at.unwrap_or_else(Utc::now),
        };
        info!(
            run_id = identity.run_id.as_str(),
            correlation_id = identity.correlation_id.as_str(),
            portfolio_id = %request.portfolio.portfolio_id,
            model_id = %request.model.model_id,
            "Starting rebalance run"
        );
        let result = self.engine.run_rebalance(&inputs, identity);
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
                    "Replaying cached rebalance result"
                );
                Ok(Some(result))
            }
            IdempotencyLookup::Conflict { stored_hash } => {
                warn!(
                    idempotency_key = key,
                    stored_hash = %stored_hash,
                    request_hash = hash,
                    "Idempotency key reused with a different request"
                );
                Err(EngineError::idempotency_conflict(key))
            }
        }
    }

    fn lock_cache(&self) -> MutexGuard<'_, IdempotencyCache<RebalanceResult>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
