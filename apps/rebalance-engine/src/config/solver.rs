//! Solver chain configuration.

use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::domain::rebalance::{SolverBackend, SolverSettings};

/// Solver configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Backends tried in order.
    #[serde(default = "default_backends")]
    pub backends: Vec<SolverBackend>,
    /// Iteration budget per attempt.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    /// Wall-clock budget per attempt in milliseconds; 0 disables it.
    #[serde(default = "default_time_budget_ms")]
    pub time_budget_ms: u64,
    /// Tolerance of the strict profile.
    #[serde(default = "default_strict_tolerance")]
    pub strict_tolerance: Decimal,
    /// Tolerance of the compatibility profile.
    #[serde(default = "default_compat_tolerance")]
    pub compat_tolerance: Decimal,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            backends: default_backends(),
            max_iterations: default_max_iterations(),
            time_budget_ms: default_time_budget_ms(),
            strict_tolerance: default_strict_tolerance(),
            compat_tolerance: default_compat_tolerance(),
        }
    }
}

impl SolverConfig {
    /// Convert to the domain solver settings.
    #[must_use]
    pub fn to_settings(&self) -> SolverSettings {
        SolverSettings {
            backends: self.backends.clone(),
            max_iterations: self.max_iterations,
            time_budget: (self.time_budget_ms > 0)
                .then(|| Duration::from_millis(self.time_budget_ms)),
            strict_tolerance: self.strict_tolerance,
            compat_tolerance: self.compat_tolerance,
        }
    }
}

fn default_backends() -> Vec<SolverBackend> {
    vec![SolverBackend::Dykstra, SolverBackend::DualAscent]
}

const fn default_max_iterations() -> u32 {
    5000
}

const fn default_time_budget_ms() -> u64 {
    2000
}

const fn default_strict_tolerance() -> Decimal {
    dec!(0.0000000001)
}

const fn default_compat_tolerance() -> Decimal {
    dec!(0.0000001)
}
