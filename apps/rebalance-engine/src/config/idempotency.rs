//! Idempotency cache configuration.

use serde::{Deserialize, Serialize};

/// Idempotency cache configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdempotencyConfig {
    /// Maximum cached results before the least recently used is evicted.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

impl Default for IdempotencyConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
        }
    }
}

const fn default_capacity() -> usize {
    1024
}
