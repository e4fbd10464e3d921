//! Tracing Setup
//!
//! Initializes the `tracing` subscriber for the engine binary.
//!
//! # Configuration
//!
//! - `RUST_LOG`: Overrides the filter (default: `rebalance_engine=<level>`)
//! - `observability.logging.format`: `json` for structured output, `pretty` for console
//!
//! # Usage
//!
//! ```rust,ignore
//! use rebalance_engine::telemetry::init_tracing;
//!
//! let config = load_config(None)?;
//! init_tracing(&config.observability.logging);
//! ```

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingConfig;

/// Build the filter from `RUST_LOG`, falling back to the configured level.
fn env_filter(logging: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("rebalance_engine={}", logging.level)))
}

/// Initialize tracing with the configured format.
///
/// Logs go to stderr so stdout stays reserved for results. Calling this
/// twice is harmless; the second registration is ignored.
pub fn init_tracing(logging: &LoggingConfig) {
    let registry = tracing_subscriber::registry().with(env_filter(logging));

    let result = if logging.format == "pretty" {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(true),
            )
            .try_init()
    };

    if let Err(e) = result {
        eprintln!("Tracing already initialized: {e}");
    }
}
