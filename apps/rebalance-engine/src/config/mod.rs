//! Configuration module for the rebalance engine.
//!
//! Loads YAML configuration with environment variable interpolation and
//! validates it before any engine is built.
//!
//! # Usage
//!
//! ```rust,ignore
//! use rebalance_engine::config::load_config;
//!
//! // Load from default path (config.yaml)
//! let config = load_config(None)?;
//!
//! // Load from custom path
//! let config = load_config(Some("custom/config.yaml"))?;
//!
//! println!("cache capacity: {}", config.idempotency.capacity);
//! ```

mod idempotency;
mod observability;
mod policy;
mod solver;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::rebalance::value_objects::EngineOptions;

pub use idempotency::IdempotencyConfig;
pub use observability::{LoggingConfig, ObservabilityConfig};
pub use policy::{PolicyConfig, ReconciliationToleranceConfig};
pub use solver::SolverConfig;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("Failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),

    /// Configuration validation failed.
    #[error("Config validation failed: {0}")]
    ValidationError(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Default options for requests that do not carry their own.
    #[serde(default)]
    pub options: EngineOptions,
    /// Engine policy constants.
    #[serde(default)]
    pub policy: PolicyConfig,
    /// Solver chain.
    #[serde(default)]
    pub solver: SolverConfig,
    /// Idempotency cache.
    #[serde(default)]
    pub idempotency: IdempotencyConfig,
    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ============================================
// Configuration Loading
// ============================================

/// Load configuration from a YAML file with environment variable interpolation.
///
/// # Arguments
///
/// * `path` - Optional path to the config file. Defaults to "config.yaml".
///
/// # Errors
///
/// Returns a `ConfigError` if the file cannot be read, parsed, or validated.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or("config.yaml");

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_string(),
        source: e,
    })?;

    load_config_from_string(&contents)
}

/// Load configuration from a YAML string (useful for testing).
///
/// # Errors
///
/// Returns a `ConfigError` if the YAML cannot be parsed or validated.
pub fn load_config_from_string(yaml: &str) -> Result<Config, ConfigError> {
    let interpolated = interpolate_env_vars(yaml);
    let config: Config = serde_yaml_bw::from_str(&interpolated)?;
    validate_config(&config)?;
    Ok(config)
}

/// Interpolate environment variables in a string.
///
/// Supports both `${VAR}` and `${VAR:-default}` syntax.
#[allow(clippy::expect_used)] // Regex is compile-time constant; expect() is safe here
fn interpolate_env_vars(input: &str) -> String {
    use std::sync::OnceLock;

    static ENV_VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

    let re = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("env var regex is valid")
    });

    re.replace_all(input, |cap: &regex::Captures<'_>| {
        let default_value = cap.get(2).map(|m| m.as_str());
        match std::env::var(&cap[1]) {
            Ok(v) if !v.is_empty() => v,
            _ => default_value.map_or_else(String::new, str::to_string),
        }
    })
    .into_owned()
}

/// Validate configuration values.
fn validate_config(config: &Config) -> Result<(), ConfigError> {
    config
        .options
        .validate()
        .map_err(|e| ConfigError::ValidationError(format!("options: {e}")))?;

    let tolerance = &config.policy.reconciliation;
    if tolerance.absolute < Decimal::ZERO || tolerance.relative < Decimal::ZERO {
        return Err(ConfigError::ValidationError(
            "policy.reconciliation tolerances must be non-negative".to_string(),
        ));
    }
    if config.policy.single_position_tolerance < Decimal::ZERO {
        return Err(ConfigError::ValidationError(
            "policy.single_position_tolerance must be non-negative".to_string(),
        ));
    }

    if config.solver.max_iterations == 0 {
        return Err(ConfigError::ValidationError(
            "solver.max_iterations must be positive".to_string(),
        ));
    }
    if config.solver.strict_tolerance <= Decimal::ZERO
        || config.solver.compat_tolerance <= Decimal::ZERO
    {
        return Err(ConfigError::ValidationError(
            "solver tolerances must be positive".to_string(),
        ));
    }

    if config.idempotency.capacity == 0 {
        return Err(ConfigError::ValidationError(
            "idempotency.capacity must be positive".to_string(),
        ));
    }

    let valid_formats = ["json", "pretty"];
    if !valid_formats.contains(&config.observability.logging.format.as_str()) {
        return Err(ConfigError::ValidationError(format!(
            "observability.logging.format must be one of: {valid_formats:?}"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rebalance::SolverBackend;
    use crate::domain::rebalance::value_objects::FundingTieBreak;
    use rust_decimal_macros::dec;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = match load_config_from_string("{}") {
            Ok(c) => c,
            Err(e) => panic!("should load empty config: {e}"),
        };
        assert_eq!(config, Config::default());
        assert_eq!(config.policy.reconciliation.absolute, dec!(0.5));
        assert_eq!(config.policy.reconciliation.relative, dec!(0.0005));
        assert_eq!(config.idempotency.capacity, 1024);
        assert!(config.policy.require_client_consent);
        assert_eq!(config.observability.logging.format, "json");
    }

    #[test]
    fn test_env_var_with_default_when_missing() {
        let input = "level: ${REBALANCE_CONFIG_TEST_NONEXISTENT_VAR:-debug}";
        assert_eq!(interpolate_env_vars(input), "level: debug");
    }

    #[test]
    fn test_env_var_without_default_becomes_empty() {
        let input = "level: ${REBALANCE_CONFIG_TEST_UNLIKELY_TO_EXIST}";
        assert_eq!(interpolate_env_vars(input), "level: ");
    }

    #[test]
    fn test_full_config_parse() {
        let yaml = r#"
options:
  cash_band_min_weight: "0.02"
  cash_band_max_weight: "0.10"
  single_position_max_weight: "0.25"
  group_constraints:
    "sector:TECH":
      max_weight: "0.30"
policy:
  reconciliation:
    absolute: "1.0"
  funding_tie_break: LEXICAL
  require_client_consent: false
solver:
  backends: [DUAL_ASCENT, UNAVAILABLE]
  max_iterations: 200
idempotency:
  capacity: 16
observability:
  logging:
    level: "${REBALANCE_CONFIG_TEST_LEVEL:-warn}"
    format: pretty
"#;
        let config = match load_config_from_string(yaml) {
            Ok(c) => c,
            Err(e) => panic!("should load full config: {e}"),
        };
        assert_eq!(config.options.cash_band_max_weight, dec!(0.10));
        assert_eq!(config.options.single_position_max_weight, Some(dec!(0.25)));
        assert_eq!(config.options.group_constraints["sector:TECH"].max_weight, dec!(0.30));
        assert_eq!(config.policy.reconciliation.absolute, dec!(1.0));
        assert_eq!(config.policy.reconciliation.relative, dec!(0.0005));
        assert_eq!(config.policy.funding_tie_break, FundingTieBreak::Lexical);
        assert_eq!(
            config.solver.backends,
            vec![SolverBackend::DualAscent, SolverBackend::Unavailable]
        );
        assert_eq!(config.solver.to_settings().max_iterations, 200);
        assert_eq!(config.idempotency.capacity, 16);
        assert_eq!(config.observability.logging.level, "warn");
        assert!(!config.policy.to_policy().require_client_consent);
    }

    #[test]
    fn test_validation_rejects_bad_group_key() {
        let yaml = r#"
options:
  group_constraints:
    "sector":
      max_weight: "0.30"
"#;
        let Err(err) = load_config_from_string(yaml) else {
            panic!("expected error for malformed group key");
        };
        assert!(err.to_string().contains("group_constraints"));
    }

    #[test]
    fn test_validation_rejects_zero_capacity() {
        let Err(err) = load_config_from_string("idempotency:\n  capacity: 0\n") else {
            panic!("expected error for zero capacity");
        };
        assert!(err.to_string().contains("capacity"));
    }

    #[test]
    fn test_validation_rejects_unknown_format() {
        let yaml = "observability:\n  logging:\n    format: xml\n";
        let Err(err) = load_config_from_string(yaml) else {
            panic!("expected error for unknown format");
        };
        assert!(err.to_string().contains("format"));
    }
}
