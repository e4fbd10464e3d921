//! Configuration Loading Tests
//!
//! Loads YAML files from disk and checks defaults, interpolation and
//! validation errors.

#![allow(clippy::unwrap_used)]

use std::io::Write;

use rust_decimal_macros::dec;
use tempfile::NamedTempFile;

use rebalance_engine::config::{ConfigError, load_config};
use rebalance_engine::domain::rebalance::SolverBackend;

fn write_config(yaml: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn loads_config_file_with_overrides() {
    let file = write_config(
        r#"
options:
  min_trade_notional: "25"
  block_on_missing_fx: false
policy:
  reconciliation:
    relative: "0.001"
solver:
  backends: [DUAL_ASCENT]
  time_budget_ms: 0
idempotency:
  capacity: 64
observability:
  logging:
    level: "${REBALANCE_TEST_CONFIG_FILE_LEVEL:-debug}"
"#,
    );
    let config = load_config(Some(file.path().to_str().unwrap())).unwrap();

    assert_eq!(config.options.min_trade_notional, Some(dec!(25)));
    assert!(!config.options.block_on_missing_fx);
    assert_eq!(config.policy.reconciliation.relative, dec!(0.001));
    assert_eq!(config.policy.reconciliation.absolute, dec!(0.5));
    assert_eq!(config.solver.backends, vec![SolverBackend::DualAscent]);
    assert!(config.solver.to_settings().time_budget.is_none());
    assert_eq!(config.idempotency.capacity, 64);
    assert_eq!(config.observability.logging.level, "debug");
    assert_eq!(config.observability.logging.format, "json");
}

#[test]
fn missing_file_is_a_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.yaml");
    let Err(err) = load_config(Some(path.to_str().unwrap())) else {
        panic!("expected read error");
    };
    assert!(matches!(err, ConfigError::ReadError { .. }));
}

#[test]
fn malformed_yaml_is_a_parse_error() {
    let file = write_config("solver: [unclosed\n");
    let Err(err) = load_config(Some(file.path().to_str().unwrap())) else {
        panic!("expected parse error");
    };
    assert!(matches!(err, ConfigError::ParseError(_)));
}

#[test]
fn negative_tolerance_is_a_validation_error() {
    let file = write_config("policy:\n  reconciliation:\n    absolute: \"-1\"\n");
    let Err(err) = load_config(Some(file.path().to_str().unwrap())) else {
        panic!("expected validation error");
    };
    assert!(matches!(err, ConfigError::ValidationError(_)));
}
