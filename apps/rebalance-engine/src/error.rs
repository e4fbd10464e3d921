//! Boundary errors for the rebalance engine.
//!
//! Domain outcomes (blocked runs, rule failures, solver failures) are data on
//! the result. The errors here reject a request before the engine runs.
//!
//! | Code | Usage |
//! |------|-------|
//! | `INVALID_OPTIONS` | Option combination out of range or malformed |
//! | `INVALID_REQUEST` | Malformed portfolio, market data or proposal |
//! | `IDEMPOTENCY_CONFLICT` | Idempotency key reused with a different request |
//! | `CONFIG_ERROR` | Configuration could not be loaded |

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::shared::DomainError;

/// Error codes for the rebalance engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Option combination rejected by validation.
    InvalidOptions,
    /// Request payload rejected by validation.
    InvalidRequest,
    /// Idempotency key reused with a different request hash.
    IdempotencyConflict,
    /// Configuration could not be loaded.
    ConfigError,
}

impl ErrorCode {
    /// Get the error reason string.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::InvalidOptions => "INVALID_OPTIONS",
            Self::InvalidRequest => "INVALID_REQUEST",
            Self::IdempotencyConflict => "IDEMPOTENCY_CONFLICT",
            Self::ConfigError => "CONFIG_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.reason())
    }
}

/// A boundary error with field-level details.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("[{}] {message}", .code.reason())]
pub struct EngineError {
    code: ErrorCode,
    message: String,
    details: BTreeMap<String, String>,
}

impl EngineError {
    /// Create a new error.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: BTreeMap::new(),
        }
    }

    /// Add a detail entry.
    #[must_use]
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// Get the error code.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        self.code
    }

    /// Get the message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the details.
    #[must_use]
    pub const fn details(&self) -> &BTreeMap<String, String> {
        &self.details
    }

    /// Serializable response body.
    #[must_use]
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.code.reason().to_string(),
            message: self.message.clone(),
            details: self.details.clone(),
        }
    }
}

/// Error response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code string.
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Field-level details.
    pub details: BTreeMap<String, String>,
}

/// Convenience constructors for common errors.
impl EngineError {
    /// Invalid options, naming the offending field.
    #[must_use]
    pub fn invalid_options(error: &DomainError) -> Self {
        let mut e = Self::new(ErrorCode::InvalidOptions, error.to_string());
        if let Some(field) = error.field() {
            e = e.with_detail("field", field);
        }
        e
    }

    /// Invalid request, naming the offending field.
    #[must_use]
    pub fn invalid_request(field: &str, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message).with_detail("field", field)
    }

    /// Idempotency key reused with a different payload.
    #[must_use]
    pub fn idempotency_conflict(key: &str) -> Self {
        Self::new(
            ErrorCode::IdempotencyConflict,
            format!("Idempotency key {key} was used with a different request"),
        )
        .with_detail("idempotency_key", key)
    }

    /// Configuration failure.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }
}
