//! Domain errors for the rebalance engine.

use std::fmt;

/// Domain-level errors that can occur in business logic.
///
/// These errors are independent of infrastructure concerns. They describe
/// contract violations on domain values; rebalance outcomes themselves are
/// expressed as data, never as errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid value for a field.
    InvalidValue {
        /// Field name.
        field: String,
        /// Error message.
        message: String,
    },

    /// Arithmetic across two different currencies.
    CurrencyMismatch {
        /// Currency of the left operand.
        expected: String,
        /// Currency of the right operand.
        found: String,
    },
}

impl DomainError {
    /// Shorthand for an `InvalidValue` error.
    #[must_use]
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Field the error refers to, if any.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::InvalidValue { field, .. } => Some(field),
            Self::CurrencyMismatch { .. } => None,
        }
    }
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidValue { field, message } => {
                write!(f, "Invalid value for '{field}': {message}")
            }
            Self::CurrencyMismatch { expected, found } => {
                write!(f, "Currency mismatch: expected {expected}, found {found}")
            }
        }
    }
}

impl std::error::Error for DomainError {}
