//! ISO-4217 currency codes and their minor-unit precision.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Currencies quoted without minor units.
const ZERO_DECIMAL_CURRENCIES: [&str; 3] = ["JPY", "KRW", "VND"];

/// Currencies quoted with three minor units.
const THREE_DECIMAL_CURRENCIES: [&str; 3] = ["BHD", "KWD", "OMR"];

/// Upper-cased ISO-4217 currency code.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Create a currency code, normalising case and whitespace.
    #[must_use]
    pub fn new(code: impl AsRef<str>) -> Self {
        Self(code.as_ref().trim().to_ascii_uppercase())
    }

    /// Get the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of decimal places money in this currency is quantised to.
    #[must_use]
    pub fn minor_units(&self) -> u32 {
        let code = self.0.as_str();
        if ZERO_DECIMAL_CURRENCIES.contains(&code) {
            0
        } else if THREE_DECIMAL_CURRENCIES.contains(&code) {
            3
        } else {
            2
        }
    }

    /// Quantise an amount to this currency's minor units.
    #[must_use]
    pub fn quantize(&self, amount: Decimal) -> Decimal {
        let mut rounded = amount.round_dp(self.minor_units());
        rounded.rescale(self.minor_units());
        rounded
    }

    /// Returns true if the code is empty after normalisation.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for CurrencyCode {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for CurrencyCode {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<CurrencyCode> for String {
    fn from(value: CurrencyCode) -> Self {
        value.0
    }
}
