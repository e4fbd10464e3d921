//! Money value object for currency amounts.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::CurrencyCode;
use crate::domain::shared::DomainError;

/// Decimal places used for weights in allocation tables.
pub const WEIGHT_DP: u32 = 4;

/// Quantise a portfolio weight to [`WEIGHT_DP`] decimal places.
#[must_use]
pub fn quantize_weight(weight: Decimal) -> Decimal {
    let mut rounded = weight.round_dp(WEIGHT_DP);
    rounded.rescale(WEIGHT_DP);
    rounded
}

/// An exact decimal amount tagged with its currency.
///
/// Arithmetic between two amounts is only defined for the same currency and
/// goes through the checked helpers; scaling by a decimal factor is always
/// allowed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    /// Decimal amount.
    pub amount: Decimal,
    /// Currency of the amount.
    pub currency: CurrencyCode,
}

impl Money {
    /// Create a new Money value.
    #[must_use]
    pub const fn new(amount: Decimal, currency: CurrencyCode) -> Self {
        Self { amount, currency }
    }

    /// Zero in the given currency, at the currency's minor-unit scale.
    #[must_use]
    pub fn zero(currency: CurrencyCode) -> Self {
        let amount = currency.quantize(Decimal::ZERO);
        Self { amount, currency }
    }

    /// Create a quantised Money value.
    #[must_use]
    pub fn quantized(amount: Decimal, currency: CurrencyCode) -> Self {
        let amount = currency.quantize(amount);
        Self { amount, currency }
    }

    /// Round the amount to the currency's minor units.
    #[must_use]
    pub fn quantize(&self) -> Self {
        Self::quantized(self.amount, self.currency.clone())
    }

    /// Returns true if this amount is negative.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.amount < Decimal::ZERO
    }

    /// Returns true if this amount is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Get the absolute value.
    #[must_use]
    pub fn abs(&self) -> Self {
        Self::new(self.amount.abs(), self.currency.clone())
    }

    /// Add another amount in the same currency.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::CurrencyMismatch` if the currencies differ.
    pub fn checked_add(&self, other: &Self) -> Result<Self, DomainError> {
        self.ensure_same_currency(other)?;
        Ok(Self::new(self.amount + other.amount, self.currency.clone()))
    }

    /// Subtract another amount in the same currency.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::CurrencyMismatch` if the currencies differ.
    pub fn checked_sub(&self, other: &Self) -> Result<Self, DomainError> {
        self.ensure_same_currency(other)?;
        Ok(Self::new(self.amount - other.amount, self.currency.clone()))
    }

    /// Scale by a decimal factor, keeping the currency.
    #[must_use]
    pub fn scale(&self, factor: Decimal) -> Self {
        Self::new(self.amount * factor, self.currency.clone())
    }

    fn ensure_same_currency(&self, other: &Self) -> Result<(), DomainError> {
        if self.currency == other.currency {
            Ok(())
        } else {
            Err(DomainError::CurrencyMismatch {
                expected: self.currency.to_string(),
                found: other.currency.to_string(),
            })
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}
