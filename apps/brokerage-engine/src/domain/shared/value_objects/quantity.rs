//! Quantity value object for share counts.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

use crate::domain::shared::DomainError;

/// A whole-share quantity.
///
/// Orders and holdings in this system trade whole shares only, so the
/// representation is an unsigned integer rather than a decimal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Quantity(u64);

impl Quantity {
    /// Create a new Quantity.
    #[must_use]
    pub const fn new(shares: u64) -> Self {
        Self(shares)
    }

    /// Zero quantity.
    pub const ZERO: Self = Self(0);

    /// Get the inner share count.
    #[must_use]
    pub const fn shares(&self) -> u64 {
        self.0
    }

    /// Get the share count as a Decimal for price math.
    #[must_use]
    pub fn as_decimal(&self) -> Decimal {
        Decimal::from(self.0)
    }

    /// Get the share count as a signed integer, negated for sells.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub const fn signed(&self, negate: bool) -> i64 {
        if negate { -(self.0 as i64) } else { self.0 as i64 }
    }

    /// Returns true if this quantity is zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Subtract without going below zero.
    #[must_use]
    pub const fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }

    /// Validate quantity for order submission.
    ///
    /// # Errors
    ///
    /// Returns error if the quantity is zero or exceeds the per-order cap.
    pub fn validate_for_order(&self) -> Result<(), DomainError> {
        if self.0 == 0 {
            return Err(DomainError::invalid(
                "quantity",
                "order quantity must be positive",
            ));
        }
        const MAX: u64 = 100_000;
        if self.0 > MAX {
            return Err(DomainError::invalid(
                "quantity",
                format!("order quantity exceeds maximum: {MAX}"),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Add for Quantity {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Quantity {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl From<u64> for Quantity {
    fn from(value: u64) -> Self {
        Self(value)
    }
}
