//! Wallet entity: cash balance with a reservation ledger.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::shared::{Money, Timestamp, UserId};

/// Wallet domain errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WalletError {
    /// Not enough unreserved cash for the operation.
    #[error("insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        /// Amount the operation needed.
        required: Money,
        /// Unreserved balance at the time.
        available: Money,
    },

    /// Amount must be strictly positive.
    #[error("amount must be positive, got {0}")]
    NonPositiveAmount(Money),
}

/// Currency every wallet is denominated in. Multi-currency accounts are out
/// of scope; the field travels on the wallet so the wire shape carries it.
pub const WALLET_CURRENCY: &str = "USD";

/// A user's cash account.
///
/// `balance` is total cash; `locked_balance` the portion reserved for open
/// buy orders. Spendable cash is the difference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    user_id: UserId,
    currency: String,
    balance: Money,
    locked_balance: Money,
    updated_at: Timestamp,
}

impl Wallet {
    /// Open an empty wallet.
    #[must_use]
    pub fn open(user_id: UserId, now: Timestamp) -> Self {
        Self {
            user_id,
            currency: WALLET_CURRENCY.to_string(),
            balance: Money::ZERO,
            locked_balance: Money::ZERO,
            updated_at: now,
        }
    }

    /// Get the owning user.
    #[must_use]
    pub const fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Get the denomination currency.
    #[must_use]
    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Get the total balance.
    #[must_use]
    pub const fn balance(&self) -> Money {
        self.balance
    }

    /// Get the reserved balance.
    #[must_use]
    pub const fn locked_balance(&self) -> Money {
        self.locked_balance
    }

    /// Get the last modification time.
    #[must_use]
    pub const fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    /// Spendable cash: balance minus reservations.
    #[must_use]
    pub fn available(&self) -> Money {
        self.balance - self.locked_balance
    }

    fn require_positive(amount: Money) -> Result<(), WalletError> {
        if amount.is_positive() {
            Ok(())
        } else {
            Err(WalletError::NonPositiveAmount(amount))
        }
    }

    /// Credit cash.
    ///
    /// # Errors
    ///
    /// Returns error if `amount` is not positive.
    pub fn deposit(&mut self, amount: Money, now: Timestamp) -> Result<(), WalletError> {
        Self::require_positive(amount)?;
        self.balance += amount;
        self.updated_at = now;
        Ok(())
    }

    /// Debit unreserved cash.
    ///
    /// # Errors
    ///
    /// Returns error if `amount` is not positive or exceeds available funds.
    pub fn withdraw(&mut self, amount: Money, now: Timestamp) -> Result<(), WalletError> {
        Self::require_positive(amount)?;
        if amount > self.available() {
            return Err(WalletError::InsufficientFunds {
                required: amount,
                available: self.available(),
            });
        }
        self.balance -= amount;
        self.updated_at = now;
        Ok(())
    }

    /// Reserve cash for an open buy order.
    ///
    /// # Errors
    ///
    /// Returns error if `amount` is not positive or exceeds available funds.
    pub fn lock(&mut self, amount: Money, now: Timestamp) -> Result<(), WalletError> {
        Self::require_positive(amount)?;
        if amount > self.available() {
            return Err(WalletError::InsufficientFunds {
                required: amount,
                available: self.available(),
            });
        }
        self.locked_balance += amount;
        self.updated_at = now;
        Ok(())
    }

    /// Release a reservation. Clamped so locked balance never goes negative.
    pub fn unlock(&mut self, amount: Money, now: Timestamp) {
        self.locked_balance = (self.locked_balance - amount).max(Money::ZERO);
        self.updated_at = now;
    }

    /// Settle a buy: release the intake reservation, then debit the actual
    /// cost. The actual cost may differ from the reserved estimate, but may
    /// not exceed what is spendable once the reservation is back, or
    /// `locked_balance <= balance` would break for the remaining locks.
    ///
    /// # Errors
    ///
    /// Returns error if `cost` exceeds the post-release available funds.
    pub fn settle_buy(
        &mut self,
        reserved: Money,
        cost: Money,
        now: Timestamp,
    ) -> Result<(), WalletError> {
        self.unlock(reserved, now);
        if cost > self.available() {
            return Err(WalletError::InsufficientFunds {
                required: cost,
                available: self.available(),
            });
        }
        self.balance -= cost;
        self.updated_at = now;
        Ok(())
    }

    /// Settle a sell: credit proceeds net of fees.
    pub fn settle_sell(&mut self, proceeds: Money, now: Timestamp) {
        self.balance += proceeds;
        self.updated_at = now;
    }
}
