//! Persistence ports for wallets, holdings, trades and the ledger.
//!
//! Wallet and holding mutations are expressed as store operations rather
//! than load-modify-save so an implementation can apply each one under the
//! owner's lock.

use async_trait::async_trait;
use thiserror::Error;

use super::holding::{Holding, HoldingError};
use super::ledger::LedgerEntry;
use super::settlement::SettlementError;
use super::trade::Trade;
use super::wallet::{Wallet, WalletError};
use crate::domain::shared::{Money, Quantity, SymbolId, TradeId, UserId};

/// Errors from the trading store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A wallet-level rule rejected the operation.
    #[error(transparent)]
    Wallet(#[from] WalletError),

    /// A holding-level rule rejected the operation.
    #[error(transparent)]
    Holding(#[from] HoldingError),

    /// Settlement itself failed.
    #[error(transparent)]
    Settlement(#[from] SettlementError),

    /// The user has no holding in the symbol.
    #[error("no holding for user {user} in symbol {symbol}")]
    HoldingNotFound {
        /// Owning user.
        user: UserId,
        /// Requested symbol.
        symbol: SymbolId,
    },

    /// This trade has already been settled.
    #[error("trade already settled: {0}")]
    DuplicateTrade(TradeId),

    /// The store is unavailable.
    #[error("trading store unavailable: {0}")]
    Unavailable(String),
}

/// Cash account operations.
#[async_trait]
pub trait WalletRepository: Send + Sync {
    /// Load the user's wallet, creating an empty one on first touch.
    async fn get_or_create(&self, user_id: &UserId) -> Result<Wallet, StoreError>;

    /// Credit cash.
    async fn deposit(&self, user_id: &UserId, amount: Money) -> Result<Wallet, StoreError>;

    /// Debit unreserved cash.
    async fn withdraw(&self, user_id: &UserId, amount: Money) -> Result<Wallet, StoreError>;

    /// Reserve cash for an open buy order.
    async fn lock_funds(&self, user_id: &UserId, amount: Money) -> Result<Wallet, StoreError>;

    /// Release a cash reservation.
    async fn unlock_funds(&self, user_id: &UserId, amount: Money) -> Result<Wallet, StoreError>;
}

/// Position operations.
#[async_trait]
pub trait HoldingRepository: Send + Sync {
    /// Load one position.
    async fn find(
        &self,
        user_id: &UserId,
        symbol_id: &SymbolId,
    ) -> Result<Option<Holding>, StoreError>;

    /// List all of a user's positions.
    async fn find_by_user(&self, user_id: &UserId) -> Result<Vec<Holding>, StoreError>;

    /// Reserve shares for an open sell order.
    async fn reserve_shares(
        &self,
        user_id: &UserId,
        symbol_id: &SymbolId,
        shares: Quantity,
    ) -> Result<Holding, StoreError>;

    /// Release a share reservation.
    async fn release_shares(
        &self,
        user_id: &UserId,
        symbol_id: &SymbolId,
        shares: Quantity,
    ) -> Result<(), StoreError>;
}

/// Trade log access.
#[async_trait]
pub trait TradeRepository: Send + Sync {
    /// Load a trade by ID.
    async fn find_by_id(&self, id: &TradeId) -> Result<Option<Trade>, StoreError>;

    /// List a user's trades, newest first.
    async fn find_by_user(&self, user_id: &UserId) -> Result<Vec<Trade>, StoreError>;
}

/// Transaction ledger access.
#[async_trait]
pub trait LedgerRepository: Send + Sync {
    /// Append an entry. Settlement appends through [`SettlementStore`]; this
    /// covers deposits and withdrawals.
    async fn append(&self, entry: LedgerEntry) -> Result<(), StoreError>;

    /// List a user's ledger entries, newest first.
    async fn find_by_user(&self, user_id: &UserId) -> Result<Vec<LedgerEntry>, StoreError>;
}

/// Atomic trade settlement.
#[async_trait]
pub trait SettlementStore: Send + Sync {
    /// Settle a trade: move cash, adjust the holding, append the ledger
    /// entry and record the trade, all under the user's lock.
    ///
    /// Settling the same trade ID twice returns `StoreError::DuplicateTrade`
    /// without changing any state.
    async fn apply_settlement(
        &self,
        trade: &Trade,
        reserved_funds: Money,
    ) -> Result<LedgerEntry, StoreError>;
}
