//! Append-only transaction ledger.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::shared::{LedgerEntryId, Money, Timestamp, TradeId, UserId};

/// What kind of balance-affecting event a ledger entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerEntryType {
    /// Cash deposited into the wallet.
    Deposit,
    /// Cash withdrawn from the wallet.
    Withdrawal,
    /// Standalone fee charge.
    Fee,
    /// Cash settlement leg of a buy.
    BuySettlement,
    /// Cash settlement leg of a sell.
    SellSettlement,
    /// Shares acquired through a buy trade.
    StockPurchase,
    /// Shares disposed of through a sell trade.
    StockSale,
}

impl fmt::Display for LedgerEntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deposit => write!(f, "DEPOSIT"),
            Self::Withdrawal => write!(f, "WITHDRAWAL"),
            Self::Fee => write!(f, "FEE"),
            Self::BuySettlement => write!(f, "BUY_SETTLEMENT"),
            Self::SellSettlement => write!(f, "SELL_SETTLEMENT"),
            Self::StockPurchase => write!(f, "STOCK_PURCHASE"),
            Self::StockSale => write!(f, "STOCK_SALE"),
        }
    }
}

/// Processing status of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerEntryStatus {
    /// The movement was applied.
    Completed,
    /// The movement was attempted and refused.
    Failed,
}

/// An immutable record of one balance-affecting event.
///
/// Entries are append-only; nothing mutates one after creation. Settlement
/// writes exactly one entry per trade, keyed by the trade id in
/// `reference_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    id: LedgerEntryId,
    user_id: UserId,
    entry_type: LedgerEntryType,
    amount: Money,
    fees: Money,
    status: LedgerEntryStatus,
    payment_method: Option<String>,
    description: String,
    reference_id: Option<String>,
    created_at: Timestamp,
}

impl LedgerEntry {
    /// Record the settlement leg of a trade.
    #[must_use]
    pub fn for_trade(
        user_id: UserId,
        trade_id: &TradeId,
        entry_type: LedgerEntryType,
        amount: Money,
        fees: Money,
        description: impl Into<String>,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id: LedgerEntryId::generate(),
            user_id,
            entry_type,
            amount,
            fees,
            status: LedgerEntryStatus::Completed,
            payment_method: None,
            description: description.into(),
            reference_id: Some(trade_id.to_string()),
            created_at,
        }
    }

    /// Record a deposit or withdrawal processed by the payment gateway.
    #[must_use]
    pub fn for_cash_movement(
        user_id: UserId,
        entry_type: LedgerEntryType,
        amount: Money,
        payment_method: Option<String>,
        reference_id: impl Into<String>,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id: LedgerEntryId::generate(),
            user_id,
            entry_type,
            amount,
            fees: Money::ZERO,
            status: LedgerEntryStatus::Completed,
            payment_method,
            description: entry_type.to_string(),
            reference_id: Some(reference_id.into()),
            created_at,
        }
    }

    /// Get the entry ID.
    #[must_use]
    pub const fn id(&self) -> &LedgerEntryId {
        &self.id
    }

    /// Get the owning user.
    #[must_use]
    pub const fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Get the entry type.
    #[must_use]
    pub const fn entry_type(&self) -> LedgerEntryType {
        self.entry_type
    }

    /// Get the moved amount (always positive).
    #[must_use]
    pub const fn amount(&self) -> Money {
        self.amount
    }

    /// Get the fees charged alongside the movement.
    #[must_use]
    pub const fn fees(&self) -> Money {
        self.fees
    }

    /// Get the processing status.
    #[must_use]
    pub const fn status(&self) -> LedgerEntryStatus {
        self.status
    }

    /// Get the payment method, for gateway-driven movements.
    #[must_use]
    pub fn payment_method(&self) -> Option<&str> {
        self.payment_method.as_deref()
    }

    /// Get the human-readable description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Get the trade id or payment reference behind the movement.
    #[must_use]
    pub fn reference_id(&self) -> Option<&str> {
        self.reference_id.as_deref()
    }

    /// Get the record timestamp.
    #[must_use]
    pub const fn created_at(&self) -> Timestamp {
        self.created_at
    }
}
