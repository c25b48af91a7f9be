//! Trading bounded context: trades, cash, positions and settlement.

pub mod holding;
pub mod ledger;
pub mod repository;
pub mod settlement;
pub mod trade;
pub mod wallet;

pub use holding::{Holding, HoldingError};
pub use ledger::{LedgerEntry, LedgerEntryStatus, LedgerEntryType};
pub use repository::{
    HoldingRepository, LedgerRepository, SettlementStore, StoreError, TradeRepository,
    WalletRepository,
};
pub use settlement::{
    HoldingChange, SettlementError, SettlementInput, SettlementOutcome, settle_trade,
};
pub use trade::Trade;
pub use wallet::{Wallet, WalletError};
