//! Shared value objects used across bounded contexts.

mod identifiers;
mod money;
mod quantity;
mod timestamp;

pub use identifiers::{LedgerEntryId, OrderId, SymbolId, TradeId, UserId};
pub use money::{Money, PRICE_SCALE};
pub use quantity::Quantity;
pub use timestamp::Timestamp;
