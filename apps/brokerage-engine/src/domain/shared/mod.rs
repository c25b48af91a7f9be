//! Shared kernel: value objects and errors used by every bounded context.

mod errors;
mod value_objects;

pub use errors::DomainError;
pub use value_objects::{
    LedgerEntryId, Money, OrderId, PRICE_SCALE, Quantity, SymbolId, Timestamp, TradeId, UserId,
};
