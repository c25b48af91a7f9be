//! Long-running pipeline stages driven by bus subscriptions.

pub mod execution;
pub mod fanout;
pub mod settlement;

pub use execution::{EXECUTION_GROUP, ExecutionDecision, ExecutionService, decide};
pub use fanout::{FANOUT_GROUP, FanoutService};
pub use settlement::{SETTLEMENT_GROUP, SettlementService};
