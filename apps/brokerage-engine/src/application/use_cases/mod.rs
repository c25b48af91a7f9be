//! Application use cases: one struct per user-facing operation.

pub mod cancel_order;
pub mod fund_wallet;
pub mod get_portfolio;
pub mod place_order;
pub mod query_orders;

pub use cancel_order::CancelOrderUseCase;
pub use fund_wallet::FundWalletUseCase;
pub use get_portfolio::GetPortfolioUseCase;
pub use place_order::{DEFAULT_MARKET_BUFFER, PlaceOrderUseCase};
pub use query_orders::QueryOrdersUseCase;
