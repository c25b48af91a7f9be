//! Order intake bounded context.

pub mod aggregate;
pub mod errors;
pub mod repository;
pub mod value_objects;

pub use aggregate::{FEE_RATE, ORDER_TTL_DAYS, Order, PlaceOrderCommand};
pub use errors::OrderError;
pub use repository::{OrderRepository, OrderRepositoryError};
pub use value_objects::{OrderSide, OrderStatus, OrderType};
