//! Order persistence port.

use async_trait::async_trait;
use thiserror::Error;

use super::aggregate::Order;
use super::value_objects::OrderStatus;
use crate::domain::shared::{OrderId, SymbolId, UserId};

/// Errors from order persistence.
#[derive(Debug, Error)]
pub enum OrderRepositoryError {
    /// No order with the given ID.
    #[error("order not found: {0}")]
    NotFound(OrderId),

    /// An order with this ID already exists.
    #[error("order already exists: {0}")]
    Duplicate(OrderId),

    /// The stored order reached a terminal status after this copy was read.
    #[error("order {id} is already {current}; update refused")]
    Superseded {
        /// The order whose update was refused.
        id: OrderId,
        /// The terminal status currently persisted.
        current: OrderStatus,
    },

    /// The store is unavailable.
    #[error("order store unavailable: {0}")]
    Unavailable(String),
}

/// Persistence port for the order aggregate.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Insert a new order.
    async fn save(&self, order: &Order) -> Result<(), OrderRepositoryError>;

    /// Persist a state change to an existing order.
    ///
    /// Order status is the single source of truth for races between
    /// cancellation and execution: an update against an order that is
    /// already terminal must be refused with
    /// [`OrderRepositoryError::Superseded`], never applied.
    async fn update(&self, order: &Order) -> Result<(), OrderRepositoryError>;

    /// Load an order by ID.
    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, OrderRepositoryError>;

    /// List a user's orders, newest first, optionally filtered by status.
    async fn find_by_user(
        &self,
        user_id: &UserId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, OrderRepositoryError>;

    /// List PENDING orders on a symbol, oldest first.
    async fn find_pending_for_symbol(
        &self,
        symbol_id: &SymbolId,
    ) -> Result<Vec<Order>, OrderRepositoryError>;
}
