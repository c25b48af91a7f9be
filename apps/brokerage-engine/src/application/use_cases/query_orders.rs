//! Read-side queries over orders, trades and the cash ledger.

use std::sync::Arc;

use crate::application::dto::{LedgerEntryView, OrderView, TradeView};
use crate::domain::orders::{OrderRepository, OrderStatus};
use crate::domain::shared::{OrderId, UserId};
use crate::domain::trading::{LedgerRepository, TradeRepository};
use crate::error::BrokerageError;

/// Serves a user's order, trade and ledger history.
pub struct QueryOrdersUseCase<O, T, L> {
    orders: Arc<O>,
    trades: Arc<T>,
    ledger: Arc<L>,
}

impl<O, T, L> QueryOrdersUseCase<O, T, L>
where
    O: OrderRepository,
    T: TradeRepository,
    L: LedgerRepository,
{
    /// Wire the use case to its stores.
    pub const fn new(orders: Arc<O>, trades: Arc<T>, ledger: Arc<L>) -> Self {
        Self {
            orders,
            trades,
            ledger,
        }
    }

    /// A user's orders, newest first, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns error on store failure.
    pub async fn list_orders(
        &self,
        user_id: &UserId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<OrderView>, BrokerageError> {
        let orders = self.orders.find_by_user(user_id, status).await?;
        Ok(orders.iter().map(OrderView::from).collect())
    }

    /// One order, scoped to its owner.
    ///
    /// # Errors
    ///
    /// Returns error if the order is unknown or owned by someone else.
    pub async fn get_order(
        &self,
        user_id: &UserId,
        order_id: &OrderId,
    ) -> Result<OrderView, BrokerageError> {
        self.orders
            .find_by_id(order_id)
            .await?
            .filter(|o| o.user_id() == user_id)
            .map(|o| OrderView::from(&o))
            .ok_or_else(|| BrokerageError::NotFound(format!("order {order_id}")))
    }

    /// A user's trades, newest first.
    ///
    /// # Errors
    ///
    /// Returns error on store failure.
    pub async fn list_trades(&self, user_id: &UserId) -> Result<Vec<TradeView>, BrokerageError> {
        let trades = self.trades.find_by_user(user_id).await?;
        Ok(trades.iter().map(TradeView::from).collect())
    }

    /// A user's cash ledger, newest first.
    ///
    /// # Errors
    ///
    /// Returns error on store failure.
    pub async fn list_ledger(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<LedgerEntryView>, BrokerageError> {
        let entries = self.ledger.find_by_user(user_id).await?;
        Ok(entries.iter().map(LedgerEntryView::from).collect())
    }
}
