//! Order cancellation: PENDING orders only, reservation returned.

use std::sync::Arc;

use tracing::info;

use crate::application::dto::OrderView;
use crate::application::ports::EventBusPort;
use crate::domain::events::{BusEvent, OrderClosed};
use crate::domain::orders::OrderRepository;
use crate::domain::shared::{OrderId, Timestamp, UserId};
use crate::domain::trading::{HoldingRepository, WalletRepository};
use crate::error::BrokerageError;

/// Cancels a user's PENDING order and releases its reservation.
pub struct CancelOrderUseCase<O, W, H, B> {
    orders: Arc<O>,
    wallets: Arc<W>,
    holdings: Arc<H>,
    bus: Arc<B>,
}

impl<O, W, H, B> CancelOrderUseCase<O, W, H, B>
where
    O: OrderRepository,
    W: WalletRepository,
    H: HoldingRepository,
    B: EventBusPort,
{
    /// Wire the use case to its ports.
    pub fn new(orders: Arc<O>, wallets: Arc<W>, holdings: Arc<H>, bus: Arc<B>) -> Self {
        Self {
            orders,
            wallets,
            holdings,
            bus,
        }
    }

    /// Cancel `order_id` on behalf of `user_id`.
    ///
    /// Orders belonging to other users are reported as not found rather
    /// than leaking their existence.
    ///
    /// # Errors
    ///
    /// Returns error if the order is unknown, owned by someone else, or no
    /// longer PENDING.
    pub async fn execute(
        &self,
        user_id: &UserId,
        order_id: &OrderId,
    ) -> Result<OrderView, BrokerageError> {
        let mut order = self
            .orders
            .find_by_id(order_id)
            .await?
            .filter(|o| o.user_id() == user_id)
            .ok_or_else(|| BrokerageError::NotFound(format!("order {order_id}")))?;

        order.cancel()?;
        self.orders.update(&order).await?;

        if order.side().is_buy() {
            self.wallets
                .unlock_funds(user_id, order.reserved_funds())
                .await?;
        } else {
            self.holdings
                .release_shares(user_id, order.symbol_id(), order.quantity())
                .await?;
        }

        self.bus
            .publish(BusEvent::OrderClosed(OrderClosed {
                order: order.clone(),
                reason: "cancelled by user".into(),
                occurred_at: Timestamp::now(),
            }))
            .await?;

        info!(order_id = %order_id, user_id = %user_id, "order cancelled");
        Ok(OrderView::from(&order))
    }
}
