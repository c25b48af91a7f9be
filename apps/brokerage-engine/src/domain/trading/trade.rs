//! Trade entity produced by execution.

use serde::{Deserialize, Serialize};

use crate::domain::orders::{FEE_RATE, Order, OrderSide};
use crate::domain::shared::{Money, OrderId, Quantity, SymbolId, Timestamp, TradeId, UserId};

/// An executed fill. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    id: TradeId,
    order_id: OrderId,
    user_id: UserId,
    symbol_id: SymbolId,
    side: OrderSide,
    quantity: Quantity,
    price: Money,
    trade_value: Money,
    fees: Money,
    executed_at: Timestamp,
}

impl Trade {
    /// Record a full fill of `order` at `price`.
    ///
    /// The trade carries the actual notional and commission, which may differ
    /// from the estimates reserved at intake.
    #[must_use]
    pub fn from_fill(order: &Order, price: Money, executed_at: Timestamp) -> Self {
        let trade_value = (price * order.quantity().as_decimal()).round();
        let fees = (trade_value * FEE_RATE).round();

        Self {
            id: TradeId::generate(),
            order_id: order.id().clone(),
            user_id: order.user_id().clone(),
            symbol_id: order.symbol_id().clone(),
            side: order.side(),
            quantity: order.quantity(),
            price,
            trade_value,
            fees,
            executed_at,
        }
    }

    /// Get the trade ID.
    #[must_use]
    pub const fn id(&self) -> &TradeId {
        &self.id
    }

    /// Get the originating order.
    #[must_use]
    pub const fn order_id(&self) -> &OrderId {
        &self.order_id
    }

    /// Get the owning user.
    #[must_use]
    pub const fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Get the traded symbol.
    #[must_use]
    pub const fn symbol_id(&self) -> &SymbolId {
        &self.symbol_id
    }

    /// Get the trade side.
    #[must_use]
    pub const fn side(&self) -> OrderSide {
        self.side
    }

    /// Get the filled quantity.
    #[must_use]
    pub const fn quantity(&self) -> Quantity {
        self.quantity
    }

    /// Get the execution price.
    #[must_use]
    pub const fn price(&self) -> Money {
        self.price
    }

    /// Get the notional value (price x quantity).
    #[must_use]
    pub const fn trade_value(&self) -> Money {
        self.trade_value
    }

    /// Get the commission.
    #[must_use]
    pub const fn fees(&self) -> Money {
        self.fees
    }

    /// Get the execution timestamp.
    #[must_use]
    pub const fn executed_at(&self) -> Timestamp {
        self.executed_at
    }

    /// Signed wallet impact of settling this trade.
    ///
    /// Buys cost value plus fees; sells credit value minus fees.
    #[must_use]
    pub fn wallet_delta(&self) -> Money {
        if self.side.is_buy() {
            -(self.trade_value + self.fees)
        } else {
            self.trade_value - self.fees
        }
    }
}
