//! Events published between pipeline stages.
//!
//! Every event travels in a [`BusEvent`] envelope that knows its topic and
//! its partition key. Consumers in one group see events with the same key in
//! publish order.

use serde::{Deserialize, Serialize};

use crate::domain::orders::{Order, OrderSide};
use crate::domain::shared::{Money, OrderId, SymbolId, Timestamp, TradeId, UserId};
use crate::domain::trading::Trade;

/// Logical event streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Topic {
    /// Orders accepted by intake, consumed by execution.
    OrderEvents,
    /// Fills produced by execution, consumed by settlement.
    TradeEvents,
    /// Settled portfolio changes, consumed by fan-out.
    PortfolioUpdates,
    /// Simulated price ticks, consumed by execution re-checks and fan-out.
    MarketData,
}

impl Topic {
    /// Stream name as used on the wire and in logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::OrderEvents => "order-events",
            Self::TradeEvents => "trade-events",
            Self::PortfolioUpdates => "portfolio-updates",
            Self::MarketData => "market-data",
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// An order was accepted and its reservation taken.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPlaced {
    /// The accepted order.
    pub order: Order,
    /// When intake accepted it.
    pub occurred_at: Timestamp,
}

/// An order left the PENDING state without filling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderClosed {
    /// The closed order (CANCELLED, REJECTED or expired).
    pub order: Order,
    /// Why it closed.
    pub reason: String,
    /// When it closed.
    pub occurred_at: Timestamp,
}

/// Execution filled an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeExecuted {
    /// The fill.
    pub trade: Trade,
    /// Funds locked for the order at intake, for settlement to release.
    pub reserved_funds: Money,
    /// When execution filled it.
    pub occurred_at: Timestamp,
}

/// Settlement booked a trade into a user's portfolio.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioUpdated {
    /// Affected user.
    pub user_id: UserId,
    /// Originating order.
    pub order_id: OrderId,
    /// Settled trade.
    pub trade_id: TradeId,
    /// Traded symbol.
    pub symbol_id: SymbolId,
    /// Trade side.
    pub side: OrderSide,
    /// Signed share change to the position.
    pub quantity_delta: i64,
    /// Signed cash change to the wallet, fees included.
    pub balance_delta: Money,
    /// When settlement booked it.
    pub occurred_at: Timestamp,
}

/// A simulated market price tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketTick {
    /// Ticking symbol.
    pub symbol_id: SymbolId,
    /// New market price.
    pub price: Money,
    /// Tick time.
    pub occurred_at: Timestamp,
}

/// Envelope for everything that crosses the bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BusEvent {
    /// See [`OrderPlaced`].
    OrderPlaced(OrderPlaced),
    /// See [`OrderClosed`].
    OrderClosed(OrderClosed),
    /// See [`TradeExecuted`].
    TradeExecuted(TradeExecuted),
    /// See [`PortfolioUpdated`].
    PortfolioUpdated(PortfolioUpdated),
    /// See [`MarketTick`].
    MarketTick(MarketTick),
}

impl BusEvent {
    /// The topic this event belongs to.
    #[must_use]
    pub const fn topic(&self) -> Topic {
        match self {
            Self::OrderPlaced(_) | Self::OrderClosed(_) => Topic::OrderEvents,
            Self::TradeExecuted(_) => Topic::TradeEvents,
            Self::PortfolioUpdated(_) => Topic::PortfolioUpdates,
            Self::MarketTick(_) => Topic::MarketData,
        }
    }

    /// Partition key: events sharing a key are delivered in publish order.
    ///
    /// Order and trade events key on order id, portfolio updates on user id
    /// and ticks on symbol id.
    #[must_use]
    pub fn key(&self) -> String {
        match self {
            Self::OrderPlaced(e) => e.order.id().to_string(),
            Self::OrderClosed(e) => e.order.id().to_string(),
            Self::TradeExecuted(e) => e.trade.order_id().to_string(),
            Self::PortfolioUpdated(e) => e.user_id.to_string(),
            Self::MarketTick(e) => e.symbol_id.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::orders::{OrderType, PlaceOrderCommand};
    use crate::domain::shared::Quantity;
    use rust_decimal_macros::dec;

    fn order() -> Order {
        let cmd = PlaceOrderCommand {
            user_id: UserId::new("user-1"),
            symbol_id: SymbolId::new("sym-aapl"),
            side: OrderSide::Buy,
            order_type: OrderType::Market,
            quantity: Quantity::new(10),
            limit_price: None,
            stop_price: None,
        };
        Order::place(
            cmd,
            Money::new(dec!(525.00)),
            Money::new(dec!(0.53)),
            Timestamp::now(),
        )
        .unwrap()
    }

    #[test]
    fn topic_routing() {
        let order = order();
        let placed = BusEvent::OrderPlaced(OrderPlaced {
            order: order.clone(),
            occurred_at: Timestamp::now(),
        });
        assert_eq!(placed.topic(), Topic::OrderEvents);
        assert_eq!(placed.key(), order.id().to_string());

        let trade = Trade::from_fill(&order, Money::new(dec!(50.00)), Timestamp::now());
        let executed = BusEvent::TradeExecuted(TradeExecuted {
            trade: trade.clone(),
            reserved_funds: Money::new(dec!(525.53)),
            occurred_at: Timestamp::now(),
        });
        assert_eq!(executed.topic(), Topic::TradeEvents);
        assert_eq!(executed.key(), order.id().to_string());

        let tick = BusEvent::MarketTick(MarketTick {
            symbol_id: SymbolId::new("sym-aapl"),
            price: Money::new(dec!(51.00)),
            occurred_at: Timestamp::now(),
        });
        assert_eq!(tick.topic(), Topic::MarketData);
        assert_eq!(tick.key(), "sym-aapl");
    }

    #[test]
    fn topic_names_are_kebab_case() {
        assert_eq!(Topic::OrderEvents.name(), "order-events");
        assert_eq!(Topic::PortfolioUpdates.name(), "portfolio-updates");
        assert_eq!(
            serde_json::to_string(&Topic::TradeEvents).unwrap(),
            "\"trade-events\""
        );
    }

    #[test]
    fn envelope_serde_roundtrip() {
        let event = BusEvent::PortfolioUpdated(PortfolioUpdated {
            user_id: UserId::new("user-1"),
            order_id: OrderId::generate(),
            trade_id: TradeId::generate(),
            symbol_id: SymbolId::new("sym-aapl"),
            side: OrderSide::Sell,
            quantity_delta: -4,
            balance_delta: Money::new(dec!(239.76)),
            occurred_at: Timestamp::now(),
        });

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"PORTFOLIO_UPDATED\""));

        let parsed: BusEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.topic(), Topic::PortfolioUpdates);
        assert_eq!(parsed.key(), "user-1");
    }
}
