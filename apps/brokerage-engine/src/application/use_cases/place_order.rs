//! Order intake: validate, reserve, persist, publish.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::application::dto::{OrderView, PlaceOrderRequest};
use crate::application::ports::{EventBusPort, PriceSourcePort, ReferenceDataPort};
use crate::domain::events::{BusEvent, OrderPlaced};
use crate::domain::orders::{
    FEE_RATE, Order, OrderRepository, OrderType, PlaceOrderCommand,
};
use crate::domain::shared::{Money, SymbolId, Timestamp, UserId};
use crate::domain::trading::{HoldingRepository, WalletRepository};
use crate::error::BrokerageError;

/// Safety margin applied to market-order estimates so the reservation covers
/// a price that moves before execution.
pub const DEFAULT_MARKET_BUFFER: Decimal = Decimal::from_parts(105, 0, 0, false, 2); // 1.05

/// Places orders: validates the request, takes the fund or share
/// reservation, persists the PENDING order and announces it on the bus.
pub struct PlaceOrderUseCase<O, W, H, P, R, B> {
    orders: Arc<O>,
    wallets: Arc<W>,
    holdings: Arc<H>,
    prices: Arc<P>,
    reference: Arc<R>,
    bus: Arc<B>,
    market_buffer: Decimal,
}

impl<O, W, H, P, R, B> PlaceOrderUseCase<O, W, H, P, R, B>
where
    O: OrderRepository,
    W: WalletRepository,
    H: HoldingRepository,
    P: PriceSourcePort,
    R: ReferenceDataPort,
    B: EventBusPort,
{
    /// Wire the use case to its ports.
    pub fn new(
        orders: Arc<O>,
        wallets: Arc<W>,
        holdings: Arc<H>,
        prices: Arc<P>,
        reference: Arc<R>,
        bus: Arc<B>,
        market_buffer: Decimal,
    ) -> Self {
        Self {
            orders,
            wallets,
            holdings,
            prices,
            reference,
            bus,
            market_buffer,
        }
    }

    /// Place an order for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns error on validation failure, unknown symbol, missing market
    /// price for a MARKET order, or insufficient funds/holdings.
    pub async fn execute(
        &self,
        user_id: &UserId,
        request: PlaceOrderRequest,
    ) -> Result<OrderView, BrokerageError> {
        if !self.reference.is_user_active(user_id).await? {
            return Err(BrokerageError::Validation(format!(
                "user {user_id} is not active"
            )));
        }
        let symbol_id = SymbolId::new(request.symbol_id.clone());
        if self.reference.find_symbol(&symbol_id).await?.is_none() {
            return Err(BrokerageError::NotFound(format!("symbol {symbol_id}")));
        }

        let cmd = PlaceOrderCommand {
            user_id: user_id.clone(),
            symbol_id: symbol_id.clone(),
            side: request.side,
            order_type: request.order_type,
            quantity: request.shares(),
            limit_price: request.limit_price.map(Money::new),
            stop_price: request.stop_price.map(Money::new),
        };
        cmd.validate()?;

        let estimate = self.estimated_price(&cmd).await?;
        let order_value = (estimate * cmd.quantity.as_decimal()).round();
        let fees = (order_value * FEE_RATE).round();
        order_value.validate_for_order().map_err(|e| {
            BrokerageError::Validation(e.to_string())
        })?;

        let now = Timestamp::now();
        let order = Order::place(cmd, order_value, fees, now)?;

        // Reservation first: an order is only persisted once its funds or
        // shares are committed.
        if order.side().is_buy() {
            self.wallets
                .lock_funds(user_id, order.reserved_funds())
                .await?;
        } else {
            self.holdings
                .reserve_shares(user_id, &symbol_id, order.quantity())
                .await?;
        }

        if let Err(err) = self.persist_and_publish(&order, now).await {
            self.release_reservation(&order).await;
            return Err(err);
        }

        info!(
            order_id = %order.id(),
            user_id = %user_id,
            symbol = %symbol_id,
            side = %order.side(),
            "order accepted"
        );
        Ok(OrderView::from(&order))
    }

    async fn persist_and_publish(
        &self,
        order: &Order,
        now: Timestamp,
    ) -> Result<(), BrokerageError> {
        self.orders.save(order).await?;
        self.bus
            .publish(BusEvent::OrderPlaced(OrderPlaced {
                order: order.clone(),
                occurred_at: now,
            }))
            .await?;
        Ok(())
    }

    async fn release_reservation(&self, order: &Order) {
        let result = if order.side().is_buy() {
            self.wallets
                .unlock_funds(order.user_id(), order.reserved_funds())
                .await
                .map(|_| ())
        } else {
            self.holdings
                .release_shares(order.user_id(), order.symbol_id(), order.quantity())
                .await
        };
        if let Err(err) = result {
            warn!(order_id = %order.id(), error = %err, "failed to release reservation");
        }
    }

    /// Per-share price used for the reservation estimate.
    ///
    /// MARKET orders estimate at the live price padded by the market buffer
    /// and are rejected outright when no price is quoted. Priced orders
    /// reserve at their own limit or stop price.
    async fn estimated_price(&self, cmd: &PlaceOrderCommand) -> Result<Money, BrokerageError> {
        match cmd.order_type {
            OrderType::Market => {
                let price = self
                    .prices
                    .current_price(&cmd.symbol_id)
                    .await?
                    .ok_or_else(|| BrokerageError::PriceUnavailable(cmd.symbol_id.clone()))?;
                Ok((price * self.market_buffer).round())
            }
            OrderType::Limit | OrderType::StopLimit => cmd
                .limit_price
                .ok_or_else(|| BrokerageError::Validation("limit price required".into())),
            OrderType::StopLoss => cmd
                .stop_price
                .ok_or_else(|| BrokerageError::Validation("stop price required".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{MockPriceSourcePort, MockReferenceDataPort, SymbolInfo};
    use crate::domain::orders::{OrderSide, OrderStatus};
    use crate::domain::shared::Quantity;
    use crate::infrastructure::bus::InMemoryEventBus;
    use crate::infrastructure::persistence::InMemoryStore;
    use rust_decimal_macros::dec;

    fn known_symbol(reference: &mut MockReferenceDataPort) {
        reference.expect_is_user_active().returning(|_| Ok(true));
        reference.expect_find_symbol().returning(|id| {
            Ok(Some(SymbolInfo {
                id: id.clone(),
                ticker: "AAPL".into(),
                name: "Apple Inc.".into(),
            }))
        });
    }

    fn request(side: OrderSide, order_type: OrderType, quantity: u64) -> PlaceOrderRequest {
        PlaceOrderRequest {
            symbol_id: "sym-aapl".into(),
            side,
            order_type,
            quantity,
            limit_price: matches!(order_type, OrderType::Limit | OrderType::StopLimit)
                .then(|| dec!(50.00)),
            stop_price: matches!(order_type, OrderType::StopLoss | OrderType::StopLimit)
                .then(|| dec!(45.00)),
        }
    }

    fn use_case(
        store: &Arc<InMemoryStore>,
        prices: MockPriceSourcePort,
        reference: MockReferenceDataPort,
    ) -> PlaceOrderUseCase<
        InMemoryStore,
        InMemoryStore,
        InMemoryStore,
        MockPriceSourcePort,
        MockReferenceDataPort,
        InMemoryEventBus,
    > {
        PlaceOrderUseCase::new(
            Arc::clone(store),
            Arc::clone(store),
            Arc::clone(store),
            Arc::new(prices),
            Arc::new(reference),
            Arc::new(InMemoryEventBus::new()),
            DEFAULT_MARKET_BUFFER,
        )
    }

    #[tokio::test]
    async fn market_buy_reserves_buffered_estimate() {
        let store = Arc::new(InMemoryStore::new());
        let user = UserId::new("user-1");
        store
            .deposit(&user, Money::new(dec!(1000.00)))
            .await
            .unwrap();

        let mut prices = MockPriceSourcePort::new();
        prices
            .expect_current_price()
            .returning(|_| Ok(Some(Money::new(dec!(50.00)))));
        let mut reference = MockReferenceDataPort::new();
        known_symbol(&mut reference);

        let uc = use_case(&store, prices, reference);
        let view = uc
            .execute(&user, request(OrderSide::Buy, OrderType::Market, 10))
            .await
            .unwrap();

        // Estimate 52.50/share, value 525.00, fee 0.53 (half-up).
        assert_eq!(view.order_value, dec!(525.00));
        assert_eq!(view.fees, dec!(0.53));
        assert_eq!(view.status, OrderStatus::Pending);

        let wallet = store.get_or_create(&user).await.unwrap();
        assert_eq!(wallet.locked_balance(), Money::new(dec!(525.53)));
    }

    #[tokio::test]
    async fn market_order_without_price_is_rejected() {
        let store = Arc::new(InMemoryStore::new());
        let user = UserId::new("user-1");
        store
            .deposit(&user, Money::new(dec!(1000.00)))
            .await
            .unwrap();

        let mut prices = MockPriceSourcePort::new();
        prices.expect_current_price().returning(|_| Ok(None));
        let mut reference = MockReferenceDataPort::new();
        known_symbol(&mut reference);

        let uc = use_case(&store, prices, reference);
        let result = uc
            .execute(&user, request(OrderSide::Buy, OrderType::Market, 10))
            .await;

        assert!(matches!(result, Err(BrokerageError::PriceUnavailable(_))));
    }

    #[tokio::test]
    async fn unknown_symbol_is_rejected() {
        let store = Arc::new(InMemoryStore::new());
        let prices = MockPriceSourcePort::new();
        let mut reference = MockReferenceDataPort::new();
        reference.expect_is_user_active().returning(|_| Ok(true));
        reference.expect_find_symbol().returning(|_| Ok(None));

        let uc = use_case(&store, prices, reference);
        let result = uc
            .execute(
                &UserId::new("user-1"),
                request(OrderSide::Buy, OrderType::Limit, 10),
            )
            .await;

        assert!(matches!(result, Err(BrokerageError::NotFound(_))));
    }

    #[tokio::test]
    async fn inactive_user_cannot_place_orders() {
        let store = Arc::new(InMemoryStore::new());
        let prices = MockPriceSourcePort::new();
        let mut reference = MockReferenceDataPort::new();
        reference.expect_is_user_active().returning(|_| Ok(false));

        let uc = use_case(&store, prices, reference);
        let result = uc
            .execute(
                &UserId::new("user-1"),
                request(OrderSide::Buy, OrderType::Limit, 10),
            )
            .await;

        assert!(matches!(result, Err(BrokerageError::Validation(_))));
    }

    #[tokio::test]
    async fn buy_without_funds_is_rejected() {
        let store = Arc::new(InMemoryStore::new());
        let prices = MockPriceSourcePort::new();
        let mut reference = MockReferenceDataPort::new();
        known_symbol(&mut reference);

        let uc = use_case(&store, prices, reference);
        let result = uc
            .execute(
                &UserId::new("user-1"),
                request(OrderSide::Buy, OrderType::Limit, 10),
            )
            .await;

        assert!(matches!(
            result,
            Err(BrokerageError::Wallet(_))
        ));
    }

    #[tokio::test]
    async fn sell_reserves_shares() {
        let store = Arc::new(InMemoryStore::new());
        let user = UserId::new("user-1");
        let symbol = SymbolId::new("sym-aapl");
        store
            .seed_holding(&user, &symbol, Quantity::new(20), Money::new(dec!(800.00)))
            .await;

        let prices = MockPriceSourcePort::new();
        let mut reference = MockReferenceDataPort::new();
        known_symbol(&mut reference);

        let uc = use_case(&store, prices, reference);
        uc.execute(&user, request(OrderSide::Sell, OrderType::Limit, 15))
            .await
            .unwrap();

        let holding = store.find(&user, &symbol).await.unwrap().unwrap();
        assert_eq!(holding.reserved_quantity(), Quantity::new(15));

        // A second sell cannot promise the remaining-plus-reserved shares.
        let result = uc
            .execute(&user, request(OrderSide::Sell, OrderType::Limit, 10))
            .await;
        assert!(matches!(result, Err(BrokerageError::Holding(_))));
    }
}
