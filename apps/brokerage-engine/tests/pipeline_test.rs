//! End-to-end pipeline tests: intake through execution and settlement.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal_macros::dec;
use tokio_util::sync::CancellationToken;

use brokerage_engine::application::dto::PlaceOrderRequest;
use brokerage_engine::application::ports::{EventBusPort, SymbolInfo};
use brokerage_engine::application::services::{ExecutionService, SettlementService};
use brokerage_engine::application::use_cases::{
    CancelOrderUseCase, DEFAULT_MARKET_BUFFER, PlaceOrderUseCase,
};
use brokerage_engine::domain::events::{BusEvent, MarketTick};
use brokerage_engine::domain::orders::{
    OrderRepository, OrderSide, OrderStatus, OrderType,
};
use brokerage_engine::domain::shared::{Money, OrderId, Quantity, SymbolId, Timestamp, UserId};
use brokerage_engine::domain::trading::{
    HoldingRepository, LedgerEntryType, LedgerRepository, TradeRepository, WalletRepository,
};
use brokerage_engine::infrastructure::bus::InMemoryEventBus;
use brokerage_engine::infrastructure::persistence::InMemoryStore;
use brokerage_engine::infrastructure::pricing::SimulatedPriceSource;
use brokerage_engine::infrastructure::reference::InMemoryReferenceData;

const SYMBOL: &str = "sym-aapl";

struct Pipeline {
    store: Arc<InMemoryStore>,
    bus: Arc<InMemoryEventBus>,
    prices: Arc<SimulatedPriceSource>,
    place: PlaceOrderUseCase<
        InMemoryStore,
        InMemoryStore,
        InMemoryStore,
        Arc<SimulatedPriceSource>,
        InMemoryReferenceData,
        InMemoryEventBus,
    >,
    cancel_uc: CancelOrderUseCase<InMemoryStore, InMemoryStore, InMemoryStore, InMemoryEventBus>,
    shutdown: CancellationToken,
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn pipeline() -> Pipeline {
    let store = Arc::new(InMemoryStore::new());
    let bus = Arc::new(InMemoryEventBus::new());
    let prices = Arc::new(SimulatedPriceSource::default());
    let reference = Arc::new(InMemoryReferenceData::new(vec![SymbolInfo {
        id: SymbolId::new(SYMBOL),
        ticker: "AAPL".into(),
        name: "Apple Inc.".into(),
    }]));

    let shutdown = CancellationToken::new();
    let execution = Arc::new(ExecutionService::new(
        Arc::clone(&store),
        Arc::clone(&store),
        Arc::clone(&store),
        Arc::new(Arc::clone(&prices)),
        Arc::clone(&bus),
        Duration::from_millis(20),
        5,
    ));
    let settlement = Arc::new(SettlementService::new(
        Arc::clone(&store),
        Arc::clone(&bus),
        Duration::from_millis(20),
        5,
    ));
    tokio::spawn(Arc::clone(&execution).run(shutdown.child_token()));
    tokio::spawn(Arc::clone(&settlement).run(shutdown.child_token()));
    // Let the consumers subscribe before anything publishes.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let place = PlaceOrderUseCase::new(
        Arc::clone(&store),
        Arc::clone(&store),
        Arc::clone(&store),
        Arc::new(Arc::clone(&prices)),
        Arc::clone(&reference),
        Arc::clone(&bus),
        DEFAULT_MARKET_BUFFER,
    );
    let cancel_uc = CancelOrderUseCase::new(
        Arc::clone(&store),
        Arc::clone(&store),
        Arc::clone(&store),
        Arc::clone(&bus),
    );

    Pipeline {
        store,
        bus,
        prices,
        place,
        cancel_uc,
        shutdown,
    }
}

fn request(side: OrderSide, order_type: OrderType, quantity: u64) -> PlaceOrderRequest {
    PlaceOrderRequest {
        symbol_id: SYMBOL.into(),
        side,
        order_type,
        quantity,
        limit_price: None,
        stop_price: None,
    }
}

async fn wait_for_status(store: &InMemoryStore, id: &OrderId, status: OrderStatus) {
    for _ in 0..200 {
        let order = OrderRepository::find_by_id(store, id).await.unwrap().unwrap();
        if order.status() == status {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("order {id} never reached {status}");
}

async fn wait_for_settlement(store: &InMemoryStore, user: &UserId, trades: usize) {
    for _ in 0..200 {
        if TradeRepository::find_by_user(store, user).await.unwrap().len() >= trades {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("settlement never produced {trades} trade(s)");
}

#[tokio::test(flavor = "multi_thread")]
async fn market_buy_flows_through_to_the_portfolio() {
    let p = pipeline().await;
    let user = UserId::new("user-1");
    let symbol = SymbolId::new(SYMBOL);

    p.store.deposit(&user, Money::new(dec!(1000.00))).await.unwrap();
    p.prices.set_price(&symbol, Money::new(dec!(50.00)));

    let view = p
        .place
        .execute(&user, request(OrderSide::Buy, OrderType::Market, 10))
        .await
        .unwrap();
    let order_id = OrderId::new(view.id.clone());

    wait_for_status(&p.store, &order_id, OrderStatus::Filled).await;
    wait_for_settlement(&p.store, &user, 1).await;

    // Trade: 10 @ 50.00 = 500.00 value, 0.50 fee.
    let trades = TradeRepository::find_by_user(p.store.as_ref(), &user).await.unwrap();
    assert_eq!(trades[0].trade_value(), Money::new(dec!(500.00)));
    assert_eq!(trades[0].fees(), Money::new(dec!(0.50)));

    // Wallet: 1000 - 500.50, nothing left locked.
    let wallet = p.store.get_or_create(&user).await.unwrap();
    assert_eq!(wallet.balance(), Money::new(dec!(499.50)));
    assert_eq!(wallet.locked_balance(), Money::ZERO);

    // Position: 10 shares at average 50.00.
    let holding = p.store.find(&user, &symbol).await.unwrap().unwrap();
    assert_eq!(holding.quantity(), Quantity::new(10));
    assert_eq!(holding.average_price(), Money::new(dec!(50.00)));

    // Ledger: one debit for value plus fees.
    let ledger = LedgerRepository::find_by_user(p.store.as_ref(), &user).await.unwrap();
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].entry_type(), LedgerEntryType::StockPurchase);
    assert_eq!(ledger[0].amount(), Money::new(dec!(500.00)));
    assert_eq!(ledger[0].fees(), Money::new(dec!(0.50)));
}

#[tokio::test(flavor = "multi_thread")]
async fn limit_sell_waits_for_its_price() {
    let p = pipeline().await;
    let user = UserId::new("user-1");
    let symbol = SymbolId::new(SYMBOL);

    p.store
        .seed_holding(&user, &symbol, Quantity::new(10), Money::new(dec!(400.00)))
        .await;
    p.prices.set_price(&symbol, Money::new(dec!(55.00)));

    let mut req = request(OrderSide::Sell, OrderType::Limit, 5);
    req.limit_price = Some(dec!(60.00));
    let view = p.place.execute(&user, req).await.unwrap();
    let order_id = OrderId::new(view.id.clone());

    // Below the limit: still pending after the defer window.
    tokio::time::sleep(Duration::from_millis(150)).await;
    let order = OrderRepository::find_by_id(p.store.as_ref(), &order_id).await.unwrap().unwrap();
    assert_eq!(order.status(), OrderStatus::Pending);

    // Market reaches the limit; the tick triggers a re-check.
    p.prices.set_price(&symbol, Money::new(dec!(60.00)));
    p.bus
        .publish(BusEvent::MarketTick(MarketTick {
            symbol_id: symbol.clone(),
            price: Money::new(dec!(60.00)),
            occurred_at: Timestamp::now(),
        }))
        .await
        .unwrap();

    wait_for_status(&p.store, &order_id, OrderStatus::Filled).await;
    wait_for_settlement(&p.store, &user, 1).await;

    // Filled at the limit: 5 @ 60.00 = 300.00, fee 0.30.
    let order = OrderRepository::find_by_id(p.store.as_ref(), &order_id).await.unwrap().unwrap();
    assert_eq!(order.filled_price(), Some(Money::new(dec!(60.00))));

    let wallet = p.store.get_or_create(&user).await.unwrap();
    assert_eq!(wallet.balance(), Money::new(dec!(299.70)));

    // 5 shares left at the original average price.
    let holding = p.store.find(&user, &symbol).await.unwrap().unwrap();
    assert_eq!(holding.quantity(), Quantity::new(5));
    assert_eq!(holding.reserved_quantity(), Quantity::ZERO);
    assert_eq!(holding.average_price(), Money::new(dec!(40.00)));
}

#[tokio::test(flavor = "multi_thread")]
async fn selling_the_whole_position_removes_it() {
    let p = pipeline().await;
    let user = UserId::new("user-1");
    let symbol = SymbolId::new(SYMBOL);

    p.store
        .seed_holding(&user, &symbol, Quantity::new(10), Money::new(dec!(400.00)))
        .await;
    p.prices.set_price(&symbol, Money::new(dec!(50.00)));

    let view = p
        .place
        .execute(&user, request(OrderSide::Sell, OrderType::Market, 10))
        .await
        .unwrap();
    let order_id = OrderId::new(view.id.clone());

    wait_for_status(&p.store, &order_id, OrderStatus::Filled).await;
    wait_for_settlement(&p.store, &user, 1).await;

    assert!(p.store.find(&user, &symbol).await.unwrap().is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn duplicate_trade_delivery_settles_once() {
    let p = pipeline().await;
    let user = UserId::new("user-1");
    let symbol = SymbolId::new(SYMBOL);

    p.store.deposit(&user, Money::new(dec!(1000.00))).await.unwrap();
    p.prices.set_price(&symbol, Money::new(dec!(50.00)));

    let view = p
        .place
        .execute(&user, request(OrderSide::Buy, OrderType::Market, 10))
        .await
        .unwrap();
    let order_id = OrderId::new(view.id.clone());
    wait_for_status(&p.store, &order_id, OrderStatus::Filled).await;
    wait_for_settlement(&p.store, &user, 1).await;

    // Replay the executed trade as if the bus delivered it twice.
    let sub_events = {
        let trades = TradeRepository::find_by_user(p.store.as_ref(), &user).await.unwrap();
        brokerage_engine::domain::events::TradeExecuted {
            trade: trades[0].clone(),
            reserved_funds: Money::new(dec!(525.53)),
            occurred_at: Timestamp::now(),
        }
    };
    p.bus
        .publish(BusEvent::TradeExecuted(sub_events))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;

    // Still exactly one settlement; balances unchanged.
    assert_eq!(p.store.settled_count(), 1);
    let wallet = p.store.get_or_create(&user).await.unwrap();
    assert_eq!(wallet.balance(), Money::new(dec!(499.50)));
    let holding = p.store.find(&user, &symbol).await.unwrap().unwrap();
    assert_eq!(holding.quantity(), Quantity::new(10));
}

#[tokio::test(flavor = "multi_thread")]
async fn cancelled_order_is_never_executed() {
    let p = pipeline().await;
    let user = UserId::new("user-1");
    let symbol = SymbolId::new(SYMBOL);

    p.store.deposit(&user, Money::new(dec!(1000.00))).await.unwrap();
    p.prices.set_price(&symbol, Money::new(dec!(55.00)));

    // Limit far below the market: parks as pending.
    let mut req = request(OrderSide::Buy, OrderType::Limit, 10);
    req.limit_price = Some(dec!(40.00));
    let view = p.place.execute(&user, req).await.unwrap();
    let order_id = OrderId::new(view.id.clone());

    p.cancel_uc.execute(&user, &order_id).await.unwrap();
    wait_for_status(&p.store, &order_id, OrderStatus::Cancelled).await;

    // Even if the price now satisfies the limit, the order stays cancelled.
    p.prices.set_price(&symbol, Money::new(dec!(39.00)));
    p.bus
        .publish(BusEvent::MarketTick(MarketTick {
            symbol_id: symbol.clone(),
            price: Money::new(dec!(39.00)),
            occurred_at: Timestamp::now(),
        }))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;

    let order = OrderRepository::find_by_id(p.store.as_ref(), &order_id).await.unwrap().unwrap();
    assert_eq!(order.status(), OrderStatus::Cancelled);
    assert!(TradeRepository::find_by_user(p.store.as_ref(), &user).await.unwrap().is_empty());

    // And the reservation came back.
    let wallet = p.store.get_or_create(&user).await.unwrap();
    assert_eq!(wallet.locked_balance(), Money::ZERO);
    assert_eq!(wallet.available(), Money::new(dec!(1000.00)));
}

#[tokio::test(flavor = "multi_thread")]
async fn average_price_blends_across_settled_buys() {
    let p = pipeline().await;
    let user = UserId::new("user-1");
    let symbol = SymbolId::new(SYMBOL);

    p.store.deposit(&user, Money::new(dec!(10000.00))).await.unwrap();
    p.prices.set_price(&symbol, Money::new(dec!(100.00)));

    let first = p
        .place
        .execute(&user, request(OrderSide::Buy, OrderType::Market, 10))
        .await
        .unwrap();
    wait_for_status(&p.store, &OrderId::new(first.id.clone()), OrderStatus::Filled).await;
    wait_for_settlement(&p.store, &user, 1).await;

    p.prices.set_price(&symbol, Money::new(dec!(200.00)));
    let second = p
        .place
        .execute(&user, request(OrderSide::Buy, OrderType::Market, 10))
        .await
        .unwrap();
    wait_for_status(&p.store, &OrderId::new(second.id.clone()), OrderStatus::Filled).await;
    wait_for_settlement(&p.store, &user, 2).await;

    // 10 @ 100 then 10 @ 200: average 150.00 on a 3000.00 basis.
    let holding = p.store.find(&user, &symbol).await.unwrap().unwrap();
    assert_eq!(holding.quantity(), Quantity::new(20));
    assert_eq!(holding.average_price(), Money::new(dec!(150.00)));
    assert_eq!(holding.total_cost(), Money::new(dec!(3000.00)));
}
