//! Execution engine: consumes accepted orders, fills what the market
//! allows, defers the rest.
//!
//! Two inputs drive it: the order stream for first-look execution and the
//! market tick stream for re-checking parked LIMIT and STOP orders. An
//! order that cannot execute yet is redelivered after a delay, bounded by
//! its expiry.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::application::ports::{Delivery, EventBusPort, PriceSourcePort};
use crate::domain::events::{BusEvent, OrderClosed, TradeExecuted, Topic};
use crate::domain::orders::{Order, OrderRepository, OrderRepositoryError, OrderType};
use crate::domain::shared::{Money, Timestamp};
use crate::domain::trading::{HoldingRepository, Trade, WalletRepository};
use crate::error::BrokerageError;

/// Consumer group name on the order and market streams.
pub const EXECUTION_GROUP: &str = "execution";

/// What execution decided for one order at one price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionDecision {
    /// Fill now at this price.
    Fill(Money),
    /// Not executable at the current market; check again later.
    Defer,
    /// The order outlived its TTL; close it and return the reservation.
    Expire,
}

/// Decide whether `order` executes against `market`.
///
/// MARKET orders take the market price. LIMIT orders fill at their limit
/// when the market has reached it. STOP orders arm at their stop price and
/// then behave as MARKET (stop-loss) or LIMIT (stop-limit).
#[must_use]
pub fn decide(order: &Order, market: Option<Money>, now: Timestamp) -> ExecutionDecision {
    if order.is_expired(now) {
        return ExecutionDecision::Expire;
    }
    let Some(market) = market else {
        return ExecutionDecision::Defer;
    };

    let buying = order.side().is_buy();
    let limit_ok = |limit: Money| {
        if buying {
            market <= limit
        } else {
            market >= limit
        }
    };
    // A buy stop arms when the market rises to it, a sell stop when the
    // market falls to it.
    let stop_armed = |stop: Money| {
        if buying {
            market >= stop
        } else {
            market <= stop
        }
    };

    match order.order_type() {
        OrderType::Market => ExecutionDecision::Fill(market),
        OrderType::Limit => match order.limit_price() {
            Some(limit) if limit_ok(limit) => ExecutionDecision::Fill(limit),
            _ => ExecutionDecision::Defer,
        },
        OrderType::StopLoss => match order.stop_price() {
            Some(stop) if stop_armed(stop) => ExecutionDecision::Fill(market),
            _ => ExecutionDecision::Defer,
        },
        OrderType::StopLimit => match (order.stop_price(), order.limit_price()) {
            (Some(stop), Some(limit)) if stop_armed(stop) && limit_ok(limit) => {
                ExecutionDecision::Fill(limit)
            }
            _ => ExecutionDecision::Defer,
        },
    }
}

/// The execution pipeline stage.
pub struct ExecutionService<O, W, H, P, B> {
    orders: Arc<O>,
    wallets: Arc<W>,
    holdings: Arc<H>,
    prices: Arc<P>,
    bus: Arc<B>,
    defer_delay: Duration,
    max_attempts: u32,
}

impl<O, W, H, P, B> ExecutionService<O, W, H, P, B>
where
    O: OrderRepository + 'static,
    W: WalletRepository + 'static,
    H: HoldingRepository + 'static,
    P: PriceSourcePort + 'static,
    B: EventBusPort + 'static,
{
    /// Wire the service to its ports.
    pub fn new(
        orders: Arc<O>,
        wallets: Arc<W>,
        holdings: Arc<H>,
        prices: Arc<P>,
        bus: Arc<B>,
        defer_delay: Duration,
        max_attempts: u32,
    ) -> Self {
        Self {
            orders,
            wallets,
            holdings,
            prices,
            bus,
            defer_delay,
            max_attempts,
        }
    }

    /// Consume until cancelled.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut order_sub = self.bus.subscribe(Topic::OrderEvents, EXECUTION_GROUP);
        let mut market_sub = self.bus.subscribe(Topic::MarketData, EXECUTION_GROUP);
        info!("execution service started");

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                delivery = order_sub.recv() => {
                    let Some(delivery) = delivery else { break };
                    self.on_order_delivery(delivery).await;
                }
                delivery = market_sub.recv() => {
                    let Some(delivery) = delivery else { break };
                    if let BusEvent::MarketTick(tick) = delivery.event {
                        self.recheck_pending(&tick.symbol_id, Some(tick.price)).await;
                    }
                }
            }
        }
        info!("execution service stopped");
    }

    async fn on_order_delivery(&self, delivery: Delivery) {
        let BusEvent::OrderPlaced(placed) = &delivery.event else {
            return; // OrderClosed needs no execution work
        };
        let order_id = placed.order.id().clone();

        match self.try_execute(&order_id).await {
            Ok(Handled::Done) => {}
            Ok(Handled::NotYet) => self.schedule_recheck(delivery).await,
            Err(err) if err.is_retryable() => {
                if delivery.attempt >= self.max_attempts {
                    error!(order_id = %order_id, error = %err, "giving up on order delivery");
                } else {
                    self.schedule_recheck(delivery).await;
                }
            }
            Err(err) => {
                error!(order_id = %order_id, error = %err, "order execution failed");
            }
        }
    }

    /// Re-run execution for every PENDING order on a ticking symbol.
    async fn recheck_pending(&self, symbol_id: &crate::domain::shared::SymbolId, price: Option<Money>) {
        let pending = match self.orders.find_pending_for_symbol(symbol_id).await {
            Ok(pending) => pending,
            Err(err) => {
                warn!(symbol = %symbol_id, error = %err, "pending order lookup failed");
                return;
            }
        };
        for order in pending {
            if let Err(err) = self.execute_at(&order, price).await {
                if !matches!(err, BrokerageError::InvalidState(_)) {
                    warn!(order_id = %order.id(), error = %err, "re-check failed");
                }
            }
        }
    }

    async fn try_execute(&self, order_id: &crate::domain::shared::OrderId) -> Result<Handled, BrokerageError> {
        let Some(order) = self.orders.find_by_id(order_id).await? else {
            return Err(BrokerageError::NotFound(format!("order {order_id}")));
        };
        if !order.status().can_fill() {
            // Cancelled between publish and consume; nothing to do.
            debug!(order_id = %order_id, status = %order.status(), "order no longer fillable");
            return Ok(Handled::Done);
        }

        let market = self.prices.current_price(order.symbol_id()).await?;
        match self.execute_at(&order, market).await {
            Ok(true) => Ok(Handled::Done),
            Ok(false) => Ok(Handled::NotYet),
            Err(err) => Err(err),
        }
    }

    /// Apply the execution decision. Returns `Ok(true)` when the order
    /// reached a terminal state, `Ok(false)` when it stays pending.
    async fn execute_at(&self, order: &Order, market: Option<Money>) -> Result<bool, BrokerageError> {
        let now = Timestamp::now();
        if !order.status().can_fill() {
            return Ok(true);
        }

        match decide(order, market, now) {
            ExecutionDecision::Fill(price) => {
                self.fill(order.clone(), price, now).await?;
                Ok(true)
            }
            ExecutionDecision::Defer => Ok(false),
            ExecutionDecision::Expire => {
                self.expire(order.clone(), now).await?;
                Ok(true)
            }
        }
    }

    async fn fill(&self, order: Order, price: Money, now: Timestamp) -> Result<(), BrokerageError> {
        let reserved_funds = order.reserved_funds();
        let mut filled = order.clone();
        filled.fill(price, now)?;

        match self.orders.update(&filled).await {
            Ok(()) => {}
            Err(OrderRepositoryError::Superseded { current, .. }) => {
                // Cancelled between our read and this write. The status on
                // record wins; no trade event.
                debug!(order_id = %order.id(), status = %current, "fill superseded by terminal status");
                return Ok(());
            }
            Err(err) => {
                // Retrying a half-persisted fill risks a duplicate trade. The
                // order terminates REJECTED and no trade event goes out.
                warn!(order_id = %order.id(), error = %err, "fill persistence failed; rejecting order");
                if let Err(close_err) = self.close(order, "execution failed", now).await {
                    error!(error = %close_err, "could not reject order after failed fill");
                }
                return Ok(());
            }
        }

        let trade = Trade::from_fill(&filled, price, now);
        info!(
            order_id = %filled.id(),
            trade_id = %trade.id(),
            price = %price,
            "order filled"
        );
        self.bus
            .publish(BusEvent::TradeExecuted(TradeExecuted {
                trade,
                reserved_funds,
                occurred_at: now,
            }))
            .await?;
        Ok(())
    }

    async fn expire(&self, order: Order, now: Timestamp) -> Result<(), BrokerageError> {
        warn!(order_id = %order.id(), "order expired");
        self.close(order, "expired", now).await
    }

    /// Terminally reject an order, return its reservation and announce the
    /// closure.
    async fn close(&self, mut order: Order, reason: &str, now: Timestamp) -> Result<(), BrokerageError> {
        order.reject()?;
        match self.orders.update(&order).await {
            Ok(()) => {}
            Err(OrderRepositoryError::Superseded { current, .. }) => {
                // Already closed elsewhere; its reservation was released there.
                debug!(order_id = %order.id(), status = %current, "close superseded by terminal status");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        }

        if order.side().is_buy() {
            self.wallets
                .unlock_funds(order.user_id(), order.reserved_funds())
                .await?;
        } else {
            self.holdings
                .release_shares(order.user_id(), order.symbol_id(), order.quantity())
                .await?;
        }

        self.bus
            .publish(BusEvent::OrderClosed(OrderClosed {
                order,
                reason: reason.into(),
                occurred_at: now,
            }))
            .await?;
        Ok(())
    }

    /// Redeliver the order after the defer delay so a parked order is
    /// re-checked even when its symbol never ticks.
    async fn schedule_recheck(&self, delivery: Delivery) {
        let bus = Arc::clone(&self.bus);
        let delay = self.defer_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if bus
                .redeliver(Topic::OrderEvents, EXECUTION_GROUP, delivery.next_attempt())
                .await
                .is_err()
            {
                debug!("bus closed before redelivery");
            }
        });
    }
}

enum Handled {
    Done,
    NotYet,
}
