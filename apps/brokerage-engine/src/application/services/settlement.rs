//! Settlement stage: books executed trades atomically into portfolios.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::application::ports::{Delivery, EventBusPort};
use crate::domain::events::{BusEvent, PortfolioUpdated, Topic, TradeExecuted};
use crate::domain::trading::{SettlementStore, StoreError};
use crate::error::BrokerageError;

/// Consumer group name on the trade stream.
pub const SETTLEMENT_GROUP: &str = "settlement";

/// The settlement pipeline stage.
///
/// At-least-once input plus an idempotent store: a redelivered trade that
/// already settled is acknowledged without touching state.
pub struct SettlementService<S, B> {
    store: Arc<S>,
    bus: Arc<B>,
    retry_backoff: Duration,
    max_attempts: u32,
}

impl<S, B> SettlementService<S, B>
where
    S: SettlementStore + 'static,
    B: EventBusPort + 'static,
{
    /// Wire the service to the store and bus.
    pub fn new(store: Arc<S>, bus: Arc<B>, retry_backoff: Duration, max_attempts: u32) -> Self {
        Self {
            store,
            bus,
            retry_backoff,
            max_attempts,
        }
    }

    /// Consume until cancelled.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut sub = self.bus.subscribe(Topic::TradeEvents, SETTLEMENT_GROUP);
        info!("settlement service started");

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                delivery = sub.recv() => {
                    let Some(delivery) = delivery else { break };
                    self.on_delivery(delivery).await;
                }
            }
        }
        info!("settlement service stopped");
    }

    async fn on_delivery(&self, delivery: Delivery) {
        let BusEvent::TradeExecuted(executed) = &delivery.event else {
            return;
        };

        match self.settle(executed).await {
            Ok(()) => {}
            Err(BrokerageError::AlreadySettled(trade_id)) => {
                debug!(trade_id = %trade_id, "duplicate delivery, already settled");
            }
            Err(err) if err.is_retryable() => {
                if delivery.attempt >= self.max_attempts {
                    error!(
                        trade_id = %executed.trade.id(),
                        attempts = delivery.attempt,
                        error = %err,
                        "settlement exhausted retries"
                    );
                } else {
                    self.schedule_retry(delivery).await;
                }
            }
            Err(err) => {
                // Business failure on a trade that already executed: this is
                // a pipeline bug, not a caller mistake. Log loudly, drop.
                error!(trade_id = %executed.trade.id(), error = %err, "settlement rejected trade");
            }
        }
    }

    async fn settle(&self, executed: &TradeExecuted) -> Result<(), BrokerageError> {
        let trade = &executed.trade;
        let ledger_entry = self
            .store
            .apply_settlement(trade, executed.reserved_funds)
            .await
            .map_err(|e| match e {
                StoreError::DuplicateTrade(id) => BrokerageError::AlreadySettled(id),
                other => other.into(),
            })?;

        info!(
            trade_id = %trade.id(),
            user_id = %trade.user_id(),
            amount = %ledger_entry.amount(),
            "trade settled"
        );

        self.bus
            .publish(BusEvent::PortfolioUpdated(PortfolioUpdated {
                user_id: trade.user_id().clone(),
                order_id: trade.order_id().clone(),
                trade_id: trade.id().clone(),
                symbol_id: trade.symbol_id().clone(),
                side: trade.side(),
                quantity_delta: trade.quantity().signed(!trade.side().is_buy()),
                balance_delta: trade.wallet_delta(),
                occurred_at: ledger_entry.created_at(),
            }))
            .await?;
        Ok(())
    }

    async fn schedule_retry(&self, delivery: Delivery) {
        let bus = Arc::clone(&self.bus);
        let backoff = self.retry_backoff * delivery.attempt;
        tokio::spawn(async move {
            tokio::time::sleep(backoff).await;
            if bus
                .redeliver(Topic::TradeEvents, SETTLEMENT_GROUP, delivery.next_attempt())
                .await
                .is_err()
            {
                debug!("bus closed before settlement retry");
            }
        });
    }
}
