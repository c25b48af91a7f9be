//! Fan-out stage: pushes settled updates and market ticks to subscribers.
//!
//! Strictly best-effort. A failed or slow push is never redelivered; the
//! read model already holds the truth and clients can re-query.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::application::ports::{EventBusPort, NotifierPort};
use crate::domain::events::{BusEvent, Topic};

/// Consumer group name on the portfolio and market streams.
pub const FANOUT_GROUP: &str = "fanout";

/// The notification fan-out stage.
pub struct FanoutService<N, B> {
    notifier: Arc<N>,
    bus: Arc<B>,
}

impl<N, B> FanoutService<N, B>
where
    N: NotifierPort + 'static,
    B: EventBusPort + 'static,
{
    /// Wire the service to the notifier and bus.
    pub fn new(notifier: Arc<N>, bus: Arc<B>) -> Self {
        Self { notifier, bus }
    }

    /// Consume until cancelled.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut portfolio_sub = self.bus.subscribe(Topic::PortfolioUpdates, FANOUT_GROUP);
        let mut market_sub = self.bus.subscribe(Topic::MarketData, FANOUT_GROUP);
        info!("fan-out service started");

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                delivery = portfolio_sub.recv() => {
                    let Some(delivery) = delivery else { break };
                    if let BusEvent::PortfolioUpdated(update) = &delivery.event {
                        self.notifier.push_portfolio(&update.user_id, update).await;
                    }
                }
                delivery = market_sub.recv() => {
                    let Some(delivery) = delivery else { break };
                    if let BusEvent::MarketTick(tick) = &delivery.event {
                        self.notifier.push_tick(tick).await;
                    }
                }
            }
        }
        info!("fan-out service stopped");
    }
}
