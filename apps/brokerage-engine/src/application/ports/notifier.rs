//! Client notification port.
//!
//! Best-effort, at-most-once per subscriber. Implementations drop messages
//! for slow or disconnected subscribers instead of blocking the pipeline.

use async_trait::async_trait;

use crate::domain::events::{MarketTick, PortfolioUpdated};
use crate::domain::shared::UserId;

/// Pushes settled portfolio changes and market ticks to connected clients.
#[async_trait]
pub trait NotifierPort: Send + Sync {
    /// Push a portfolio update to every subscriber of `user_id`.
    async fn push_portfolio(&self, user_id: &UserId, update: &PortfolioUpdated);

    /// Broadcast a market tick to every connected subscriber.
    async fn push_tick(&self, tick: &MarketTick);
}

/// Notifier that drops everything. Used in tests and headless runs.
#[derive(Debug, Default, Clone)]
pub struct NoOpNotifier;

#[async_trait]
impl NotifierPort for NoOpNotifier {
    async fn push_portfolio(&self, _user_id: &UserId, _update: &PortfolioUpdated) {}

    async fn push_tick(&self, _tick: &MarketTick) {}
}
