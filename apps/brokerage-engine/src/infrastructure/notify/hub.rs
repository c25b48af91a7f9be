//! Fan-out hub for connected clients.
//!
//! Each connection gets a bounded channel. Pushes use `try_send`: a
//! subscriber whose queue is full or closed is unregistered on the spot,
//! never stalling publication to the others.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;

use crate::application::ports::NotifierPort;
use crate::domain::events::{MarketTick, PortfolioUpdated};
use crate::domain::shared::UserId;

/// Per-subscriber queue depth.
const SUBSCRIBER_CAPACITY: usize = 256;

/// Message pushed to a connected client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Notification {
    /// A settled change to the subscriber's portfolio.
    PortfolioUpdate(PortfolioUpdated),
    /// A market price tick.
    MarketTick(MarketTick),
}

#[derive(Default)]
struct Subscribers {
    by_user: HashMap<String, Vec<mpsc::Sender<Notification>>>,
    market: Vec<mpsc::Sender<Notification>>,
}

/// Registry of live client subscriptions.
#[derive(Default)]
pub struct SubscriberHub {
    subscribers: RwLock<Subscribers>,
}

impl SubscriberHub {
    /// Create an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to one user's portfolio updates.
    pub fn subscribe_user(&self, user_id: &UserId) -> mpsc::Receiver<Notification> {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_CAPACITY);
        self.subscribers
            .write()
            .unwrap()
            .by_user
            .entry(user_id.to_string())
            .or_default()
            .push(tx);
        rx
    }

    /// Subscribe to the market tick broadcast.
    pub fn subscribe_market(&self) -> mpsc::Receiver<Notification> {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_CAPACITY);
        self.subscribers.write().unwrap().market.push(tx);
        rx
    }

    /// Live subscriber counts `(user_channels, market_channels)`.
    #[must_use]
    pub fn subscriber_counts(&self) -> (usize, usize) {
        let subs = self.subscribers.read().unwrap();
        (subs.by_user.values().map(Vec::len).sum(), subs.market.len())
    }

    fn push_all(senders: &mut Vec<mpsc::Sender<Notification>>, message: &Notification) {
        senders.retain(|sender| match sender.try_send(message.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                // A consumer that let its queue fill up is dropped, the same
                // as a disconnected one.
                debug!("subscriber queue full, dropping subscriber");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });
    }
}

#[async_trait]
impl NotifierPort for SubscriberHub {
    async fn push_portfolio(&self, user_id: &UserId, update: &PortfolioUpdated) {
        let mut subs = self.subscribers.write().unwrap();
        if let Some(senders) = subs.by_user.get_mut(user_id.as_str()) {
            Self::push_all(senders, &Notification::PortfolioUpdate(update.clone()));
            if senders.is_empty() {
                subs.by_user.remove(user_id.as_str());
            }
        }
    }

    async fn push_tick(&self, tick: &MarketTick) {
        let mut subs = self.subscribers.write().unwrap();
        Self::push_all(&mut subs.market, &Notification::MarketTick(tick.clone()));
    }
}
