//! Event bus port.
//!
//! At-least-once semantics: a consumer that fails processing hands the
//! delivery back via [`EventBusPort::redeliver`], which re-queues it for the
//! same group with the attempt counter bumped. Per-key ordering holds within
//! a group because each group drains its queue with a single consumer task.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::domain::events::{BusEvent, Topic};

/// Errors from the bus.
#[derive(Debug, Error)]
pub enum EventBusError {
    /// The bus has shut down.
    #[error("event bus closed")]
    Closed,
}

/// One delivery of an event to a consumer group.
#[derive(Debug, Clone)]
pub struct Delivery {
    /// The delivered event.
    pub event: BusEvent,
    /// 1 for the first delivery, incremented on each redelivery.
    pub attempt: u32,
}

impl Delivery {
    /// First delivery of an event.
    #[must_use]
    pub const fn first(event: BusEvent) -> Self {
        Self { event, attempt: 1 }
    }

    /// The same event, one attempt later.
    #[must_use]
    pub fn next_attempt(self) -> Self {
        Self {
            event: self.event,
            attempt: self.attempt + 1,
        }
    }
}

/// Receiving half of a consumer group subscription.
#[derive(Debug)]
pub struct BusSubscription {
    receiver: mpsc::UnboundedReceiver<Delivery>,
}

impl BusSubscription {
    /// Wrap a raw receiver.
    #[must_use]
    pub const fn new(receiver: mpsc::UnboundedReceiver<Delivery>) -> Self {
        Self { receiver }
    }

    /// Wait for the next delivery. `None` once the bus shuts down.
    pub async fn recv(&mut self) -> Option<Delivery> {
        self.receiver.recv().await
    }
}

/// Publish/subscribe port connecting the pipeline stages.
#[async_trait]
pub trait EventBusPort: Send + Sync {
    /// Publish an event to its topic; every subscribed group receives it.
    async fn publish(&self, event: BusEvent) -> Result<(), EventBusError>;

    /// Join `group` on `topic`. Events published after this call are
    /// delivered to the returned subscription.
    fn subscribe(&self, topic: Topic, group: &str) -> BusSubscription;

    /// Re-queue a failed delivery for one group only.
    async fn redeliver(
        &self,
        topic: Topic,
        group: &str,
        delivery: Delivery,
    ) -> Result<(), EventBusError>;
}
