//! Channel-backed event bus.
//!
//! Topic fan-out with consumer-group semantics: every group subscribed to a
//! topic gets its own unbounded queue, and each event is queued once per
//! group. One consumer task drains each group's queue, which is what makes
//! delivery order per partition key deterministic.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::trace;

use crate::application::ports::{BusSubscription, Delivery, EventBusError, EventBusPort};
use crate::domain::events::{BusEvent, Topic};

type GroupKey = (Topic, String);

/// In-memory implementation of the event bus port.
#[derive(Debug, Default)]
pub struct InMemoryEventBus {
    groups: RwLock<HashMap<GroupKey, mpsc::UnboundedSender<Delivery>>>,
}

impl InMemoryEventBus {
    /// Create a bus with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventBusPort for InMemoryEventBus {
    async fn publish(&self, event: BusEvent) -> Result<(), EventBusError> {
        let topic = event.topic();
        trace!(topic = %topic, key = %event.key(), "publish");

        let mut groups = self.groups.write().unwrap();
        // Fan out to every group on the topic, dropping channels whose
        // consumer has gone away.
        groups.retain(|(group_topic, _), sender| {
            if *group_topic != topic {
                return true;
            }
            sender.send(Delivery::first(event.clone())).is_ok()
        });
        Ok(())
    }

    fn subscribe(&self, topic: Topic, group: &str) -> BusSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        self.groups
            .write()
            .unwrap()
            .insert((topic, group.to_string()), tx);
        BusSubscription::new(rx)
    }

    async fn redeliver(
        &self,
        topic: Topic,
        group: &str,
        delivery: Delivery,
    ) -> Result<(), EventBusError> {
        let groups = self.groups.read().unwrap();
        let sender = groups
            .get(&(topic, group.to_string()))
            .ok_or(EventBusError::Closed)?;
        sender.send(delivery).map_err(|_| EventBusError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::MarketTick;
    use crate::domain::shared::{Money, SymbolId, Timestamp};
    use rust_decimal_macros::dec;

    fn tick(symbol: &str, price: &str) -> BusEvent {
        BusEvent::MarketTick(MarketTick {
            symbol_id: SymbolId::new(symbol),
            price: Money::new(price.parse().unwrap()),
            occurred_at: Timestamp::now(),
        })
    }

    #[tokio::test]
    async fn every_group_sees_every_event() {
        let bus = InMemoryEventBus::new();
        let mut a = bus.subscribe(Topic::MarketData, "group-a");
        let mut b = bus.subscribe(Topic::MarketData, "group-b");

        bus.publish(tick("sym-aapl", "50.00")).await.unwrap();

        assert!(a.recv().await.is_some());
        assert!(b.recv().await.is_some());
    }

    #[tokio::test]
    async fn per_key_order_is_publish_order() {
        let bus = InMemoryEventBus::new();
        let mut sub = bus.subscribe(Topic::MarketData, "group-a");

        for i in 1..=5 {
            bus.publish(tick("sym-aapl", &format!("{i}.00"))).await.unwrap();
        }

        for i in 1..=5 {
            let delivery = sub.recv().await.unwrap();
            let BusEvent::MarketTick(t) = delivery.event else {
                panic!("wrong event");
            };
            assert_eq!(t.price, Money::new(format!("{i}.00").parse().unwrap()));
            assert_eq!(delivery.attempt, 1);
        }
    }

    #[tokio::test]
    async fn events_do_not_cross_topics() {
        let bus = InMemoryEventBus::new();
        let mut orders = bus.subscribe(Topic::OrderEvents, "group-a");

        bus.publish(tick("sym-aapl", "50.00")).await.unwrap();
        drop(bus);

        // Channel closes without ever delivering the market event.
        assert!(orders.recv().await.is_none());
    }

    #[tokio::test]
    async fn redelivery_bumps_the_attempt() {
        let bus = InMemoryEventBus::new();
        let mut sub = bus.subscribe(Topic::MarketData, "group-a");

        bus.publish(tick("sym-aapl", "50.00")).await.unwrap();
        let delivery = sub.recv().await.unwrap();
        bus.redeliver(Topic::MarketData, "group-a", delivery.next_attempt())
            .await
            .unwrap();

        let retried = sub.recv().await.unwrap();
        assert_eq!(retried.attempt, 2);
    }

    #[tokio::test]
    async fn publishing_to_a_dropped_group_is_not_an_error() {
        let bus = InMemoryEventBus::new();
        let sub = bus.subscribe(Topic::MarketData, "group-a");
        drop(sub);

        assert!(bus.publish(tick("sym-aapl", "50.00")).await.is_ok());
        // The dead group was pruned; redelivery now reports closed.
        assert!(
            bus.redeliver(
                Topic::MarketData,
                "group-a",
                Delivery::first(tick("sym-aapl", "50.00"))
            )
            .await
            .is_err()
        );
    }
}
