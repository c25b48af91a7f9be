//! Subscriber hub behind the notifier port.

mod hub;

pub use hub::{Notification, SubscriberHub};
