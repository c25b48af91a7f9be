//! Outbound ports the application layer depends on.

pub mod event_bus;
pub mod notifier;
pub mod price_source;
pub mod reference_data;

pub use event_bus::{BusSubscription, Delivery, EventBusError, EventBusPort};
pub use notifier::{NoOpNotifier, NotifierPort};
pub use price_source::{PriceSourceError, PriceSourcePort};
pub use reference_data::{ReferenceDataError, ReferenceDataPort, SymbolInfo};

#[cfg(test)]
pub use price_source::MockPriceSourcePort;
#[cfg(test)]
pub use reference_data::MockReferenceDataPort;
