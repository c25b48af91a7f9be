//! In-memory event bus.

mod in_memory;

pub use in_memory::InMemoryEventBus;
