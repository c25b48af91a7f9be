//! Domain layer: entities, value objects and pure business rules.

pub mod events;
pub mod orders;
pub mod shared;
pub mod trading;
