//! Simulated market data.

mod cached;
mod simulated;

pub use cached::CachedPriceSource;
pub use simulated::SimulatedPriceSource;
