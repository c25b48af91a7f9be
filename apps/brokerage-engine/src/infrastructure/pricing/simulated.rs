//! Random-walk price simulator.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use rust_decimal::{Decimal, RoundingStrategy};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::application::ports::{EventBusPort, PriceSourceError, PriceSourcePort};
use crate::domain::events::{BusEvent, MarketTick};
use crate::domain::shared::{Money, PRICE_SCALE, SymbolId, Timestamp};

/// Largest single-tick move, as a fraction of the current price.
const MAX_STEP: f64 = 0.005;

/// Price floor so a walk never reaches zero.
const FLOOR_CENTS: i64 = 1;

/// Random-walk simulator behind the price source port.
///
/// Each tick nudges every symbol by up to ±0.5% and publishes the new
/// price as a market data event.
#[derive(Debug, Default)]
pub struct SimulatedPriceSource {
    prices: RwLock<HashMap<String, Money>>,
}

impl SimulatedPriceSource {
    /// Start with the given opening prices.
    #[must_use]
    pub fn with_symbols(openings: &[(SymbolId, Money)]) -> Self {
        let prices = openings
            .iter()
            .map(|(symbol, price)| (symbol.to_string(), *price))
            .collect();
        Self {
            prices: RwLock::new(prices),
        }
    }

    /// Pin a symbol's price. Used by tests and demo seeding.
    pub fn set_price(&self, symbol: &SymbolId, price: Money) {
        self.prices
            .write()
            .unwrap()
            .insert(symbol.to_string(), price);
    }

    /// Advance every symbol one random step, returning the new quotes.
    fn step(&self) -> Vec<(SymbolId, Money)> {
        let mut rng = rand::rng();
        let mut prices = self.prices.write().unwrap();
        let mut quotes = Vec::with_capacity(prices.len());

        for (symbol, price) in prices.iter_mut() {
            let drift = rng.random_range(-MAX_STEP..=MAX_STEP);
            let factor = Decimal::try_from(1.0 + drift).unwrap_or(Decimal::ONE);
            let next = (price.amount() * factor)
                .round_dp_with_strategy(PRICE_SCALE, RoundingStrategy::MidpointAwayFromZero)
                .max(Money::from_cents(FLOOR_CENTS).amount());
            *price = Money::new(next);
            quotes.push((SymbolId::new(symbol.clone()), *price));
        }
        quotes
    }

    /// Tick until cancelled, publishing a market event per symbol per tick.
    pub async fn run_ticker<B: EventBusPort>(
        self: Arc<Self>,
        bus: Arc<B>,
        interval: Duration,
        cancel: CancellationToken,
    ) {
        let mut ticker = tokio::time::interval(interval);
        info!(interval_ms = interval.as_millis(), "price ticker started");

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    for (symbol_id, price) in self.step() {
                        let event = BusEvent::MarketTick(MarketTick {
                            symbol_id,
                            price,
                            occurred_at: Timestamp::now(),
                        });
                        if let Err(err) = bus.publish(event).await {
                            warn!(error = %err, "tick publish failed");
                        }
                    }
                }
            }
        }
        info!("price ticker stopped");
    }
}

#[async_trait]
impl PriceSourcePort for SimulatedPriceSource {
    async fn current_price(&self, symbol: &SymbolId) -> Result<Option<Money>, PriceSourceError> {
        Ok(self.prices.read().unwrap().get(symbol.as_str()).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn unknown_symbols_have_no_quote() {
        let source = SimulatedPriceSource::default();
        let quote = source
            .current_price(&SymbolId::new("sym-unknown"))
            .await
            .unwrap();
        assert!(quote.is_none());
    }

    #[tokio::test]
    async fn steps_stay_within_the_band() {
        let symbol = SymbolId::new("sym-aapl");
        let source =
            SimulatedPriceSource::with_symbols(&[(symbol.clone(), Money::new(dec!(100.00)))]);

        for _ in 0..100 {
            let before = source.current_price(&symbol).await.unwrap().unwrap();
            source.step();
            let after = source.current_price(&symbol).await.unwrap().unwrap();

            let band = (before.amount() * dec!(0.006)).max(dec!(0.01));
            assert!((after.amount() - before.amount()).abs() <= band);
            assert!(after.is_positive());
        }
    }

    #[tokio::test]
    async fn set_price_overrides_the_walk() {
        let symbol = SymbolId::new("sym-aapl");
        let source = SimulatedPriceSource::default();
        source.set_price(&symbol, Money::new(dec!(42.00)));

        assert_eq!(
            source.current_price(&symbol).await.unwrap(),
            Some(Money::new(dec!(42.00)))
        );
    }
}
