//! TTL cache in front of a price source.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::application::ports::{PriceSourceError, PriceSourcePort};
use crate::domain::shared::{Money, SymbolId};

struct CacheEntry {
    price: Option<Money>,
    fetched_at: Instant,
}

/// Caches quotes from an inner source for a fixed TTL.
///
/// Read-heavy callers (the portfolio view prices every position on every
/// request) hit the cache; the inner source is asked at most once per
/// symbol per TTL window. Negative results are cached too.
pub struct CachedPriceSource<P> {
    inner: P,
    ttl: Duration,
    cache: RwLock<HashMap<String, CacheEntry>>,
}

impl<P: PriceSourcePort> CachedPriceSource<P> {
    /// Wrap `inner` with a TTL cache.
    pub fn new(inner: P, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            cache: RwLock::new(HashMap::new()),
        }
    }

    fn cached(&self, symbol: &SymbolId) -> Option<Option<Money>> {
        let cache = self.cache.read().unwrap();
        cache
            .get(symbol.as_str())
            .filter(|entry| entry.fetched_at.elapsed() < self.ttl)
            .map(|entry| entry.price)
    }
}

#[async_trait]
impl<P: PriceSourcePort> PriceSourcePort for CachedPriceSource<P> {
    async fn current_price(&self, symbol: &SymbolId) -> Result<Option<Money>, PriceSourceError> {
        if let Some(price) = self.cached(symbol) {
            return Ok(price);
        }

        let price = self.inner.current_price(symbol).await?;
        self.cache.write().unwrap().insert(
            symbol.to_string(),
            CacheEntry {
                price,
                fetched_at: Instant::now(),
            },
        );
        Ok(price)
    }
}
