//! Market price port.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use thiserror::Error;

use crate::domain::shared::{Money, SymbolId};

/// Errors from the price source.
#[derive(Debug, Error)]
pub enum PriceSourceError {
    /// The source is temporarily unavailable.
    #[error("price source unavailable: {0}")]
    Unavailable(String),
}

/// Supplies the current market price per symbol.
///
/// Returns `None` when the source has no quote for the symbol yet. Callers
/// treat that as "price unavailable", not as an error.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PriceSourcePort: Send + Sync {
    /// Current market price for `symbol`, if quoted.
    async fn current_price(&self, symbol: &SymbolId) -> Result<Option<Money>, PriceSourceError>;
}

#[async_trait]
impl<P: PriceSourcePort + ?Sized> PriceSourcePort for std::sync::Arc<P> {
    async fn current_price(&self, symbol: &SymbolId) -> Result<Option<Money>, PriceSourceError> {
        (**self).current_price(symbol).await
    }
}
