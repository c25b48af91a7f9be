//! Symbol reference data port.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use thiserror::Error;

use crate::domain::shared::{SymbolId, UserId};

/// Errors from reference data lookup.
#[derive(Debug, Error)]
pub enum ReferenceDataError {
    /// The source is temporarily unavailable.
    #[error("reference data unavailable: {0}")]
    Unavailable(String),
}

/// A tradeable instrument.
#[derive(Debug, Clone)]
pub struct SymbolInfo {
    /// Symbol identifier.
    pub id: SymbolId,
    /// Exchange ticker.
    pub ticker: String,
    /// Company name.
    pub name: String,
}

/// Lookup of tradeable symbols and account standing. Intake rejects orders
/// on unknown symbols and inactive users.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ReferenceDataPort: Send + Sync {
    /// Whether the user's account is active.
    async fn is_user_active(&self, user_id: &UserId) -> Result<bool, ReferenceDataError>;

    /// Find a symbol by ID.
    async fn find_symbol(&self, id: &SymbolId) -> Result<Option<SymbolInfo>, ReferenceDataError>;

    /// All tradeable symbols.
    async fn list_symbols(&self) -> Result<Vec<SymbolInfo>, ReferenceDataError>;
}
