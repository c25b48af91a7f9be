//! Static in-memory symbol and account reference data.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::application::ports::{ReferenceDataError, ReferenceDataPort, SymbolInfo};
use crate::domain::shared::{SymbolId, UserId};

/// Fixed symbol table loaded at startup. Every user is active unless
/// explicitly suspended.
#[derive(Debug, Default)]
pub struct InMemoryReferenceData {
    symbols: HashMap<String, SymbolInfo>,
    suspended_users: RwLock<HashSet<String>>,
}

impl InMemoryReferenceData {
    /// Build from a symbol list.
    #[must_use]
    pub fn new(symbols: Vec<SymbolInfo>) -> Self {
        Self {
            symbols: symbols
                .into_iter()
                .map(|s| (s.id.to_string(), s))
                .collect(),
            suspended_users: RwLock::new(HashSet::new()),
        }
    }

    /// Mark a user inactive.
    pub fn suspend_user(&self, user_id: &UserId) {
        self.suspended_users
            .write()
            .unwrap()
            .insert(user_id.to_string());
    }

    /// A small default universe for demos and tests.
    #[must_use]
    pub fn default_universe() -> Self {
        let symbols = [
            ("sym-aapl", "AAPL", "Apple Inc."),
            ("sym-goog", "GOOG", "Alphabet Inc."),
            ("sym-msft", "MSFT", "Microsoft Corporation"),
            ("sym-amzn", "AMZN", "Amazon.com Inc."),
            ("sym-tsla", "TSLA", "Tesla Inc."),
        ]
        .into_iter()
        .map(|(id, ticker, name)| SymbolInfo {
            id: SymbolId::new(id),
            ticker: ticker.to_string(),
            name: name.to_string(),
        })
        .collect();
        Self::new(symbols)
    }
}

#[async_trait]
impl ReferenceDataPort for InMemoryReferenceData {
    async fn is_user_active(&self, user_id: &UserId) -> Result<bool, ReferenceDataError> {
        Ok(!self
            .suspended_users
            .read()
            .unwrap()
            .contains(user_id.as_str()))
    }

    async fn find_symbol(&self, id: &SymbolId) -> Result<Option<SymbolInfo>, ReferenceDataError> {
        Ok(self.symbols.get(id.as_str()).cloned())
    }

    async fn list_symbols(&self) -> Result<Vec<SymbolInfo>, ReferenceDataError> {
        let mut symbols: Vec<SymbolInfo> = self.symbols.values().cloned().collect();
        symbols.sort_by(|a, b| a.ticker.cmp(&b.ticker));
        Ok(symbols)
    }
}
