//! In-memory store backing every repository port.
//!
//! One struct implements all the persistence traits so settlement can touch
//! wallet, holding, trade log and ledger as a single unit. Multi-step
//! mutations serialize on a per-user async mutex; the map locks themselves
//! are plain `RwLock`s whose guards never live across an await.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::orders::{
    Order, OrderRepository, OrderRepositoryError, OrderStatus,
};
use crate::domain::shared::{Money, Quantity, SymbolId, Timestamp, TradeId, UserId};
use crate::domain::trading::{
    Holding, HoldingChange, HoldingRepository, LedgerEntry, LedgerRepository, SettlementInput,
    SettlementStore, StoreError, Trade, TradeRepository, Wallet, WalletRepository, settle_trade,
};

type HoldingKey = (String, String);

/// In-memory implementation of every persistence port.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    orders: RwLock<HashMap<String, Order>>,
    wallets: RwLock<HashMap<String, Wallet>>,
    holdings: RwLock<HashMap<HoldingKey, Holding>>,
    trades: RwLock<HashMap<String, Trade>>,
    ledger: RwLock<Vec<LedgerEntry>>,
    settled_trades: RwLock<HashSet<String>>,
    user_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl InMemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a position directly, bypassing intake. For tests and demo data.
    pub async fn seed_holding(
        &self,
        user_id: &UserId,
        symbol_id: &SymbolId,
        quantity: Quantity,
        total_cost: Money,
    ) {
        let lock = self.user_lock(user_id).await;
        let _guard = lock.lock().await;

        let mut holding = Holding::open(user_id.clone(), symbol_id.clone(), Timestamp::now());
        holding.apply_buy(quantity, total_cost, Timestamp::now());
        self.holdings
            .write()
            .unwrap()
            .insert(holding_key(user_id, symbol_id), holding);
    }

    /// Number of settled trades. For tests.
    #[must_use]
    pub fn settled_count(&self) -> usize {
        self.settled_trades.read().unwrap().len()
    }

    async fn user_lock(&self, user_id: &UserId) -> Arc<Mutex<()>> {
        let mut locks = self.user_locks.lock().await;
        Arc::clone(
            locks
                .entry(user_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    fn wallet_snapshot(&self, user_id: &UserId) -> Wallet {
        self.wallets
            .read()
            .unwrap()
            .get(user_id.as_str())
            .cloned()
            .unwrap_or_else(|| Wallet::open(user_id.clone(), Timestamp::now()))
    }

    fn store_wallet(&self, wallet: Wallet) {
        self.wallets
            .write()
            .unwrap()
            .insert(wallet.user_id().to_string(), wallet);
    }

    /// Run a wallet mutation under the user's lock.
    async fn with_wallet<F>(&self, user_id: &UserId, op: F) -> Result<Wallet, StoreError>
    where
        F: FnOnce(&mut Wallet) -> Result<(), StoreError>,
    {
        let lock = self.user_lock(user_id).await;
        let _guard = lock.lock().await;

        let mut wallet = self.wallet_snapshot(user_id);
        op(&mut wallet)?;
        self.store_wallet(wallet.clone());
        Ok(wallet)
    }
}

fn holding_key(user_id: &UserId, symbol_id: &SymbolId) -> HoldingKey {
    (user_id.to_string(), symbol_id.to_string())
}

#[async_trait]
impl OrderRepository for InMemoryStore {
    async fn save(&self, order: &Order) -> Result<(), OrderRepositoryError> {
        let mut orders = self.orders.write().unwrap();
        if orders.contains_key(order.id().as_str()) {
            return Err(OrderRepositoryError::Duplicate(order.id().clone()));
        }
        orders.insert(order.id().to_string(), order.clone());
        Ok(())
    }

    async fn update(&self, order: &Order) -> Result<(), OrderRepositoryError> {
        let mut orders = self.orders.write().unwrap();
        let Some(stored) = orders.get(order.id().as_str()) else {
            return Err(OrderRepositoryError::NotFound(order.id().clone()));
        };
        // A caller holding a stale copy must never overwrite a terminal
        // status; the cancel/fill race resolves here.
        if stored.status().is_terminal() {
            return Err(OrderRepositoryError::Superseded {
                id: order.id().clone(),
                current: stored.status(),
            });
        }
        orders.insert(order.id().to_string(), order.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &crate::domain::shared::OrderId) -> Result<Option<Order>, OrderRepositoryError> {
        Ok(self.orders.read().unwrap().get(id.as_str()).cloned())
    }

    async fn find_by_user(
        &self,
        user_id: &UserId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, OrderRepositoryError> {
        let orders = self.orders.read().unwrap();
        let mut result: Vec<Order> = orders
            .values()
            .filter(|o| o.user_id() == user_id)
            .filter(|o| status.is_none_or(|s| o.status() == s))
            .cloned()
            .collect();
        result.sort_by(|a, b| b.placed_at().cmp(&a.placed_at()));
        Ok(result)
    }

    async fn find_pending_for_symbol(
        &self,
        symbol_id: &SymbolId,
    ) -> Result<Vec<Order>, OrderRepositoryError> {
        let orders = self.orders.read().unwrap();
        let mut result: Vec<Order> = orders
            .values()
            .filter(|o| o.symbol_id() == symbol_id && o.status() == OrderStatus::Pending)
            .cloned()
            .collect();
        result.sort_by(|a, b| a.placed_at().cmp(&b.placed_at()));
        Ok(result)
    }
}

#[async_trait]
impl WalletRepository for InMemoryStore {
    async fn get_or_create(&self, user_id: &UserId) -> Result<Wallet, StoreError> {
        self.with_wallet(user_id, |_| Ok(())).await
    }

    async fn deposit(&self, user_id: &UserId, amount: Money) -> Result<Wallet, StoreError> {
        self.with_wallet(user_id, |w| {
            w.deposit(amount, Timestamp::now()).map_err(StoreError::from)
        })
        .await
    }

    async fn withdraw(&self, user_id: &UserId, amount: Money) -> Result<Wallet, StoreError> {
        self.with_wallet(user_id, |w| {
            w.withdraw(amount, Timestamp::now()).map_err(StoreError::from)
        })
        .await
    }

    async fn lock_funds(&self, user_id: &UserId, amount: Money) -> Result<Wallet, StoreError> {
        self.with_wallet(user_id, |w| {
            w.lock(amount, Timestamp::now()).map_err(StoreError::from)
        })
        .await
    }

    async fn unlock_funds(&self, user_id: &UserId, amount: Money) -> Result<Wallet, StoreError> {
        self.with_wallet(user_id, |w| {
            w.unlock(amount, Timestamp::now());
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl HoldingRepository for InMemoryStore {
    async fn find(
        &self,
        user_id: &UserId,
        symbol_id: &SymbolId,
    ) -> Result<Option<Holding>, StoreError> {
        Ok(self
            .holdings
            .read()
            .unwrap()
            .get(&holding_key(user_id, symbol_id))
            .cloned())
    }

    async fn find_by_user(&self, user_id: &UserId) -> Result<Vec<Holding>, StoreError> {
        let holdings = self.holdings.read().unwrap();
        let mut result: Vec<Holding> = holdings
            .values()
            .filter(|h| h.user_id() == user_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| a.symbol_id().as_str().cmp(b.symbol_id().as_str()));
        Ok(result)
    }

    async fn reserve_shares(
        &self,
        user_id: &UserId,
        symbol_id: &SymbolId,
        shares: Quantity,
    ) -> Result<Holding, StoreError> {
        let lock = self.user_lock(user_id).await;
        let _guard = lock.lock().await;

        let mut holdings = self.holdings.write().unwrap();
        let holding = holdings
            .get_mut(&holding_key(user_id, symbol_id))
            .ok_or_else(|| StoreError::HoldingNotFound {
                user: user_id.clone(),
                symbol: symbol_id.clone(),
            })?;
        holding.reserve(shares, Timestamp::now())?;
        Ok(holding.clone())
    }

    async fn release_shares(
        &self,
        user_id: &UserId,
        symbol_id: &SymbolId,
        shares: Quantity,
    ) -> Result<(), StoreError> {
        let lock = self.user_lock(user_id).await;
        let _guard = lock.lock().await;

        if let Some(holding) = self
            .holdings
            .write()
            .unwrap()
            .get_mut(&holding_key(user_id, symbol_id))
        {
            holding.release(shares, Timestamp::now());
        }
        Ok(())
    }
}

#[async_trait]
impl TradeRepository for InMemoryStore {
    async fn find_by_id(&self, id: &TradeId) -> Result<Option<Trade>, StoreError> {
        Ok(self.trades.read().unwrap().get(id.as_str()).cloned())
    }

    async fn find_by_user(&self, user_id: &UserId) -> Result<Vec<Trade>, StoreError> {
        let trades = self.trades.read().unwrap();
        let mut result: Vec<Trade> = trades
            .values()
            .filter(|t| t.user_id() == user_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.executed_at().cmp(&a.executed_at()));
        Ok(result)
    }
}

#[async_trait]
impl LedgerRepository for InMemoryStore {
    async fn append(&self, entry: LedgerEntry) -> Result<(), StoreError> {
        self.ledger.write().unwrap().push(entry);
        Ok(())
    }

    async fn find_by_user(&self, user_id: &UserId) -> Result<Vec<LedgerEntry>, StoreError> {
        let ledger = self.ledger.read().unwrap();
        let mut result: Vec<LedgerEntry> = ledger
            .iter()
            .filter(|e| e.user_id() == user_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(result)
    }
}

#[async_trait]
impl SettlementStore for InMemoryStore {
    async fn apply_settlement(
        &self,
        trade: &Trade,
        reserved_funds: Money,
    ) -> Result<LedgerEntry, StoreError> {
        let lock = self.user_lock(trade.user_id()).await;
        let _guard = lock.lock().await;

        if self
            .settled_trades
            .read()
            .unwrap()
            .contains(trade.id().as_str())
        {
            return Err(StoreError::DuplicateTrade(trade.id().clone()));
        }

        let input = SettlementInput {
            wallet: self.wallet_snapshot(trade.user_id()),
            holding: self
                .holdings
                .read()
                .unwrap()
                .get(&holding_key(trade.user_id(), trade.symbol_id()))
                .cloned(),
            reserved_funds,
        };
        let outcome = settle_trade(trade, input, Timestamp::now())?;

        // Commit everything while still holding the user lock.
        self.store_wallet(outcome.wallet);
        match outcome.holding {
            HoldingChange::Upsert(holding) => {
                self.holdings.write().unwrap().insert(
                    holding_key(holding.user_id(), holding.symbol_id()),
                    holding,
                );
            }
            HoldingChange::Remove(symbol_id) => {
                self.holdings
                    .write()
                    .unwrap()
                    .remove(&holding_key(trade.user_id(), &symbol_id));
            }
        }
        self.trades
            .write()
            .unwrap()
            .insert(trade.id().to_string(), trade.clone());
        self.ledger
            .write()
            .unwrap()
            .push(outcome.ledger_entry.clone());
        self.settled_trades
            .write()
            .unwrap()
            .insert(trade.id().to_string());

        Ok(outcome.ledger_entry)
    }
}
