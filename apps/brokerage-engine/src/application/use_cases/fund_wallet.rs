//! Wallet funding: deposits and withdrawals outside the trade pipeline.
//!
//! The payment gateway itself is simulated; every movement still produces
//! an append-only ledger entry with a generated payment reference.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::application::dto::{WalletMovementRequest, WalletView};
use crate::application::ports::ReferenceDataPort;
use crate::domain::shared::{Money, Timestamp, UserId};
use crate::domain::trading::{LedgerEntry, LedgerEntryType, LedgerRepository, WalletRepository};
use crate::error::BrokerageError;

/// Moves cash in and out of a user's wallet.
pub struct FundWalletUseCase<W, L, R> {
    wallets: Arc<W>,
    ledger: Arc<L>,
    reference: Arc<R>,
}

impl<W, L, R> FundWalletUseCase<W, L, R>
where
    W: WalletRepository,
    L: LedgerRepository,
    R: ReferenceDataPort,
{
    /// Wire the use case to its ports.
    pub const fn new(wallets: Arc<W>, ledger: Arc<L>, reference: Arc<R>) -> Self {
        Self {
            wallets,
            ledger,
            reference,
        }
    }

    /// Credit the wallet.
    ///
    /// # Errors
    ///
    /// Returns error if the user is inactive or the amount is not positive.
    pub async fn deposit(
        &self,
        user_id: &UserId,
        request: WalletMovementRequest,
    ) -> Result<WalletView, BrokerageError> {
        self.require_active(user_id).await?;
        let amount = Money::new(request.amount);
        let wallet = self.wallets.deposit(user_id, amount).await?;
        self.record(user_id, LedgerEntryType::Deposit, amount, request.method)
            .await?;
        info!(user_id = %user_id, amount = %amount, "deposit");
        Ok(WalletView::from(&wallet))
    }

    /// Debit unreserved cash.
    ///
    /// # Errors
    ///
    /// Returns error if the user is inactive, the amount is not positive,
    /// or it exceeds the unreserved balance.
    pub async fn withdraw(
        &self,
        user_id: &UserId,
        request: WalletMovementRequest,
    ) -> Result<WalletView, BrokerageError> {
        self.require_active(user_id).await?;
        let amount = Money::new(request.amount);
        let wallet = self.wallets.withdraw(user_id, amount).await?;
        self.record(user_id, LedgerEntryType::Withdrawal, amount, request.method)
            .await?;
        info!(user_id = %user_id, amount = %amount, "withdrawal");
        Ok(WalletView::from(&wallet))
    }

    async fn require_active(&self, user_id: &UserId) -> Result<(), BrokerageError> {
        if self.reference.is_user_active(user_id).await? {
            Ok(())
        } else {
            Err(BrokerageError::Validation(format!(
                "user {user_id} is not active"
            )))
        }
    }

    async fn record(
        &self,
        user_id: &UserId,
        entry_type: LedgerEntryType,
        amount: Money,
        method: Option<String>,
    ) -> Result<(), BrokerageError> {
        let entry = LedgerEntry::for_cash_movement(
            user_id.clone(),
            entry_type,
            amount,
            method,
            format!("pay-{}", Uuid::new_v4()),
            Timestamp::now(),
        );
        self.ledger.append(entry).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::persistence::InMemoryStore;
    use crate::infrastructure::reference::InMemoryReferenceData;
    use rust_decimal_macros::dec;

    fn use_case(
        store: &Arc<InMemoryStore>,
    ) -> FundWalletUseCase<InMemoryStore, InMemoryStore, InMemoryReferenceData> {
        FundWalletUseCase::new(
            Arc::clone(store),
            Arc::clone(store),
            Arc::new(InMemoryReferenceData::default_universe()),
        )
    }

    fn movement(amount: rust_decimal::Decimal) -> WalletMovementRequest {
        WalletMovementRequest {
            amount,
            method: Some("BANK_TRANSFER".into()),
        }
    }

    #[tokio::test]
    async fn deposit_then_withdraw() {
        let store = Arc::new(InMemoryStore::new());
        let uc = use_case(&store);
        let user = UserId::new("user-1");

        let view = uc.deposit(&user, movement(dec!(500))).await.unwrap();
        assert_eq!(view.balance, dec!(500));

        let view = uc.withdraw(&user, movement(dec!(200))).await.unwrap();
        assert_eq!(view.balance, dec!(300));
        assert_eq!(view.available, dec!(300));

        let entries = LedgerRepository::find_by_user(store.as_ref(), &user)
            .await
            .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].entry_type(), LedgerEntryType::Withdrawal);
        assert_eq!(entries[1].entry_type(), LedgerEntryType::Deposit);
        assert_eq!(entries[1].payment_method(), Some("BANK_TRANSFER"));
    }

    #[tokio::test]
    async fn withdrawal_cannot_exceed_available() {
        let store = Arc::new(InMemoryStore::new());
        let uc = use_case(&store);
        let user = UserId::new("user-1");

        uc.deposit(&user, movement(dec!(100))).await.unwrap();
        let result = uc.withdraw(&user, movement(dec!(150))).await;
        assert!(matches!(result, Err(BrokerageError::Wallet(_))));
    }

    #[tokio::test]
    async fn non_positive_deposit_rejected() {
        let store = Arc::new(InMemoryStore::new());
        let uc = use_case(&store);

        let result = uc.deposit(&UserId::new("user-1"), movement(dec!(0))).await;
        assert!(matches!(result, Err(BrokerageError::Wallet(_))));
    }
}
