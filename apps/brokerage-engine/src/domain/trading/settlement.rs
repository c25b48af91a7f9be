//! Settlement: the pure state transition applied when a trade is booked.
//!
//! Given a trade and the owner's current wallet and holding, compute the
//! post-settlement wallet, the holding change and the ledger entry. The
//! function is pure; the store applies the outcome atomically under the
//! user's lock.

use thiserror::Error;

use super::holding::Holding;
use super::ledger::{LedgerEntry, LedgerEntryType};
use super::trade::Trade;
use super::wallet::Wallet;
use crate::domain::shared::{Money, SymbolId, Timestamp};

/// Settlement failures.
#[derive(Debug, Error)]
pub enum SettlementError {
    /// A sell settled against a user with no position in the symbol.
    #[error("no holding in {symbol} to settle sell trade {trade}")]
    MissingHolding {
        /// Symbol of the sell trade.
        symbol: SymbolId,
        /// The trade being settled.
        trade: String,
    },

    /// A buy's actual cost exceeded the spendable cash once its reservation
    /// was released.
    #[error("settling buy trade {trade}: {source}")]
    InsufficientFunds {
        /// The trade being settled.
        trade: String,
        /// The wallet rule that refused the debit.
        source: super::wallet::WalletError,
    },
}

/// State fed into settlement.
#[derive(Debug, Clone)]
pub struct SettlementInput {
    /// The user's wallet as currently persisted.
    pub wallet: Wallet,
    /// The user's holding in the traded symbol, if any.
    pub holding: Option<Holding>,
    /// Funds locked for this order at intake (zero for sells).
    pub reserved_funds: Money,
}

/// How the holding changed, for the store to persist.
#[derive(Debug, Clone)]
pub enum HoldingChange {
    /// Insert or replace the holding.
    Upsert(Holding),
    /// The position reached zero shares; remove it.
    Remove(SymbolId),
}

/// Everything settlement produced, to be persisted as one unit.
#[derive(Debug, Clone)]
pub struct SettlementOutcome {
    /// Wallet after the cash movement.
    pub wallet: Wallet,
    /// Holding after the share movement.
    pub holding: HoldingChange,
    /// Cash ledger record of the movement.
    pub ledger_entry: LedgerEntry,
}

/// Settle `trade` against the given wallet and holding.
///
/// Cost basis tracks notional only; fees hit the wallet but not the
/// holding's average price.
///
/// # Errors
///
/// Returns error if a sell trade has no holding to draw shares from, or a
/// buy trade costs more than the spendable cash once its reservation is
/// released.
pub fn settle_trade(
    trade: &Trade,
    input: SettlementInput,
    now: Timestamp,
) -> Result<SettlementOutcome, SettlementError> {
    let SettlementInput {
        mut wallet,
        holding,
        reserved_funds,
    } = input;

    let (holding, entry_type) = if trade.side().is_buy() {
        let cost = trade.trade_value() + trade.fees();
        wallet
            .settle_buy(reserved_funds, cost, now)
            .map_err(|source| SettlementError::InsufficientFunds {
                trade: trade.id().to_string(),
                source,
            })?;

        let mut holding = holding.unwrap_or_else(|| {
            Holding::open(trade.user_id().clone(), trade.symbol_id().clone(), now)
        });
        holding.apply_buy(trade.quantity(), trade.trade_value(), now);

        (holding, LedgerEntryType::StockPurchase)
    } else {
        let mut holding = holding.ok_or_else(|| SettlementError::MissingHolding {
            symbol: trade.symbol_id().clone(),
            trade: trade.id().to_string(),
        })?;
        holding.apply_sell(trade.quantity(), now);

        let proceeds = trade.trade_value() - trade.fees();
        wallet.settle_sell(proceeds, now);

        (holding, LedgerEntryType::StockSale)
    };

    let ledger_entry = LedgerEntry::for_trade(
        trade.user_id().clone(),
        trade.id(),
        entry_type,
        trade.trade_value(),
        trade.fees(),
        format!(
            "{} {} {} @ {}",
            trade.side(),
            trade.quantity(),
            trade.symbol_id(),
            trade.price()
        ),
        now,
    );

    let holding = if holding.is_empty() {
        HoldingChange::Remove(trade.symbol_id().clone())
    } else {
        HoldingChange::Upsert(holding)
    };

    Ok(SettlementOutcome {
        wallet,
        holding,
        ledger_entry,
    })
}
