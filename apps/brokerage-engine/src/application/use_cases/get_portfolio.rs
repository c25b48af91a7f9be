//! Portfolio read model: wallet plus positions enriched with live prices.

use std::sync::Arc;

use rust_decimal::{Decimal, RoundingStrategy};

use crate::application::dto::{PortfolioView, PositionView, WalletView};
use crate::application::ports::{PriceSourcePort, ReferenceDataPort};
use crate::domain::shared::UserId;
use crate::domain::trading::{HoldingRepository, WalletRepository};
use crate::error::BrokerageError;

/// Assembles a user's portfolio view.
pub struct GetPortfolioUseCase<W, H, P, R> {
    wallets: Arc<W>,
    holdings: Arc<H>,
    prices: Arc<P>,
    reference: Arc<R>,
}

impl<W, H, P, R> GetPortfolioUseCase<W, H, P, R>
where
    W: WalletRepository,
    H: HoldingRepository,
    P: PriceSourcePort,
    R: ReferenceDataPort,
{
    /// Wire the use case to its ports.
    pub const fn new(wallets: Arc<W>, holdings: Arc<H>, prices: Arc<P>, reference: Arc<R>) -> Self {
        Self {
            wallets,
            holdings,
            prices,
            reference,
        }
    }

    /// Build the portfolio for `user_id`.
    ///
    /// Positions with no current quote still appear; their market fields are
    /// simply absent and they contribute nothing to the totals beyond their
    /// cost basis. A user who never traded gets an empty portfolio, not an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns error only on store, reference data or price source failure.
    pub async fn execute(&self, user_id: &UserId) -> Result<PortfolioView, BrokerageError> {
        let wallet = self.wallets.get_or_create(user_id).await?;
        let holdings = self.holdings.find_by_user(user_id).await?;

        let mut positions = Vec::with_capacity(holdings.len());
        let mut total_invested = Decimal::ZERO;
        let mut total_market_value = Decimal::ZERO;
        let mut total_pnl = Decimal::ZERO;
        for holding in &holdings {
            let price = self.prices.current_price(holding.symbol_id()).await?;
            let company_name = self
                .reference
                .find_symbol(holding.symbol_id())
                .await?
                .map(|s| s.name);
            let view = PositionView::from_holding(holding, company_name, price);
            total_invested += view.total_cost;
            if let Some(value) = view.market_value {
                total_market_value += value;
            }
            if let Some(pnl) = view.unrealized_pnl {
                total_pnl += pnl;
            }
            positions.push(view);
        }

        let pnl_percent = if total_invested.is_zero() {
            Decimal::ZERO
        } else {
            (total_pnl / total_invested * Decimal::ONE_HUNDRED)
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        };

        Ok(PortfolioView {
            wallet: WalletView::from(&wallet),
            positions,
            total_invested,
            total_market_value,
            total_pnl,
            pnl_percent,
        })
    }
}
