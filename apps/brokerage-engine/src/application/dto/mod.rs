//! Request and response shapes for the application layer.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::orders::{Order, OrderSide, OrderStatus, OrderType};
use crate::domain::shared::{Money, Quantity};
use crate::domain::trading::{Holding, LedgerEntry, LedgerEntryStatus, LedgerEntryType, Trade, Wallet};

/// Request to place an order.
#[derive(Debug, Clone, Deserialize)]
pub struct PlaceOrderRequest {
    /// Symbol to trade.
    pub symbol_id: String,
    /// Order side.
    pub side: OrderSide,
    /// Order type.
    pub order_type: OrderType,
    /// Whole shares to trade.
    pub quantity: u64,
    /// Limit price, required for LIMIT and STOP_LIMIT.
    #[serde(default)]
    pub limit_price: Option<Decimal>,
    /// Stop price, required for STOP_LOSS and STOP_LIMIT.
    #[serde(default)]
    pub stop_price: Option<Decimal>,
}

/// An order as returned to API callers.
#[derive(Debug, Clone, Serialize)]
pub struct OrderView {
    /// Order ID.
    pub id: String,
    /// Traded symbol.
    pub symbol_id: String,
    /// Order side.
    pub side: OrderSide,
    /// Order type.
    pub order_type: OrderType,
    /// Current status.
    pub status: OrderStatus,
    /// Requested shares.
    pub quantity: u64,
    /// Limit price, if any.
    pub limit_price: Option<Decimal>,
    /// Stop price, if any.
    pub stop_price: Option<Decimal>,
    /// Fill price once filled.
    pub filled_price: Option<Decimal>,
    /// Estimated notional at placement.
    pub order_value: Decimal,
    /// Commission estimated at placement.
    pub fees: Decimal,
    /// Placement time, RFC 3339.
    pub placed_at: String,
    /// Expiry time, RFC 3339.
    pub expires_at: String,
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id().to_string(),
            symbol_id: order.symbol_id().to_string(),
            side: order.side(),
            order_type: order.order_type(),
            status: order.status(),
            quantity: order.quantity().shares(),
            limit_price: order.limit_price().map(|p| p.amount()),
            stop_price: order.stop_price().map(|p| p.amount()),
            filled_price: order.filled_price().map(|p| p.amount()),
            order_value: order.order_value().amount(),
            fees: order.fees().amount(),
            placed_at: order.placed_at().to_rfc3339(),
            expires_at: order.expires_at().to_rfc3339(),
        }
    }
}

/// Request to move cash in or out of the wallet.
#[derive(Debug, Clone, Deserialize)]
pub struct WalletMovementRequest {
    /// Amount to move, positive.
    pub amount: Decimal,
    /// Payment method, e.g. BANK_TRANSFER. Informational only.
    #[serde(default)]
    pub method: Option<String>,
}

/// Wallet state as returned to API callers.
#[derive(Debug, Clone, Serialize)]
pub struct WalletView {
    /// Denomination currency.
    pub currency: String,
    /// Total cash.
    pub balance: Decimal,
    /// Cash reserved for open buy orders.
    pub locked_balance: Decimal,
    /// Spendable cash.
    pub available: Decimal,
}

impl From<&Wallet> for WalletView {
    fn from(wallet: &Wallet) -> Self {
        Self {
            currency: wallet.currency().to_string(),
            balance: wallet.balance().amount(),
            locked_balance: wallet.locked_balance().amount(),
            available: wallet.available().amount(),
        }
    }
}

/// One position inside a portfolio view.
#[derive(Debug, Clone, Serialize)]
pub struct PositionView {
    /// Symbol held.
    pub symbol_id: String,
    /// Company name from reference data, when known.
    pub company_name: Option<String>,
    /// Total shares.
    pub quantity: u64,
    /// Shares reserved for open sell orders.
    pub reserved_quantity: u64,
    /// Average acquisition price.
    pub average_price: Decimal,
    /// Cost basis.
    pub total_cost: Decimal,
    /// Current market price, if quoted.
    pub current_price: Option<Decimal>,
    /// Market value at the current price, if quoted.
    pub market_value: Option<Decimal>,
    /// Unrealized gain or loss, if quoted.
    pub unrealized_pnl: Option<Decimal>,
    /// Unrealized gain or loss in percent, if quoted.
    pub unrealized_pnl_percent: Option<Decimal>,
}

impl PositionView {
    /// Build a view of `holding`, enriched with `price` when available.
    #[must_use]
    pub fn from_holding(
        holding: &Holding,
        company_name: Option<String>,
        price: Option<Money>,
    ) -> Self {
        Self {
            symbol_id: holding.symbol_id().to_string(),
            company_name,
            quantity: holding.quantity().shares(),
            reserved_quantity: holding.reserved_quantity().shares(),
            average_price: holding.average_price().amount(),
            total_cost: holding.total_cost().amount(),
            current_price: price.map(|p| p.amount()),
            market_value: price.map(|p| holding.market_value(p).amount()),
            unrealized_pnl: price.map(|p| holding.unrealized_pnl(p).amount()),
            unrealized_pnl_percent: price.map(|p| holding.pnl_percent(p)),
        }
    }
}

/// A user's full portfolio.
#[derive(Debug, Clone, Serialize)]
pub struct PortfolioView {
    /// Cash account.
    pub wallet: WalletView,
    /// Open positions.
    pub positions: Vec<PositionView>,
    /// Sum of position cost bases.
    pub total_invested: Decimal,
    /// Sum of position market values, where quoted.
    pub total_market_value: Decimal,
    /// Total unrealized gain or loss over the quoted positions.
    pub total_pnl: Decimal,
    /// Total gain or loss in percent of the invested amount; 0 when nothing
    /// is invested.
    pub pnl_percent: Decimal,
}

/// A trade as returned to API callers.
#[derive(Debug, Clone, Serialize)]
pub struct TradeView {
    /// Trade ID.
    pub id: String,
    /// Originating order.
    pub order_id: String,
    /// Traded symbol.
    pub symbol_id: String,
    /// Trade side.
    pub side: OrderSide,
    /// Filled shares.
    pub quantity: u64,
    /// Execution price.
    pub price: Decimal,
    /// Notional value.
    pub trade_value: Decimal,
    /// Commission.
    pub fees: Decimal,
    /// Execution time, RFC 3339.
    pub executed_at: String,
}

impl From<&Trade> for TradeView {
    fn from(trade: &Trade) -> Self {
        Self {
            id: trade.id().to_string(),
            order_id: trade.order_id().to_string(),
            symbol_id: trade.symbol_id().to_string(),
            side: trade.side(),
            quantity: trade.quantity().shares(),
            price: trade.price().amount(),
            trade_value: trade.trade_value().amount(),
            fees: trade.fees().amount(),
            executed_at: trade.executed_at().to_rfc3339(),
        }
    }
}

/// A ledger entry as returned to API callers.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerEntryView {
    /// Entry ID.
    pub id: String,
    /// What the entry records.
    pub entry_type: LedgerEntryType,
    /// Moved amount, positive.
    pub amount: Decimal,
    /// Fees charged alongside the movement.
    pub fees: Decimal,
    /// Processing status.
    pub status: LedgerEntryStatus,
    /// Payment method, for gateway-driven movements.
    pub payment_method: Option<String>,
    /// Human-readable description.
    pub description: String,
    /// Trade id or payment reference.
    pub reference_id: Option<String>,
    /// Record time, RFC 3339.
    pub created_at: String,
}

impl From<&LedgerEntry> for LedgerEntryView {
    fn from(entry: &LedgerEntry) -> Self {
        Self {
            id: entry.id().to_string(),
            entry_type: entry.entry_type(),
            amount: entry.amount().amount(),
            fees: entry.fees().amount(),
            status: entry.status(),
            payment_method: entry.payment_method().map(ToString::to_string),
            description: entry.description().to_string(),
            reference_id: entry.reference_id().map(ToString::to_string),
            created_at: entry.created_at().to_rfc3339(),
        }
    }
}

impl PlaceOrderRequest {
    /// Requested quantity as domain shares.
    #[must_use]
    pub const fn shares(&self) -> Quantity {
        Quantity::new(self.quantity)
    }
}
