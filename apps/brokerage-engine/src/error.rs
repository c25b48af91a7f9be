//! Application-level error taxonomy.
//!
//! Every failure maps to an [`ErrorCode`] that fixes two decisions at once:
//! what an API caller sees and whether a consumer should retry the delivery.

use serde::Serialize;
use thiserror::Error;

use crate::application::ports::{
    EventBusError, PriceSourceError, ReferenceDataError,
};
use crate::domain::orders::{OrderError, OrderRepositoryError};
use crate::domain::shared::{SymbolId, TradeId};
use crate::domain::trading::{HoldingError, StoreError, WalletError};

/// Stable machine-readable failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Malformed or missing request parameters.
    Validation,
    /// Not enough unreserved cash.
    InsufficientFunds,
    /// Not enough unreserved shares.
    InsufficientHoldings,
    /// Operation not valid in the entity's current state.
    InvalidState,
    /// The referenced entity does not exist.
    NotFound,
    /// The operation already happened; state unchanged.
    IdempotentNoOp,
    /// Infrastructure hiccup; safe to retry.
    TransientInfra,
}

/// Top-level application error.
#[derive(Debug, Error)]
pub enum BrokerageError {
    /// Request validation failed.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Order lifecycle rule rejected the operation.
    #[error(transparent)]
    Order(#[from] OrderError),

    /// Wallet rule rejected the operation.
    #[error(transparent)]
    Wallet(#[from] WalletError),

    /// Holding rule rejected the operation.
    #[error(transparent)]
    Holding(#[from] HoldingError),

    /// Settlement rejected the trade.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The referenced entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The trade was already settled.
    #[error("trade already settled: {0}")]
    AlreadySettled(TradeId),

    /// No market price is currently available for the symbol.
    #[error("no market price available for {0}")]
    PriceUnavailable(SymbolId),

    /// Retryable infrastructure failure.
    #[error("transient failure: {0}")]
    Transient(String),
}

impl BrokerageError {
    /// The stable category for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Validation(_) => ErrorCode::Validation,
            Self::Order(OrderError::InvalidParameters { .. }) => ErrorCode::Validation,
            Self::Order(_) => ErrorCode::InvalidState,
            Self::Wallet(WalletError::InsufficientFunds { .. }) => ErrorCode::InsufficientFunds,
            Self::Wallet(WalletError::NonPositiveAmount(_)) => ErrorCode::Validation,
            Self::Holding(HoldingError::InsufficientHoldings { .. }) => {
                ErrorCode::InsufficientHoldings
            }
            Self::Holding(HoldingError::NonPositiveQuantity) => ErrorCode::Validation,
            Self::InvalidState(_) => ErrorCode::InvalidState,
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::AlreadySettled(_) => ErrorCode::IdempotentNoOp,
            Self::PriceUnavailable(_) | Self::Transient(_) => ErrorCode::TransientInfra,
        }
    }

    /// Whether a consumer should redeliver after this error.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self.code(), ErrorCode::TransientInfra)
    }
}

impl From<StoreError> for BrokerageError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Wallet(e) => Self::Wallet(e),
            StoreError::Holding(e) => Self::Holding(e),
            StoreError::Settlement(e) => Self::InvalidState(e.to_string()),
            StoreError::HoldingNotFound { user, symbol } => {
                Self::NotFound(format!("holding for user {user} in {symbol}"))
            }
            StoreError::DuplicateTrade(id) => Self::AlreadySettled(id),
            StoreError::Unavailable(msg) => Self::Transient(msg),
        }
    }
}

impl From<OrderRepositoryError> for BrokerageError {
    fn from(err: OrderRepositoryError) -> Self {
        match err {
            OrderRepositoryError::NotFound(id) => Self::NotFound(format!("order {id}")),
            OrderRepositoryError::Duplicate(id) => {
                Self::InvalidState(format!("order already exists: {id}"))
            }
            OrderRepositoryError::Superseded { id, current } => {
                Self::InvalidState(format!("order {id} is already {current}"))
            }
            OrderRepositoryError::Unavailable(msg) => Self::Transient(msg),
        }
    }
}

impl From<PriceSourceError> for BrokerageError {
    fn from(err: PriceSourceError) -> Self {
        Self::Transient(err.to_string())
    }
}

impl From<ReferenceDataError> for BrokerageError {
    fn from(err: ReferenceDataError) -> Self {
        Self::Transient(err.to_string())
    }
}

impl From<EventBusError> for BrokerageError {
    fn from(err: EventBusError) -> Self {
        Self::Transient(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::shared::{Money, Quantity};
    use rust_decimal_macros::dec;

    #[test]
    fn insufficient_funds_maps_to_its_code() {
        let err = BrokerageError::Wallet(WalletError::InsufficientFunds {
            required: Money::new(dec!(100)),
            available: Money::new(dec!(50)),
        });
        assert_eq!(err.code(), ErrorCode::InsufficientFunds);
        assert!(!err.is_retryable());
    }

    #[test]
    fn insufficient_holdings_maps_to_its_code() {
        let err = BrokerageError::Holding(HoldingError::InsufficientHoldings {
            required: Quantity::new(5),
            available: Quantity::new(3),
        });
        assert_eq!(err.code(), ErrorCode::InsufficientHoldings);
    }

    #[test]
    fn only_transient_errors_are_retryable() {
        assert!(BrokerageError::Transient("store down".into()).is_retryable());
        assert!(BrokerageError::PriceUnavailable(SymbolId::new("sym-x")).is_retryable());
        assert!(!BrokerageError::Validation("bad".into()).is_retryable());
        assert!(!BrokerageError::AlreadySettled(TradeId::generate()).is_retryable());
    }

    #[test]
    fn duplicate_trade_is_an_idempotent_no_op() {
        let err: BrokerageError = StoreError::DuplicateTrade(TradeId::generate()).into();
        assert_eq!(err.code(), ErrorCode::IdempotentNoOp);
    }

    #[test]
    fn error_code_serializes_screaming_snake() {
        assert_eq!(
            serde_json::to_string(&ErrorCode::InsufficientFunds).unwrap(),
            "\"INSUFFICIENT_FUNDS\""
        );
    }
}
