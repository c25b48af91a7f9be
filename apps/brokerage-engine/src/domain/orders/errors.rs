//! Order lifecycle errors.

use thiserror::Error;

use super::value_objects::OrderStatus;

/// Errors that can occur in the order lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// Invalid order parameters.
    #[error("invalid {field}: {message}")]
    InvalidParameters {
        /// Field with invalid value.
        field: String,
        /// Error message.
        message: String,
    },

    /// Illegal status transition attempted.
    #[error("cannot transition order from {from} to {to}")]
    InvalidStateTransition {
        /// Current order status.
        from: OrderStatus,
        /// Attempted status.
        to: OrderStatus,
    },

    /// Order cannot be cancelled in its current state.
    #[error("cannot cancel order with status {status}")]
    CannotCancel {
        /// Current status.
        status: OrderStatus,
    },
}
