//! API error envelope and status mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::error::{BrokerageError, ErrorCode};

/// JSON body returned for every failed request.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Stable failure category.
    pub code: ErrorCode,
    /// Human-readable detail.
    pub message: String,
}

/// Wrapper turning application errors into HTTP responses.
#[derive(Debug)]
pub struct ApiError(pub BrokerageError);

impl From<BrokerageError> for ApiError {
    fn from(err: BrokerageError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.0.code();
        let status = match code {
            ErrorCode::Validation => StatusCode::BAD_REQUEST,
            ErrorCode::InsufficientFunds | ErrorCode::InsufficientHoldings => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ErrorCode::InvalidState | ErrorCode::IdempotentNoOp => StatusCode::CONFLICT,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::TransientInfra => StatusCode::SERVICE_UNAVAILABLE,
        };
        let body = ErrorBody {
            code,
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Health probe payload.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always "healthy" while the process serves requests.
    pub status: String,
    /// Crate version.
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::shared::SymbolId;
    use crate::domain::trading::WalletError;
    use crate::domain::shared::Money;
    use rust_decimal_macros::dec;

    fn status_of(err: BrokerageError) -> StatusCode {
        ApiError(err).into_response().status()
    }

    #[test]
    fn status_mapping() {
        assert_eq!(
            status_of(BrokerageError::Validation("bad".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(BrokerageError::Wallet(WalletError::InsufficientFunds {
                required: Money::new(dec!(10)),
                available: Money::new(dec!(5)),
            })),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(BrokerageError::NotFound("order x".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(BrokerageError::PriceUnavailable(SymbolId::new("sym-x"))),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
