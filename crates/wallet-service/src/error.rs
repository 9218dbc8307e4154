//! API error types and responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use wallet_core::{Decimal, WalletError};

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Bad request - malformed input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The amount is not a positive amount of money.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Insufficient funds.
    #[error("insufficient funds: balance={balance}, requested={requested}")]
    InsufficientFunds {
        /// Current balance.
        balance: Decimal,
        /// Requested amount.
        requested: Decimal,
    },

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone(), None),
            Self::InvalidAmount(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_amount", msg.clone(), None)
            }
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone(), None),
            Self::InsufficientFunds { balance, requested } => (
                StatusCode::BAD_REQUEST,
                "insufficient_funds",
                self.to_string(),
                Some(serde_json::json!({
                    "balance": balance,
                    "requested": requested
                })),
            ),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<WalletError> for ApiError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::InvalidAmount { amount } => {
                Self::InvalidAmount(format!(
                    "amount must be positive with at most two decimals, got {amount}"
                ))
            }
            WalletError::WalletNotFound { user_id } => {
                Self::NotFound(format!("wallet not found for user {user_id}"))
            }
            WalletError::InsufficientFunds { balance, requested } => {
                Self::InsufficientFunds { balance, requested }
            }
            WalletError::Storage(msg) => Self::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wallet_core::UserId;

    #[test]
    fn wallet_errors_map_to_status_codes() {
        let cases = [
            (
                WalletError::InvalidAmount { amount: Decimal::ZERO },
                StatusCode::BAD_REQUEST,
            ),
            (
                WalletError::WalletNotFound {
                    user_id: UserId::generate(),
                },
                StatusCode::NOT_FOUND,
            ),
            (
                WalletError::InsufficientFunds {
                    balance: Decimal::ONE,
                    requested: Decimal::TWO,
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                WalletError::Storage("connection reset".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            let response = ApiError::from(err).into_response();
            assert_eq!(response.status(), status);
        }
    }
}
