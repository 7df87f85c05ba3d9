//! Webhook error types with HTTP status code mapping.
//!
//! [`LudinhoError`] is the central error type of the crate. Business
//! outcomes normally travel to the customer as chat messages, so only a
//! handful of variants ever reach the HTTP layer; those render the
//! structured JSON error body below.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 1100,
///     "message": "invalid webhook signature",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Crate-wide error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category        | HTTP Status                  |
/// |-----------|-----------------|------------------------------|
/// | 1000–1999 | Validation/Auth | 400 Bad Request / 401        |
/// | 2000–2999 | State/Not Found | 404 Not Found                |
/// | 3000–3999 | Server          | 500 / 502                    |
/// | 4000–4999 | Ledger rules    | 422 Unprocessable Entity     |
#[derive(Debug, thiserror::Error)]
pub enum LudinhoError {
    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Webhook signature missing or wrong.
    #[error("invalid webhook signature")]
    Unauthorized,

    /// A referenced record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The item was already redeemed or is otherwise not convertible.
    #[error("item {0} is not eligible for conversion")]
    ItemNotEligible(uuid::Uuid),

    /// A debit would take the client's balance below zero.
    #[error("insufficient balance: {balance:.2} available, {requested:.2} requested")]
    InsufficientBalance {
        /// Balance before the debit.
        balance: f64,
        /// Amount the caller tried to debit.
        requested: f64,
    },

    /// Store read or write failed.
    #[error("persistence error: {0}")]
    PersistenceError(String),

    /// Outbound delivery through the WhatsApp gateway failed.
    #[error("messaging error: {0}")]
    MessagingError(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl LudinhoError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::Unauthorized => 1100,
            Self::NotFound(_) => 2001,
            Self::ItemNotEligible(_) => 4001,
            Self::InsufficientBalance { .. } => 4002,
            Self::Internal(_) => 3000,
            Self::PersistenceError(_) => 3001,
            Self::MessagingError(_) => 3002,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ItemNotEligible(_) | Self::InsufficientBalance { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::PersistenceError(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::MessagingError(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<sqlx::Error> for LudinhoError {
    fn from(err: sqlx::Error) -> Self {
        Self::PersistenceError(err.to_string())
    }
}

impl From<reqwest::Error> for LudinhoError {
    fn from(err: reqwest::Error) -> Self {
        Self::MessagingError(err.to_string())
    }
}

impl IntoResponse for LudinhoError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_maps_to_401() {
        let err = LudinhoError::Unauthorized;
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.error_code(), 1100);
    }

    #[test]
    fn ledger_errors_are_unprocessable() {
        let err = LudinhoError::InsufficientBalance {
            balance: 10.0,
            requested: 25.5,
        };
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(err.to_string().contains("10.00"));
        assert!(err.to_string().contains("25.50"));
    }

    #[test]
    fn into_response_carries_status() {
        let response = LudinhoError::MessagingError("timeout".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
