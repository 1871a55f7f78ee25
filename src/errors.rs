use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Error body returned to clients. Every error response carries an explicit
/// success flag and a human-readable message.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::error::DbErr),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Payment gateway error: {0}")]
    ExternalApiError(String),

    #[error("Payment failed: {0}")]
    PaymentFailed(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl ServiceError {
    /// Single source of truth for error-to-status mapping. Validation,
    /// not-found and duplicate conditions are client errors; gateway and
    /// storage failures are server-side.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_)
            | Self::Conflict(_)
            | Self::ValidationError(_)
            | Self::InvalidOperation(_) => StatusCode::BAD_REQUEST,
            Self::AuthError(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::PaymentFailed(_) => StatusCode::PAYMENT_REQUIRED,
            Self::ExternalApiError(_) => StatusCode::BAD_GATEWAY,
            Self::DatabaseError(_) | Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message suitable for HTTP responses. Internal errors return generic
    /// messages to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::InternalError(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            success: false,
            message: self.response_message(),
            details: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_bad_request() {
        let err = ServiceError::NotFound("Cart not found".into());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.response_message(), "Cart not found");
    }

    #[test]
    fn duplicate_receipt_is_a_client_visible_conflict() {
        let err = ServiceError::Conflict("Receipt already exists for this order".into());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.response_message().contains("already exists"));
    }

    #[test]
    fn gateway_errors_are_server_side() {
        let err = ServiceError::ExternalApiError("request timed out".into());
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn internal_errors_do_not_leak_details() {
        let err = ServiceError::InternalError("pool exhausted on shard 3".into());
        assert_eq!(err.response_message(), "Internal server error");
    }
}
