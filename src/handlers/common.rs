use crate::{errors::ServiceError, ApiResponse};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use validator::Validate;

/// Standard success response
pub fn success_response<T: Serialize>(message: &str, data: T) -> Response {
    (StatusCode::OK, Json(ApiResponse::success(message, data))).into_response()
}

/// Standard created response
pub fn created_response<T: Serialize>(message: &str, data: T) -> Response {
    (
        StatusCode::CREATED,
        Json(ApiResponse::success(message, data)),
    )
        .into_response()
}

/// Success response carrying pagination metadata
pub fn paginated_response<T: Serialize>(
    message: &str,
    data: T,
    pagination: crate::Pagination,
) -> Response {
    (
        StatusCode::OK,
        Json(ApiResponse::success(message, data).with_pagination(pagination)),
    )
        .into_response()
}

/// Validate request input
pub fn validate_input<T: Validate>(input: &T) -> Result<(), ServiceError> {
    input
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))
}
