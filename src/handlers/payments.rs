use crate::handlers::common::{created_response, paginated_response, success_response};
use crate::{
    auth::{AdminUser, AuthenticatedUser},
    errors::ServiceError,
    AppState, ListQuery, Pagination,
};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

/// Payment initiation/verification plus the receipt query surface
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/initialize", post(initialize))
        .route("/verify", get(verify).post(verify))
        .route("/receipts", get(list_receipts))
        .route("/receipts/:id", get(user_receipts))
        .route("/receipts/:id/status", patch(update_receipt_status))
}

/// Price the cart and obtain the hosted-payment redirect link
async fn initialize(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    Json(payload): Json<InitializeRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let email = payload
        .email
        .filter(|e| !e.trim().is_empty())
        .ok_or_else(|| ServiceError::ValidationError("Email is required".to_string()))?;

    let init = state.services.payments.initialize(&email).await?;

    Ok(created_response("Payment initialized successfully!", init))
}

#[derive(Debug, Deserialize)]
struct VerifyQuery {
    transaction_id: Option<String>,
}

/// Reconcile a completed payment; safe to call again on redelivery
async fn verify(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    Query(query): Query<VerifyQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let transaction_id = query
        .transaction_id
        .ok_or_else(|| ServiceError::ValidationError("Missing transaction_id".to_string()))?;

    let receipt = state.services.payments.verify(&transaction_id).await?;

    Ok(success_response("Payment successful", receipt))
}

async fn user_receipts(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let receipts = state.services.payments.receipts_for_user(user_id).await?;

    Ok(success_response(
        "Receipts retrieved successfully",
        receipts,
    ))
}

async fn list_receipts(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let (receipts, total) = state
        .services
        .payments
        .list_receipts(query.page, query.limit)
        .await?;

    Ok(paginated_response(
        "All receipts retrieved successfully",
        receipts,
        Pagination::new(query.page, query.limit, total),
    ))
}

#[derive(Debug, Deserialize)]
struct UpdateStatusRequest {
    status: String,
}

async fn update_receipt_status(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let receipt = state
        .services
        .payments
        .update_receipt_status(id, payload.status)
        .await?;

    Ok(success_response(
        "Receipt status updated successfully",
        receipt,
    ))
}

#[derive(Debug, Deserialize)]
struct InitializeRequest {
    email: Option<String>,
}
