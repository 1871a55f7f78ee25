use crate::handlers::common::success_response;
use crate::{
    auth::AuthenticatedUser, errors::ServiceError, services::wishlists::WishlistToggle, AppState,
};
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/toggle", post(toggle))
        .route("/:user_id", get(get_wishlist))
}

/// Add the product to the wishlist, or remove it when already present
async fn toggle(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    Json(payload): Json<ToggleRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let action = state
        .services
        .wishlists
        .toggle(payload.user_id, payload.product_id)
        .await?;

    let message = match action {
        WishlistToggle::Added => "Added to wishlist",
        WishlistToggle::Removed => "Removed from wishlist",
    };

    Ok(success_response(message, json!({ "action": action })))
}

async fn get_wishlist(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let products = state.services.wishlists.get(user_id).await?;
    let count = products.len();

    Ok(success_response(
        "Wishlist retrieved successfully",
        json!({ "products": products, "count": count }),
    ))
}

// Request DTOs

#[derive(Debug, Deserialize)]
struct ToggleRequest {
    user_id: Uuid,
    product_id: Uuid,
}
