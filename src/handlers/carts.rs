use crate::handlers::common::{created_response, success_response, validate_input};
use crate::{
    auth::AuthenticatedUser,
    errors::ServiceError,
    services::carts::{AddToCartInput, CartItemUpdate, UpdateCartItemInput},
    AppState,
};
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{delete, get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Cart routes; all require a valid session
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/items", post(add_item))
        .route("/items", patch(update_item))
        .route("/:user_id/items", delete(remove_item))
        .route("/:user_id", delete(clear_cart))
        .route("/:user_id", get(get_cart))
}

/// Add an item, aggregating quantity when the product is already in the cart
async fn add_item(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    Json(payload): Json<AddItemRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let line = state
        .services
        .carts
        .add_item(AddToCartInput {
            user_id: payload.user_id,
            product_id: payload.product_id,
            quantity: payload.quantity,
            color: payload.color,
            size: payload.size,
        })
        .await?;

    Ok(created_response("Item added to cart", line))
}

/// Patch a line; quantity of zero or less removes it
async fn update_item(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    Json(payload): Json<UpdateItemRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let outcome = state
        .services
        .carts
        .update_item(
            payload.user_id,
            payload.product_id,
            UpdateCartItemInput {
                quantity: payload.quantity,
                size: payload.size,
                color: payload.color,
            },
        )
        .await?;

    Ok(match outcome {
        CartItemUpdate::Removed => success_response("Item removed from cart", ()),
        CartItemUpdate::Updated(line) => success_response("Item updated successfully", line),
    })
}

async fn remove_item(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<RemoveItemRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let removed = state
        .services
        .carts
        .remove_item(user_id, payload.product_id)
        .await?;

    Ok(success_response("Item deleted", removed))
}

async fn clear_cart(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.carts.clear(user_id).await?;

    Ok(success_response("Cart cleared successfully", ()))
}

async fn get_cart(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let cart = state.services.carts.get(user_id).await?;

    Ok(success_response("Cart retrieved", cart))
}

// Request DTOs

#[derive(Debug, Deserialize, Validate)]
struct AddItemRequest {
    user_id: Uuid,
    product_id: Uuid,
    #[validate(range(min = 1))]
    quantity: Option<i32>,
    color: Option<String>,
    size: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpdateItemRequest {
    user_id: Uuid,
    product_id: Uuid,
    quantity: Option<i32>,
    size: Option<String>,
    color: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RemoveItemRequest {
    product_id: Uuid,
}
