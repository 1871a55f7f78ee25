use crate::handlers::common::{created_response, paginated_response, success_response};
use crate::{
    auth::AdminUser,
    errors::ServiceError,
    services::catalog::{CreateProductInput, UpdateProductInput},
    AppState, ListQuery, Pagination,
};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{delete, get, patch, post},
    Json, Router,
};
use std::sync::Arc;
use uuid::Uuid;

/// Catalog routes; reads are public, writes are admin-only
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_product))
        .route("/", get(list_products))
        .route("/:id", get(get_product))
        .route("/:id", patch(update_product))
        .route("/:id", delete(delete_product))
}

async fn create_product(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Json(payload): Json<CreateProductInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let product = state.services.catalog.create_product(payload).await?;

    Ok(created_response("Product created successfully!", product))
}

async fn list_products(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let (products, total) = state
        .services
        .catalog
        .list_products(query.page, query.limit)
        .await?;

    Ok(paginated_response(
        "Products retrieved successfully!",
        products,
        Pagination::new(query.page, query.limit, total),
    ))
}

async fn get_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let product = state.services.catalog.get_product(id).await?;

    Ok(success_response("Product retrieved successfully!", product))
}

async fn update_product(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let product = state.services.catalog.update_product(id, payload).await?;

    Ok(success_response("Product updated successfully!", product))
}

async fn delete_product(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.catalog.delete_product(id).await?;

    Ok(success_response("Product deleted successfully!", ()))
}
