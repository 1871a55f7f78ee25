use crate::handlers::common::{created_response, success_response, validate_input};
use crate::{auth::AdminUser, errors::ServiceError, AppState};
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

pub fn category_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_category))
        .route("/", get(list_categories))
        .route("/by-name/:name", get(get_category))
        .route("/:id", put(update_category))
        .route("/:id", delete(delete_category))
}

pub fn subcategory_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_subcategory))
        .route("/", get(list_subcategories))
        .route("/:id", delete(delete_subcategory))
}

pub fn tag_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_tag))
        .route("/", get(list_tags))
        .route("/:id", delete(delete_tag))
}

// Categories

async fn create_category(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let category = state
        .services
        .taxonomy
        .create_category(payload.name, payload.image)
        .await?;

    Ok(created_response("Category created successfully!", category))
}

async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ServiceError> {
    let categories = state.services.taxonomy.list_categories().await?;

    Ok(success_response(
        "Categories fetched successfully!",
        categories,
    ))
}

async fn get_category(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let category = state.services.taxonomy.get_category_by_name(&name).await?;

    Ok(success_response("Category fetched successfully!", category))
}

async fn update_category(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCategoryRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let category = state
        .services
        .taxonomy
        .update_category(id, payload.name, payload.image)
        .await?;

    Ok(success_response("Category updated successfully!", category))
}

async fn delete_category(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.taxonomy.delete_category(id).await?;

    Ok(success_response("Category deleted successfully!", ()))
}

// Subcategories

async fn create_subcategory(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Json(payload): Json<CreateSubcategoryRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let subcategory = state
        .services
        .taxonomy
        .create_subcategory(payload.name, payload.category_id)
        .await?;

    Ok(created_response(
        "Subcategory created successfully!",
        subcategory,
    ))
}

async fn list_subcategories(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ServiceError> {
    let subcategories = state.services.taxonomy.list_subcategories().await?;

    Ok(success_response(
        "Subcategories fetched successfully!",
        subcategories,
    ))
}

async fn delete_subcategory(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.taxonomy.delete_subcategory(id).await?;

    Ok(success_response("Subcategory deleted successfully!", ()))
}

// Tags

async fn create_tag(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Json(payload): Json<CreateTagRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let tag = state.services.taxonomy.create_tag(payload.name).await?;

    Ok(created_response("Tag created successfully!", tag))
}

async fn list_tags(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ServiceError> {
    let tags = state.services.taxonomy.list_tags().await?;

    Ok(success_response("Tags fetched successfully!", tags))
}

async fn delete_tag(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.taxonomy.delete_tag(id).await?;

    Ok(success_response("Tag deleted successfully!", ()))
}

// Request DTOs

#[derive(Debug, Deserialize, Validate)]
struct CreateCategoryRequest {
    #[validate(length(min = 1, message = "Missing Name Field!"))]
    name: String,
    image: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpdateCategoryRequest {
    name: Option<String>,
    image: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
struct CreateSubcategoryRequest {
    #[validate(length(min = 1, message = "Missing Name Field!"))]
    name: String,
    category_id: Uuid,
}

#[derive(Debug, Deserialize, Validate)]
struct CreateTagRequest {
    #[validate(length(min = 1, message = "Missing Name Field!"))]
    name: String,
}
