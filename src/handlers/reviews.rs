use crate::handlers::common::{created_response, success_response};
use crate::{
    auth::AuthenticatedUser, errors::ServiceError, services::reviews::CreateReviewInput, AppState,
};
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use uuid::Uuid;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_review))
        .route("/:product_id", get(list_reviews))
}

/// Create a review; the author is taken from the session, never the body
async fn create_review(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(payload): Json<CreateReviewInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let review = state
        .services
        .reviews
        .create_review(claims.sub, payload)
        .await?;

    Ok(created_response("Review created successfully", review))
}

async fn list_reviews(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let reviews = state.services.reviews.list_for_product(product_id).await?;

    Ok(success_response("Reviews retrieved successfully", reviews))
}
