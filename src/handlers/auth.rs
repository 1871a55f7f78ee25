use crate::handlers::common::{created_response, success_response, validate_input};
use crate::{
    errors::ServiceError,
    services::users::{LoginInput, RegisterInput},
    AppState,
};
use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

/// Routes for registration, login and email verification
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/verify-email", get(verify_email))
}

/// Register a new user; the verification mail goes out asynchronously
async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let user = state.services.users.register(payload).await?;

    Ok(created_response(
        "User created successfully! Please check your email to verify your account.",
        user,
    ))
}

/// Log in, merging any client-held guest cart into the persisted cart
async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginInput>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let outcome = state.services.users.login(payload).await?;
    let bearer = format!("Bearer {}", outcome.token);

    Ok((
        [(header::AUTHORIZATION, bearer)],
        success_response("Login successful", outcome),
    ))
}

#[derive(Debug, Deserialize)]
struct VerifyEmailQuery {
    token: Option<String>,
}

async fn verify_email(
    State(state): State<Arc<AppState>>,
    Query(query): Query<VerifyEmailQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let token = query
        .token
        .ok_or_else(|| ServiceError::ValidationError("Token is required".to_string()))?;

    state.services.users.verify_email(&token).await?;

    Ok(success_response("Email verified successfully", ()))
}
