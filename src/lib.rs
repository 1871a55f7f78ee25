//! Backend for the Grandeur fashion storefront.
//!
//! Catalog, carts, wishlists and reviews are plain relational CRUD; the
//! interesting machinery is the guest-cart merge at login and the payment
//! reconciliation flow that turns a verified hosted payment into an
//! immutable receipt with best-effort stock accounting.

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod services;

use axum::Router;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Shared application state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
}

/// Common query parameters for paginated list endpoints
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

fn default_page() -> u64 {
    1
}
fn default_limit() -> u64 {
    10
}

/// Standard response wrapper: explicit success flag plus a human-readable
/// message on every response.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

impl<T> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
            pagination: None,
        }
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }
}

/// Pagination metadata for list endpoints
#[derive(Debug, Serialize)]
pub struct Pagination {
    pub current_page: u64,
    pub total_pages: u64,
    pub total_items: u64,
    pub items_per_page: u64,
}

impl Pagination {
    pub fn new(page: u64, limit: u64, total_items: u64) -> Self {
        let total_pages = if limit == 0 {
            0
        } else {
            total_items.div_ceil(limit)
        };
        Self {
            current_page: page,
            total_pages,
            total_items,
            items_per_page: limit,
        }
    }
}

/// Full API route tree
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .nest("/auth", handlers::auth::routes())
        .nest("/products", handlers::products::routes())
        .nest("/categories", handlers::taxonomy::category_routes())
        .nest("/subcategories", handlers::taxonomy::subcategory_routes())
        .nest("/tags", handlers::taxonomy::tag_routes())
        .nest("/reviews", handlers::reviews::routes())
        .nest("/wishlist", handlers::wishlists::routes())
        .nest("/carts", handlers::carts::routes())
        .nest("/payments", handlers::payments::routes())
}
