pub mod auth;
pub mod carts;
pub mod common;
pub mod payments;
pub mod products;
pub mod reviews;
pub mod taxonomy;
pub mod wishlists;

use crate::{
    auth::AuthService,
    config::AppConfig,
    db::DbPool,
    events::EventSender,
    services::{
        gateway::PaymentGateway, mailer::Mailer, CartService, CatalogService, PaymentService,
        ReviewService, TaxonomyService, UserService, WishlistService,
    },
};
use std::sync::Arc;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub users: Arc<UserService>,
    pub carts: Arc<CartService>,
    pub catalog: Arc<CatalogService>,
    pub taxonomy: Arc<TaxonomyService>,
    pub reviews: Arc<ReviewService>,
    pub wishlists: Arc<WishlistService>,
    pub payments: Arc<PaymentService>,
}

impl AppServices {
    /// Wire every service against the shared pool, event channel and the
    /// injected gateway/mailer collaborators.
    pub fn new(
        db: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        auth_service: Arc<AuthService>,
        gateway: Arc<dyn PaymentGateway>,
        mailer: Option<Arc<Mailer>>,
        config: AppConfig,
    ) -> Self {
        let carts = Arc::new(CartService::new(db.clone(), event_sender.clone()));
        let catalog = Arc::new(CatalogService::new(db.clone(), event_sender.clone()));
        let taxonomy = Arc::new(TaxonomyService::new(db.clone()));
        let reviews = Arc::new(ReviewService::new(db.clone(), event_sender.clone()));
        let wishlists = Arc::new(WishlistService::new(db.clone(), event_sender.clone()));
        let users = Arc::new(UserService::new(
            db.clone(),
            event_sender.clone(),
            auth_service,
            carts.clone(),
            mailer,
            config.frontend_url.clone(),
        ));
        let payments = Arc::new(PaymentService::new(
            db,
            event_sender,
            gateway,
            catalog.clone(),
            config,
        ));

        Self {
            users,
            carts,
            catalog,
            taxonomy,
            reviews,
            wishlists,
            payments,
        }
    }
}
