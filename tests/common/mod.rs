#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use grandeur_api::{
    auth::AuthService,
    config::AppConfig,
    db,
    entities::{category, product, user, CategoryModel, ProductModel, UserModel, UserRole},
    errors::ServiceError,
    events::{self, EventSender},
    services::{
        gateway::{
            CreatePaymentRequest, InitializedPayment, PaymentGateway, VerifiedTransaction,
        },
        CartService, CatalogService, PaymentService, ReviewService, TaxonomyService, UserService,
        WishlistService,
    },
};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Test harness: application services over a fresh in-memory SQLite database.
///
/// The pool is pinned to a single connection so every query sees the same
/// in-memory database.
pub struct TestApp {
    pub db: Arc<DatabaseConnection>,
    pub event_sender: Arc<EventSender>,
    pub auth: Arc<AuthService>,
    pub config: AppConfig,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        let mut config = AppConfig::new(
            "sqlite::memory:".to_string(),
            "test_secret_key_long_enough_for_validation".to_string(),
            "127.0.0.1".to_string(),
            18080,
            "test".to_string(),
        );
        config.db_max_connections = 1;
        config.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&config)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let (event_tx, event_rx) = mpsc::channel(1024);
        let event_sender = Arc::new(EventSender::new(event_tx));
        let event_task = tokio::spawn(events::process_events(event_rx));

        let auth = Arc::new(AuthService::new(
            &config.jwt_secret,
            config.jwt_expiration_secs,
        ));

        Self {
            db: Arc::new(pool),
            event_sender,
            auth,
            config,
            _event_task: event_task,
        }
    }

    pub fn cart_service(&self) -> CartService {
        CartService::new(self.db.clone(), self.event_sender.clone())
    }

    pub fn catalog_service(&self) -> Arc<CatalogService> {
        Arc::new(CatalogService::new(self.db.clone(), self.event_sender.clone()))
    }

    pub fn taxonomy_service(&self) -> TaxonomyService {
        TaxonomyService::new(self.db.clone())
    }

    pub fn review_service(&self) -> ReviewService {
        ReviewService::new(self.db.clone(), self.event_sender.clone())
    }

    pub fn wishlist_service(&self) -> WishlistService {
        WishlistService::new(self.db.clone(), self.event_sender.clone())
    }

    pub fn user_service(&self) -> UserService {
        UserService::new(
            self.db.clone(),
            self.event_sender.clone(),
            self.auth.clone(),
            Arc::new(self.cart_service()),
            None,
            self.config.frontend_url.clone(),
        )
    }

    pub fn payment_service(&self, gateway: Arc<dyn PaymentGateway>) -> PaymentService {
        PaymentService::new(
            self.db.clone(),
            self.event_sender.clone(),
            gateway,
            self.catalog_service(),
            self.config.clone(),
        )
    }
}

/// Insert a user row directly; password hash is only needed by login tests.
pub async fn seed_user(app: &TestApp, email: &str) -> UserModel {
    let now = Utc::now();
    user::ActiveModel {
        id: Set(Uuid::new_v4()),
        first_name: Set("Ada".to_string()),
        last_name: Set("Obi".to_string()),
        email: Set(email.to_string()),
        phone: Set("+2348000000000".to_string()),
        address: Set("12 Marina Rd, Lagos".to_string()),
        password_hash: Set(String::new()),
        image: Set(None),
        role: Set(UserRole::Customer),
        is_verified: Set(true),
        verification_token: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&*app.db)
    .await
    .expect("failed to seed user")
}

pub async fn seed_category(app: &TestApp, name: &str) -> CategoryModel {
    let now = Utc::now();
    category::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        image: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&*app.db)
    .await
    .expect("failed to seed category")
}

pub async fn seed_product(
    app: &TestApp,
    category_id: Uuid,
    name: &str,
    price: Decimal,
    quantity: i32,
) -> ProductModel {
    let now = Utc::now();
    product::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        description: Set("A test product".to_string()),
        price: Set(price),
        currency: Set("NGN".to_string()),
        image: Set(Some(format!("https://cdn.test/{}.jpg", name))),
        sizes: Set(Some(serde_json::json!(["S", "M", "L"]))),
        colors: Set(Some(serde_json::json!(["black", "red"]))),
        default_size: Set(None),
        default_color: Set(None),
        quantity: Set(quantity),
        category_id: Set(category_id),
        subcategory: Set(None),
        tags: Set(None),
        best_selling: Set(false),
        new_arrival: Set(false),
        rating: Set(None),
        discount: Set(None),
        old_price: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&*app.db)
    .await
    .expect("failed to seed product")
}

/// Programmable stand-in for the hosted-payment provider.
#[derive(Default)]
pub struct MockGateway {
    pub create_calls: Mutex<Vec<CreatePaymentRequest>>,
    pub verify_calls: Mutex<Vec<String>>,
    verification: Mutex<Option<VerifiedTransaction>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Program the answer returned by `verify_transaction`.
    pub fn set_verification(&self, tx: VerifiedTransaction) {
        *self.verification.lock().unwrap() = Some(tx);
    }

    pub fn last_create_request(&self) -> Option<CreatePaymentRequest> {
        self.create_calls.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_payment(
        &self,
        request: CreatePaymentRequest,
    ) -> Result<InitializedPayment, ServiceError> {
        self.create_calls.lock().unwrap().push(request);
        Ok(InitializedPayment {
            link: "https://checkout.test/pay/abc123".to_string(),
        })
    }

    async fn verify_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<VerifiedTransaction, ServiceError> {
        self.verify_calls
            .lock()
            .unwrap()
            .push(transaction_id.to_string());
        self.verification
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ServiceError::ExternalApiError("no verification programmed".into()))
    }
}
