mod common;

use assert_matches::assert_matches;
use common::{seed_category, seed_product, seed_user, MockGateway, TestApp};
use grandeur_api::{
    entities::{Product, Receipt, ReceiptItem},
    errors::ServiceError,
    services::carts::AddToCartInput,
    services::gateway::{PaymentMeta, VerifiedTransaction},
};
use rust_decimal_macros::dec;
use sea_orm::EntityTrait;
use std::sync::Arc;
use uuid::Uuid;

async fn add_to_cart(app: &TestApp, user_id: Uuid, product_id: Uuid, quantity: i32) {
    app.cart_service()
        .add_item(AddToCartInput {
            user_id,
            product_id,
            quantity: Some(quantity),
            color: None,
            size: None,
        })
        .await
        .expect("seeding cart line should succeed");
}

fn successful_tx(user_id: Uuid, order_id: Uuid, amount: rust_decimal::Decimal) -> VerifiedTransaction {
    VerifiedTransaction {
        status: "successful".to_string(),
        amount,
        currency: "NGN".to_string(),
        meta: PaymentMeta { user_id, order_id },
    }
}

#[tokio::test]
async fn initialize_prices_cart_and_embeds_metadata() {
    let app = TestApp::new().await;
    let gateway = Arc::new(MockGateway::new());
    let payments = app.payment_service(gateway.clone());

    let user = seed_user(&app, "buyer@example.com").await;
    let cat = seed_category(&app, "Apparel").await;
    let a = seed_product(&app, cat.id, "Jacket", dec!(1000), 10).await;
    let b = seed_product(&app, cat.id, "Scarf", dec!(500), 10).await;

    add_to_cart(&app, user.id, a.id, 2).await;
    add_to_cart(&app, user.id, b.id, 1).await;

    let init = payments
        .initialize("buyer@example.com")
        .await
        .expect("initialization should succeed");

    assert_eq!(init.link, "https://checkout.test/pay/abc123");

    let request = gateway.last_create_request().expect("gateway was called");
    // total = 1000 × 2 + 500 × 1
    assert_eq!(request.amount, dec!(2500));
    assert_eq!(request.currency, "NGN");
    assert_eq!(request.meta.user_id, user.id);
    assert_eq!(request.meta.order_id, init.order_id);
    assert_eq!(request.customer.email, "buyer@example.com");

    // Initialization must not touch stock or create receipts
    let receipts = Receipt::find().all(&*app.db).await.unwrap();
    assert!(receipts.is_empty());
    let a_after = Product::find_by_id(a.id).one(&*app.db).await.unwrap().unwrap();
    assert_eq!(a_after.quantity, 10);
}

#[tokio::test]
async fn initialize_fails_for_unknown_user_or_missing_cart() {
    let app = TestApp::new().await;
    let gateway = Arc::new(MockGateway::new());
    let payments = app.payment_service(gateway);

    let result = payments.initialize("ghost@example.com").await;
    assert_matches!(result, Err(ServiceError::NotFound(msg)) if msg.contains("User"));

    seed_user(&app, "cartless@example.com").await;
    let result = payments.initialize("cartless@example.com").await;
    assert_matches!(result, Err(ServiceError::NotFound(msg)) if msg.contains("cart"));
}

#[tokio::test]
async fn verify_creates_receipt_with_snapshots_and_decrements_stock() {
    let app = TestApp::new().await;
    let gateway = Arc::new(MockGateway::new());
    let payments = app.payment_service(gateway.clone());

    let user = seed_user(&app, "buyer@example.com").await;
    let cat = seed_category(&app, "Apparel").await;
    let a = seed_product(&app, cat.id, "Jacket", dec!(1000), 5).await;
    let b = seed_product(&app, cat.id, "Scarf", dec!(500), 5).await;

    add_to_cart(&app, user.id, a.id, 2).await;
    add_to_cart(&app, user.id, b.id, 1).await;

    let order_id = Uuid::new_v4();
    gateway.set_verification(successful_tx(user.id, order_id, dec!(2500)));

    let receipt = payments
        .verify("FLW-12345")
        .await
        .expect("verification should succeed");

    // Receipt mirrors the gateway's authoritative answer
    assert_eq!(receipt.receipt.order_id, order_id);
    assert_eq!(receipt.receipt.amount, dec!(2500));
    assert_eq!(receipt.receipt.status, "successful");
    assert_eq!(receipt.receipt.transaction_id, "FLW-12345");
    assert_eq!(receipt.receipt.customer_name, user.full_name());
    assert_eq!(receipt.receipt.customer_email, user.email);

    // One line per cart line, snapshotted from the product
    assert_eq!(receipt.items.len(), 2);
    let jacket = receipt
        .items
        .iter()
        .find(|i| i.name == "Jacket")
        .expect("jacket line");
    let scarf = receipt
        .items
        .iter()
        .find(|i| i.name == "Scarf")
        .expect("scarf line");
    assert_eq!(jacket.total, dec!(2000));
    assert_eq!(jacket.quantity, 2);
    assert_eq!(scarf.total, dec!(500));
    assert_eq!(scarf.quantity, 1);
    assert!(jacket.image.is_some());

    // Stock decremented per line
    let a_after = Product::find_by_id(a.id).one(&*app.db).await.unwrap().unwrap();
    let b_after = Product::find_by_id(b.id).one(&*app.db).await.unwrap().unwrap();
    assert_eq!(a_after.quantity, 3);
    assert_eq!(b_after.quantity, 4);

    // The cart is intentionally left populated; clearing is the client's call
    let cart = app.cart_service().get(user.id).await.unwrap();
    assert_eq!(cart.items.len(), 2);
}

#[tokio::test]
async fn duplicate_verification_creates_exactly_one_receipt() {
    let app = TestApp::new().await;
    let gateway = Arc::new(MockGateway::new());
    let payments = app.payment_service(gateway.clone());

    let user = seed_user(&app, "buyer@example.com").await;
    let cat = seed_category(&app, "Apparel").await;
    let a = seed_product(&app, cat.id, "Jacket", dec!(1000), 5).await;

    add_to_cart(&app, user.id, a.id, 2).await;

    let order_id = Uuid::new_v4();
    gateway.set_verification(successful_tx(user.id, order_id, dec!(2000)));

    payments.verify("FLW-777").await.expect("first verification");

    // Redelivered redirect/webhook: same transaction, same order id
    let second = payments.verify("FLW-777").await;
    assert_matches!(second, Err(ServiceError::Conflict(msg)) if msg.contains("already exists"));

    // Exactly one receipt, and zero additional mutation
    let receipts = Receipt::find().all(&*app.db).await.unwrap();
    assert_eq!(receipts.len(), 1);
    let items = ReceiptItem::find().all(&*app.db).await.unwrap();
    assert_eq!(items.len(), 1);
    let a_after = Product::find_by_id(a.id).one(&*app.db).await.unwrap().unwrap();
    assert_eq!(a_after.quantity, 3); // decremented once, not twice
}

#[tokio::test]
async fn rejected_gateway_status_creates_nothing() {
    let app = TestApp::new().await;
    let gateway = Arc::new(MockGateway::new());
    let payments = app.payment_service(gateway.clone());

    let user = seed_user(&app, "buyer@example.com").await;
    let cat = seed_category(&app, "Apparel").await;
    let a = seed_product(&app, cat.id, "Jacket", dec!(1000), 5).await;
    add_to_cart(&app, user.id, a.id, 1).await;

    gateway.set_verification(VerifiedTransaction {
        status: "failed".to_string(),
        amount: dec!(1000),
        currency: "NGN".to_string(),
        meta: PaymentMeta {
            user_id: user.id,
            order_id: Uuid::new_v4(),
        },
    });

    let result = payments.verify("FLW-900").await;
    assert_matches!(result, Err(ServiceError::PaymentFailed(_)));

    let receipts = Receipt::find().all(&*app.db).await.unwrap();
    assert!(receipts.is_empty());
    let a_after = Product::find_by_id(a.id).one(&*app.db).await.unwrap().unwrap();
    assert_eq!(a_after.quantity, 5);
}

#[tokio::test]
async fn missing_transaction_id_is_a_validation_error() {
    let app = TestApp::new().await;
    let gateway = Arc::new(MockGateway::new());
    let payments = app.payment_service(gateway);

    let result = payments.verify("").await;
    assert_matches!(result, Err(ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn verify_fails_when_metadata_user_is_unknown() {
    let app = TestApp::new().await;
    let gateway = Arc::new(MockGateway::new());
    let payments = app.payment_service(gateway.clone());

    gateway.set_verification(successful_tx(Uuid::new_v4(), Uuid::new_v4(), dec!(100)));

    let result = payments.verify("FLW-404").await;
    assert_matches!(result, Err(ServiceError::NotFound(msg)) if msg.contains("User"));
}

#[tokio::test]
async fn gateway_failure_surfaces_as_external_api_error() {
    let app = TestApp::new().await;
    // No programmed verification → the mock behaves like a dead provider
    let gateway = Arc::new(MockGateway::new());
    let payments = app.payment_service(gateway);

    let result = payments.verify("FLW-TIMEOUT").await;
    assert_matches!(result, Err(ServiceError::ExternalApiError(_)));
}

#[tokio::test]
async fn oversell_clamps_stock_to_zero_and_keeps_the_receipt() {
    let app = TestApp::new().await;
    let gateway = Arc::new(MockGateway::new());
    let payments = app.payment_service(gateway.clone());

    let user = seed_user(&app, "buyer@example.com").await;
    let cat = seed_category(&app, "Apparel").await;
    // Only 2 in stock, but the cart holds 5
    let a = seed_product(&app, cat.id, "Jacket", dec!(1000), 2).await;
    add_to_cart(&app, user.id, a.id, 5).await;

    let order_id = Uuid::new_v4();
    gateway.set_verification(successful_tx(user.id, order_id, dec!(5000)));

    let receipt = payments
        .verify("FLW-551")
        .await
        .expect("receipt creation must not be blocked by stock bookkeeping");

    assert_eq!(receipt.items.len(), 1);
    assert_eq!(receipt.items[0].quantity, 5);

    // Stock never goes negative: clamped at zero
    let a_after = Product::find_by_id(a.id).one(&*app.db).await.unwrap().unwrap();
    assert_eq!(a_after.quantity, 0);
}

#[tokio::test]
async fn receipt_queries_are_newest_first_and_paginated() {
    let app = TestApp::new().await;
    let gateway = Arc::new(MockGateway::new());
    let payments = app.payment_service(gateway.clone());

    let user = seed_user(&app, "buyer@example.com").await;
    let cat = seed_category(&app, "Apparel").await;
    let a = seed_product(&app, cat.id, "Jacket", dec!(1000), 50).await;
    add_to_cart(&app, user.id, a.id, 1).await;

    for i in 0..3 {
        gateway.set_verification(successful_tx(user.id, Uuid::new_v4(), dec!(1000)));
        payments
            .verify(&format!("FLW-{i}"))
            .await
            .expect("verification should succeed");
    }

    let receipts = payments.receipts_for_user(user.id).await.unwrap();
    assert_eq!(receipts.len(), 3);

    let (page, total) = payments.list_receipts(1, 2).await.unwrap();
    assert_eq!(total, 3);
    assert_eq!(page.len(), 2);
    let (page2, _) = payments.list_receipts(2, 2).await.unwrap();
    assert_eq!(page2.len(), 1);
}

#[tokio::test]
async fn receipt_status_override_touches_nothing_else() {
    let app = TestApp::new().await;
    let gateway = Arc::new(MockGateway::new());
    let payments = app.payment_service(gateway.clone());

    let user = seed_user(&app, "buyer@example.com").await;
    let cat = seed_category(&app, "Apparel").await;
    let a = seed_product(&app, cat.id, "Jacket", dec!(1000), 5).await;
    add_to_cart(&app, user.id, a.id, 1).await;

    gateway.set_verification(successful_tx(user.id, Uuid::new_v4(), dec!(1000)));
    let receipt = payments.verify("FLW-1").await.unwrap();

    let updated = payments
        .update_receipt_status(receipt.receipt.id, "refunded".to_string())
        .await
        .unwrap();
    assert_eq!(updated.receipt.status, "refunded");
    assert_eq!(updated.receipt.amount, dec!(1000));
    assert_eq!(updated.items.len(), 1);

    // No side effects on stock
    let a_after = Product::find_by_id(a.id).one(&*app.db).await.unwrap().unwrap();
    assert_eq!(a_after.quantity, 4);

    let missing = payments
        .update_receipt_status(Uuid::new_v4(), "void".to_string())
        .await;
    assert_matches!(missing, Err(ServiceError::NotFound(_)));
}
