mod common;

use common::{seed_category, seed_product, seed_user, TestApp};
use grandeur_api::services::carts::{AddToCartInput, GuestCartLine};
use rust_decimal_macros::dec;
use uuid::Uuid;

fn guest_line(product_id: Uuid, quantity: Option<i32>) -> GuestCartLine {
    GuestCartLine {
        id: product_id,
        quantity,
        size: None,
        color: None,
    }
}

#[tokio::test]
async fn merge_adds_quantities_onto_persisted_line() {
    let app = TestApp::new().await;
    let carts = app.cart_service();

    let user = seed_user(&app, "shopper@example.com").await;
    let cat = seed_category(&app, "Shoes").await;
    let product = seed_product(&app, cat.id, "Runner", dec!(120.00), 10).await;

    // Persisted line at quantity 1
    carts
        .add_item(AddToCartInput {
            user_id: user.id,
            product_id: product.id,
            quantity: Some(1),
            color: None,
            size: None,
        })
        .await
        .unwrap();

    // Guest cart carries the same product at quantity 3
    let merged = carts
        .merge_guest_cart(user.id, &[guest_line(product.id, Some(3))])
        .await
        .expect("merge should succeed");

    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].quantity, 4);
}

#[tokio::test]
async fn merge_creates_cart_for_first_login() {
    let app = TestApp::new().await;
    let carts = app.cart_service();

    let user = seed_user(&app, "fresh@example.com").await;
    let cat = seed_category(&app, "Shoes").await;
    let product = seed_product(&app, cat.id, "Runner", dec!(120.00), 10).await;

    let merged = carts
        .merge_guest_cart(user.id, &[guest_line(product.id, Some(2))])
        .await
        .unwrap();

    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].quantity, 2);
    assert_eq!(merged[0].product.id, product.id);
}

#[tokio::test]
async fn merge_skips_unknown_products_without_failing() {
    let app = TestApp::new().await;
    let carts = app.cart_service();

    let user = seed_user(&app, "shopper@example.com").await;
    let cat = seed_category(&app, "Shoes").await;
    let product = seed_product(&app, cat.id, "Runner", dec!(120.00), 10).await;

    let merged = carts
        .merge_guest_cart(
            user.id,
            &[
                guest_line(Uuid::new_v4(), Some(5)), // unresolvable
                guest_line(product.id, Some(2)),
            ],
        )
        .await
        .expect("merge must not fail on unknown products");

    // The unknown line is simply absent from the resulting cart
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].product.id, product.id);
    assert_eq!(merged[0].quantity, 2);
}

#[tokio::test]
async fn merge_defaults_quantity_to_one() {
    let app = TestApp::new().await;
    let carts = app.cart_service();

    let user = seed_user(&app, "shopper@example.com").await;
    let cat = seed_category(&app, "Shoes").await;
    let product = seed_product(&app, cat.id, "Runner", dec!(120.00), 10).await;

    let merged = carts
        .merge_guest_cart(user.id, &[guest_line(product.id, None)])
        .await
        .unwrap();

    assert_eq!(merged[0].quantity, 1);
}

#[tokio::test]
async fn merge_keeps_persisted_selections_over_guest_ones() {
    let app = TestApp::new().await;
    let carts = app.cart_service();

    let user = seed_user(&app, "shopper@example.com").await;
    let cat = seed_category(&app, "Shoes").await;
    let product = seed_product(&app, cat.id, "Runner", dec!(120.00), 10).await;

    carts
        .add_item(AddToCartInput {
            user_id: user.id,
            product_id: product.id,
            quantity: Some(1),
            color: Some("red".to_string()),
            size: None,
        })
        .await
        .unwrap();

    let merged = carts
        .merge_guest_cart(
            user.id,
            &[GuestCartLine {
                id: product.id,
                quantity: Some(1),
                size: Some("XL".to_string()),
                color: Some("green".to_string()),
            }],
        )
        .await
        .unwrap();

    // Persisted color wins; guest size fills the gap
    assert_eq!(merged[0].color.as_deref(), Some("red"));
    assert_eq!(merged[0].size.as_deref(), Some("XL"));
}

#[tokio::test]
async fn merge_without_guest_cart_returns_persisted_state() {
    let app = TestApp::new().await;
    let carts = app.cart_service();

    let user = seed_user(&app, "shopper@example.com").await;
    let cat = seed_category(&app, "Shoes").await;
    let product = seed_product(&app, cat.id, "Runner", dec!(120.00), 10).await;

    carts
        .add_item(AddToCartInput {
            user_id: user.id,
            product_id: product.id,
            quantity: Some(2),
            color: None,
            size: None,
        })
        .await
        .unwrap();

    let merged = carts.merge_guest_cart(user.id, &[]).await.unwrap();
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].quantity, 2);
}

#[tokio::test]
async fn merge_with_no_cart_and_no_guest_lines_yields_empty() {
    let app = TestApp::new().await;
    let carts = app.cart_service();

    let user = seed_user(&app, "never-shopped@example.com").await;

    let merged = carts.merge_guest_cart(user.id, &[]).await.unwrap();
    assert!(merged.is_empty());
}
