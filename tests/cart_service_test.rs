mod common;

use assert_matches::assert_matches;
use common::{seed_category, seed_product, seed_user, TestApp};
use grandeur_api::{
    errors::ServiceError,
    services::carts::{AddToCartInput, CartItemUpdate, UpdateCartItemInput},
};
use rust_decimal_macros::dec;
use uuid::Uuid;

fn add_input(user_id: Uuid, product_id: Uuid, quantity: Option<i32>) -> AddToCartInput {
    AddToCartInput {
        user_id,
        product_id,
        quantity,
        color: None,
        size: None,
    }
}

#[tokio::test]
async fn add_item_creates_cart_and_line() {
    let app = TestApp::new().await;
    let carts = app.cart_service();

    let user = seed_user(&app, "shopper@example.com").await;
    let cat = seed_category(&app, "Shoes").await;
    let product = seed_product(&app, cat.id, "Runner", dec!(120.00), 10).await;

    let line = carts
        .add_item(add_input(user.id, product.id, Some(2)))
        .await
        .expect("add should succeed");

    assert_eq!(line.product_id, product.id);
    assert_eq!(line.quantity, 2);

    let cart = carts.get(user.id).await.expect("cart should now exist");
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 2);
    assert_eq!(cart.items[0].product.name, "Runner");
}

#[tokio::test]
async fn adding_same_product_twice_aggregates_one_line() {
    let app = TestApp::new().await;
    let carts = app.cart_service();

    let user = seed_user(&app, "shopper@example.com").await;
    let cat = seed_category(&app, "Shoes").await;
    let product = seed_product(&app, cat.id, "Runner", dec!(120.00), 10).await;

    carts
        .add_item(add_input(user.id, product.id, Some(3)))
        .await
        .unwrap();
    let line = carts
        .add_item(add_input(user.id, product.id, Some(4)))
        .await
        .unwrap();

    // One line with the summed quantity, never two lines
    assert_eq!(line.quantity, 7);
    let cart = carts.get(user.id).await.unwrap();
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 7);
}

#[tokio::test]
async fn add_defaults_quantity_to_one() {
    let app = TestApp::new().await;
    let carts = app.cart_service();

    let user = seed_user(&app, "shopper@example.com").await;
    let cat = seed_category(&app, "Shoes").await;
    let product = seed_product(&app, cat.id, "Runner", dec!(120.00), 10).await;

    let line = carts
        .add_item(add_input(user.id, product.id, None))
        .await
        .unwrap();
    assert_eq!(line.quantity, 1);
}

#[tokio::test]
async fn add_replaces_selections_only_when_supplied() {
    let app = TestApp::new().await;
    let carts = app.cart_service();

    let user = seed_user(&app, "shopper@example.com").await;
    let cat = seed_category(&app, "Shoes").await;
    let product = seed_product(&app, cat.id, "Runner", dec!(120.00), 10).await;

    let mut input = add_input(user.id, product.id, Some(1));
    input.color = Some("red".to_string());
    input.size = Some("M".to_string());
    carts.add_item(input).await.unwrap();

    // Second add without selections keeps the stored ones
    let line = carts
        .add_item(add_input(user.id, product.id, Some(1)))
        .await
        .unwrap();
    assert_eq!(line.selected_color.as_deref(), Some("red"));
    assert_eq!(line.selected_size.as_deref(), Some("M"));

    // Third add with a new color replaces it
    let mut input = add_input(user.id, product.id, Some(1));
    input.color = Some("black".to_string());
    let line = carts.add_item(input).await.unwrap();
    assert_eq!(line.selected_color.as_deref(), Some("black"));
    assert_eq!(line.selected_size.as_deref(), Some("M"));
}

#[tokio::test]
async fn add_unknown_product_fails() {
    let app = TestApp::new().await;
    let carts = app.cart_service();

    let user = seed_user(&app, "shopper@example.com").await;

    let result = carts
        .add_item(add_input(user.id, Uuid::new_v4(), Some(1)))
        .await;
    assert_matches!(result, Err(ServiceError::NotFound(_)));
}

#[tokio::test]
async fn update_patches_only_supplied_fields() {
    let app = TestApp::new().await;
    let carts = app.cart_service();

    let user = seed_user(&app, "shopper@example.com").await;
    let cat = seed_category(&app, "Shoes").await;
    let product = seed_product(&app, cat.id, "Runner", dec!(120.00), 10).await;

    let mut input = add_input(user.id, product.id, Some(2));
    input.size = Some("L".to_string());
    carts.add_item(input).await.unwrap();

    let outcome = carts
        .update_item(
            user.id,
            product.id,
            UpdateCartItemInput {
                quantity: Some(5),
                size: None,
                color: Some("white".to_string()),
            },
        )
        .await
        .unwrap();

    let line = match outcome {
        CartItemUpdate::Updated(line) => line,
        CartItemUpdate::Removed => panic!("line should not have been removed"),
    };
    assert_eq!(line.quantity, 5);
    assert_eq!(line.selected_size.as_deref(), Some("L")); // untouched
    assert_eq!(line.selected_color.as_deref(), Some("white"));
}

#[tokio::test]
async fn update_with_zero_quantity_removes_line() {
    let app = TestApp::new().await;
    let carts = app.cart_service();

    let user = seed_user(&app, "shopper@example.com").await;
    let cat = seed_category(&app, "Shoes").await;
    let product = seed_product(&app, cat.id, "Runner", dec!(120.00), 10).await;

    carts
        .add_item(add_input(user.id, product.id, Some(2)))
        .await
        .unwrap();

    let outcome = carts
        .update_item(
            user.id,
            product.id,
            UpdateCartItemInput {
                quantity: Some(0),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_matches!(outcome, CartItemUpdate::Removed);

    // A subsequent get must not include the line
    let cart = carts.get(user.id).await.unwrap();
    assert!(cart.items.is_empty());
}

#[tokio::test]
async fn update_on_missing_cart_or_line_fails() {
    let app = TestApp::new().await;
    let carts = app.cart_service();

    let user = seed_user(&app, "shopper@example.com").await;
    let cat = seed_category(&app, "Shoes").await;
    let product = seed_product(&app, cat.id, "Runner", dec!(120.00), 10).await;

    // No cart yet
    let result = carts
        .update_item(user.id, product.id, UpdateCartItemInput::default())
        .await;
    assert_matches!(result, Err(ServiceError::NotFound(msg)) if msg.contains("Cart"));

    // Cart exists, line does not
    let other = seed_product(&app, cat.id, "Walker", dec!(80.00), 10).await;
    carts
        .add_item(add_input(user.id, product.id, Some(1)))
        .await
        .unwrap();
    let result = carts
        .update_item(user.id, other.id, UpdateCartItemInput::default())
        .await;
    assert_matches!(result, Err(ServiceError::NotFound(msg)) if msg.contains("Item"));
}

#[tokio::test]
async fn remove_item_deletes_line() {
    let app = TestApp::new().await;
    let carts = app.cart_service();

    let user = seed_user(&app, "shopper@example.com").await;
    let cat = seed_category(&app, "Shoes").await;
    let product = seed_product(&app, cat.id, "Runner", dec!(120.00), 10).await;

    carts
        .add_item(add_input(user.id, product.id, Some(1)))
        .await
        .unwrap();
    carts.remove_item(user.id, product.id).await.unwrap();

    let cart = carts.get(user.id).await.unwrap();
    assert!(cart.items.is_empty());

    let result = carts.remove_item(user.id, product.id).await;
    assert_matches!(result, Err(ServiceError::NotFound(_)));
}

#[tokio::test]
async fn clear_empties_cart_and_is_idempotent_on_lines() {
    let app = TestApp::new().await;
    let carts = app.cart_service();

    let user = seed_user(&app, "shopper@example.com").await;
    let cat = seed_category(&app, "Shoes").await;
    let a = seed_product(&app, cat.id, "Runner", dec!(120.00), 10).await;
    let b = seed_product(&app, cat.id, "Walker", dec!(80.00), 10).await;

    carts.add_item(add_input(user.id, a.id, Some(1))).await.unwrap();
    carts.add_item(add_input(user.id, b.id, Some(2))).await.unwrap();

    carts.clear(user.id).await.expect("clear should succeed");
    let cart = carts.get(user.id).await.unwrap();
    assert!(cart.items.is_empty());

    // Clearing an already-empty cart is a no-op success
    carts.clear(user.id).await.expect("second clear succeeds");
}

#[tokio::test]
async fn clear_and_get_fail_without_cart() {
    let app = TestApp::new().await;
    let carts = app.cart_service();

    let user = seed_user(&app, "shopper@example.com").await;

    assert_matches!(carts.clear(user.id).await, Err(ServiceError::NotFound(_)));
    assert_matches!(carts.get(user.id).await, Err(ServiceError::NotFound(_)));
}
