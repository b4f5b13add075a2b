//! Integration tests for cart synchronization.
//!
//! These exercise the real client against the mock gateway: projection
//! consistency at quiescence, busy guards, and the fail-closed contract
//! (a failed mutation never corrupts the projection).

use std::time::Duration;

use maison_core::{CartItemId, Price, ProductId};
use maison_storefront::cart::{FLAT_SHIPPING_FEE, FREE_SHIPPING_THRESHOLD, LineStatus};
use maison_storefront::error::StoreError;

use maison_integration_tests::TestContext;

// =============================================================================
// Load & Anonymous State
// =============================================================================

#[tokio::test]
async fn test_anonymous_cart_is_empty_not_an_error() {
    let t = TestContext::new().await;

    t.ctx.cart().load().await.expect("anonymous load succeeds");
    assert!(t.ctx.cart().lines().await.is_empty());
    assert_eq!(t.ctx.cart().item_count().await, 0);
}

#[tokio::test]
async fn test_load_replaces_projection_wholesale() {
    let t = TestContext::new().await;
    t.gateway.seed_product(1, "Silk scarf", 120_000, "accessories");
    t.sign_in().await;

    t.ctx
        .cart()
        .add_item(ProductId::new(1), 2)
        .await
        .expect("add");

    let lines = t.ctx.cart().lines().await;
    assert_eq!(lines.len(), 1);
    let line = lines.first().expect("line");
    assert_eq!(line.quantity, 2);
    // Unit price is the gateway's value, never computed client-side
    assert_eq!(line.unit_price, Price::from_minor(120_000));
}

// =============================================================================
// add_item
// =============================================================================

#[tokio::test]
async fn test_add_item_requires_authentication() {
    let t = TestContext::new().await;
    t.gateway.seed_product(1, "Silk scarf", 120_000, "accessories");

    let err = t
        .ctx
        .cart()
        .add_item(ProductId::new(1), 1)
        .await
        .expect_err("anonymous add must fail");
    assert!(matches!(err, StoreError::Unauthenticated));
    assert!(t.ctx.cart().lines().await.is_empty());
}

#[tokio::test]
async fn test_add_item_rejects_zero_quantity() {
    let t = TestContext::new().await;
    t.gateway.seed_product(1, "Silk scarf", 120_000, "accessories");
    t.sign_in().await;

    let err = t
        .ctx
        .cart()
        .add_item(ProductId::new(1), 0)
        .await
        .expect_err("zero quantity must fail");
    assert!(matches!(err, StoreError::Validation(_)));
}

#[tokio::test]
async fn test_repeat_add_collapses_into_one_line() {
    let t = TestContext::new().await;
    t.gateway.seed_product(1, "Silk scarf", 120_000, "accessories");
    t.sign_in().await;

    t.ctx.cart().add_item(ProductId::new(1), 1).await.expect("first add");
    t.ctx.cart().add_item(ProductId::new(1), 2).await.expect("second add");

    // Only the gateway knows the add collapsed; the reload reflects it
    let lines = t.ctx.cart().lines().await;
    assert_eq!(lines.len(), 1);
    assert_eq!(lines.first().expect("line").quantity, 3);
}

#[tokio::test]
async fn test_concurrent_add_fails_fast_with_busy() {
    let t = TestContext::new().await;
    t.gateway.seed_product(1, "Silk scarf", 120_000, "accessories");
    t.sign_in().await;
    t.gateway.delay_rpc("add_to_cart", Duration::from_millis(150));

    let ctx = t.ctx.clone();
    let first = tokio::spawn(async move { ctx.cart().add_item(ProductId::new(1), 1).await });

    // Let the first add reach its suspension point
    tokio::time::sleep(Duration::from_millis(40)).await;
    assert!(t.ctx.cart().is_adding().await);

    let second = t.ctx.cart().add_item(ProductId::new(1), 1).await;
    assert!(
        matches!(second, Err(StoreError::Busy(_))),
        "second add must be rejected, not queued: {second:?}"
    );

    first.await.expect("join").expect("first add succeeds");

    // Exactly one successful mutation reached the gateway
    let lines = t.ctx.cart().lines().await;
    assert_eq!(lines.len(), 1);
    assert_eq!(lines.first().expect("line").quantity, 1);
}

#[tokio::test]
async fn test_failed_add_leaves_projection_unchanged() {
    let t = TestContext::new().await;
    t.gateway.seed_product(1, "Silk scarf", 120_000, "accessories");
    t.sign_in().await;
    t.ctx.cart().add_item(ProductId::new(1), 1).await.expect("seed add");
    let before = t.ctx.cart().lines().await;

    t.gateway.fail_rpc("add_to_cart");
    let err = t
        .ctx
        .cart()
        .add_item(ProductId::new(1), 5)
        .await
        .expect_err("injected failure");
    assert!(matches!(err, StoreError::Gateway(_)));

    // No stale incremented state: the projection is bit-for-bit unchanged
    assert_eq!(t.ctx.cart().lines().await, before);

    // The guard is clear; an immediate retry works once the gateway recovers
    t.gateway.clear_failures();
    t.ctx.cart().add_item(ProductId::new(1), 5).await.expect("retry succeeds");
    assert_eq!(t.ctx.cart().item_count().await, 6);
}

// =============================================================================
// update_quantity / remove_item
// =============================================================================

#[tokio::test]
async fn test_update_quantity_patches_in_place() {
    let t = TestContext::new().await;
    t.gateway.seed_product(1, "Silk scarf", 120_000, "accessories");
    t.sign_in().await;
    t.ctx.cart().add_item(ProductId::new(1), 1).await.expect("add");

    let item_id = t.ctx.cart().lines().await.first().expect("line").item_id;
    t.ctx
        .cart()
        .update_quantity(item_id, 3)
        .await
        .expect("update");

    let lines = t.ctx.cart().lines().await;
    assert_eq!(lines.first().expect("line").quantity, 3);
    assert_eq!(t.ctx.cart().item_count().await, 3);
}

#[tokio::test]
async fn test_update_quantity_zero_removes_line() {
    let t = TestContext::new().await;
    t.gateway.seed_product(1, "Silk scarf", 120_000, "accessories");
    t.sign_in().await;
    t.ctx.cart().add_item(ProductId::new(1), 2).await.expect("add");

    let item_id = t.ctx.cart().lines().await.first().expect("line").item_id;
    t.ctx
        .cart()
        .update_quantity(item_id, 0)
        .await
        .expect("update to zero");

    // No line with quantity 0 is ever present
    assert!(t.ctx.cart().lines().await.is_empty());
    assert!(t.gateway.db().carts.values().all(|c| c.is_empty()));
}

#[tokio::test]
async fn test_failed_update_leaves_projection_unchanged() {
    let t = TestContext::new().await;
    t.gateway.seed_product(1, "Silk scarf", 120_000, "accessories");
    t.gateway.seed_product(2, "Linen dress", 450_000, "dresses");
    t.sign_in().await;
    t.ctx.cart().add_item(ProductId::new(1), 2).await.expect("add 1");
    t.ctx.cart().add_item(ProductId::new(2), 1).await.expect("add 2");

    let before_lines = t.ctx.cart().lines().await;
    let before_totals = t.ctx.cart().totals().await;
    let item_id = before_lines.first().expect("line").item_id;

    t.gateway.fail_rpc("update_cart_quantity");
    let err = t
        .ctx
        .cart()
        .update_quantity(item_id, 9)
        .await
        .expect_err("injected failure");
    assert!(matches!(err, StoreError::Gateway(_)));

    // Full projection - all lines, all fields - unchanged
    assert_eq!(t.ctx.cart().lines().await, before_lines);
    assert_eq!(t.ctx.cart().totals().await, before_totals);
    // The line is parked idle-with-error, distinguishable from in-progress
    assert!(!t.ctx.cart().is_line_pending(item_id).await);
    assert!(matches!(
        t.ctx.cart().line_status(item_id).await,
        LineStatus::Failed(_)
    ));

    // A retry reclaims the line and settles back to idle on success
    t.gateway.clear_failures();
    t.ctx
        .cart()
        .update_quantity(item_id, 9)
        .await
        .expect("retry succeeds");
    assert_eq!(t.ctx.cart().line_status(item_id).await, LineStatus::Idle);
    assert_eq!(
        t.ctx.cart().lines().await.first().expect("line").quantity,
        9
    );
}

#[tokio::test]
async fn test_update_unknown_item_is_not_found_before_network() {
    let t = TestContext::new().await;
    t.sign_in().await;

    let err = t
        .ctx
        .cart()
        .update_quantity(CartItemId::new(999), 2)
        .await
        .expect_err("stale item id");
    assert!(matches!(err, StoreError::NotFound(_)));
}

#[tokio::test]
async fn test_remove_item_and_failed_remove() {
    let t = TestContext::new().await;
    t.gateway.seed_product(1, "Silk scarf", 120_000, "accessories");
    t.sign_in().await;
    t.ctx.cart().add_item(ProductId::new(1), 2).await.expect("add");
    let item_id = t.ctx.cart().lines().await.first().expect("line").item_id;

    t.gateway.fail_rpc("remove_from_cart");
    let err = t
        .ctx
        .cart()
        .remove_item(item_id)
        .await
        .expect_err("injected failure");
    assert!(matches!(err, StoreError::Gateway(_)));
    assert_eq!(t.ctx.cart().lines().await.len(), 1);

    t.gateway.clear_failures();
    t.ctx.cart().remove_item(item_id).await.expect("remove");
    assert!(t.ctx.cart().lines().await.is_empty());
}

#[tokio::test]
async fn test_same_line_serialized_other_lines_mutable() {
    let t = TestContext::new().await;
    t.gateway.seed_product(1, "Silk scarf", 120_000, "accessories");
    t.gateway.seed_product(2, "Linen dress", 450_000, "dresses");
    t.sign_in().await;
    t.ctx.cart().add_item(ProductId::new(1), 1).await.expect("add 1");
    t.ctx.cart().add_item(ProductId::new(2), 1).await.expect("add 2");

    let lines = t.ctx.cart().lines().await;
    let first_item = lines.first().expect("line 1").item_id;
    let second_item = lines.get(1).expect("line 2").item_id;

    t.gateway
        .delay_rpc("update_cart_quantity", Duration::from_millis(150));

    let ctx = t.ctx.clone();
    let slow = tokio::spawn(async move { ctx.cart().update_quantity(first_item, 4).await });
    tokio::time::sleep(Duration::from_millis(40)).await;
    assert!(t.ctx.cart().is_line_pending(first_item).await);
    assert!(!t.ctx.cart().is_line_pending(second_item).await);

    // Same line: rejected immediately
    let conflict = t.ctx.cart().update_quantity(first_item, 5).await;
    assert!(matches!(conflict, Err(StoreError::Busy(_))));

    // Different line: proceeds (slowly, but unguarded)
    t.ctx
        .cart()
        .update_quantity(second_item, 2)
        .await
        .expect("other line mutable");

    slow.await.expect("join").expect("slow update succeeds");

    let lines = t.ctx.cart().lines().await;
    assert_eq!(lines.first().expect("line 1").quantity, 4);
    assert_eq!(lines.get(1).expect("line 2").quantity, 2);
}

// =============================================================================
// Derived Totals
// =============================================================================

#[tokio::test]
async fn test_totals_follow_gateway_prices() {
    let t = TestContext::new().await;
    t.gateway.seed_product(1, "Silk scarf", 100_000, "accessories");
    t.gateway.seed_product(2, "Hair pin", 50_000, "accessories");
    t.sign_in().await;
    t.ctx.cart().add_item(ProductId::new(1), 2).await.expect("add 1");
    t.ctx.cart().add_item(ProductId::new(2), 1).await.expect("add 2");

    let totals = t.ctx.cart().totals().await;
    assert_eq!(totals.subtotal, Price::from_minor(250_000));
    assert_eq!(totals.shipping_cost, FLAT_SHIPPING_FEE);
    assert_eq!(totals.total, Price::from_minor(280_000));
    assert_eq!(totals.item_count, 3);

    // Double the quantities: subtotal lands exactly on the threshold, which
    // is NOT free shipping (strict greater-than)
    let lines = t.ctx.cart().lines().await;
    for line in &lines {
        t.ctx
            .cart()
            .update_quantity(line.item_id, line.quantity * 2)
            .await
            .expect("double");
    }
    let totals = t.ctx.cart().totals().await;
    assert_eq!(totals.subtotal, FREE_SHIPPING_THRESHOLD);
    assert_eq!(totals.shipping_cost, FLAT_SHIPPING_FEE);
    assert_eq!(totals.total, Price::from_minor(530_000));
}

// =============================================================================
// Session Lifecycle
// =============================================================================

#[tokio::test]
async fn test_user_switch_resets_projection() {
    let t = TestContext::new().await;
    t.gateway.seed_product(1, "Silk scarf", 120_000, "accessories");

    t.sign_in().await;
    t.ctx.cart().add_item(ProductId::new(1), 2).await.expect("add");
    assert_eq!(t.ctx.cart().item_count().await, 2);

    // A different user signs in: no stale cross-user data may survive
    t.sign_in().await;
    assert!(t.ctx.cart().lines().await.is_empty());

    // Sign-out resets to the anonymous empty state
    t.ctx.session().sign_out();
    t.ctx.session_changed().await.expect("reset");
    assert!(t.ctx.cart().lines().await.is_empty());
}
