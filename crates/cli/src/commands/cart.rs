//! Cart commands.

use maison_core::{CartItemId, Price, ProductId};
use maison_storefront::state::StoreContext;

use super::CliError;

/// Show the cart with derived totals.
pub async fn show(ctx: &StoreContext) -> Result<(), CliError> {
    let lines = ctx.cart().lines().await;
    let totals = ctx.cart().totals().await;

    if lines.is_empty() {
        tracing::info!("Your cart is empty");
        return Ok(());
    }

    for line in &lines {
        tracing::info!(
            "[item {}] {} x{} @ {} = {}",
            line.item_id,
            line.name,
            line.quantity,
            line.unit_price,
            line.unit_price.line_total(line.quantity)
        );
    }
    tracing::info!("Subtotal: {}", totals.subtotal);
    if totals.shipping_cost == Price::ZERO {
        tracing::info!("Shipping: free");
    } else {
        tracing::info!(
            "Shipping: {} ({} more for free shipping)",
            totals.shipping_cost,
            totals.amount_to_free_shipping
        );
    }
    tracing::info!("Total: {} ({} item(s))", totals.total, totals.item_count);
    Ok(())
}

/// Add a product to the cart.
pub async fn add(ctx: &StoreContext, product_id: i64, quantity: u32) -> Result<(), CliError> {
    ctx.cart()
        .add_item(ProductId::new(product_id), quantity)
        .await?;
    tracing::info!(
        "Added product {product_id} x{quantity}; cart now has {} item(s)",
        ctx.cart().item_count().await
    );
    Ok(())
}

/// Set a cart line's quantity (0 removes the line).
pub async fn set(ctx: &StoreContext, item_id: i64, quantity: u32) -> Result<(), CliError> {
    ctx.cart()
        .update_quantity(CartItemId::new(item_id), quantity)
        .await?;
    if quantity == 0 {
        tracing::info!("Removed item {item_id}");
    } else {
        tracing::info!("Item {item_id} set to x{quantity}");
    }
    Ok(())
}

/// Remove a cart line.
pub async fn remove(ctx: &StoreContext, item_id: i64) -> Result<(), CliError> {
    ctx.cart().remove_item(CartItemId::new(item_id)).await?;
    tracing::info!("Removed item {item_id}");
    Ok(())
}
