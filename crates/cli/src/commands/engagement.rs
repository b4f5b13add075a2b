//! Engagement commands.

use maison_core::ProductId;
use maison_storefront::state::StoreContext;

use super::CliError;

/// Toggle a like on a product.
pub async fn like(ctx: &StoreContext, product_id: i64) -> Result<(), CliError> {
    let state = ctx.engagement().toggle_like(ProductId::new(product_id)).await?;
    if state.is_liked {
        tracing::info!("Liked product {product_id} ({} like(s))", state.likes_count);
    } else {
        tracing::info!("Unliked product {product_id} ({} like(s))", state.likes_count);
    }
    Ok(())
}

/// Record a product view.
pub async fn view(ctx: &StoreContext, product_id: i64) -> Result<(), CliError> {
    match ctx.engagement().record_view(ProductId::new(product_id)) {
        Some(task) => {
            // Let the fire-and-forget call land before the process exits
            let _ = task.await;
            tracing::info!("View recorded for product {product_id}");
        }
        None => tracing::info!("Sign in to have views counted"),
    }
    Ok(())
}
