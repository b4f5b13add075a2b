//! Product browsing commands.

use maison_core::ProductId;
use maison_storefront::gateway::types::CatalogFilter;
use maison_storefront::state::StoreContext;

use super::CliError;

/// List products, optionally filtered.
pub async fn list(
    ctx: &StoreContext,
    category: Option<String>,
    discounted: bool,
) -> Result<(), CliError> {
    let filter = CatalogFilter {
        category,
        discounted_only: discounted,
    };
    let products = ctx.catalog().products(&filter).await?;

    tracing::info!("{} product(s)", products.len());
    for product in &products {
        tracing::info!(
            "#{} {} - {} ({}){}",
            product.id,
            product.name,
            product.price,
            product.category,
            if product.is_discounted {
                " [discounted]"
            } else {
                ""
            }
        );
    }
    Ok(())
}

/// Show one product in detail, priming like state and recording a view.
pub async fn show(ctx: &StoreContext, product_id: i64) -> Result<(), CliError> {
    let id = ProductId::new(product_id);
    let product = ctx.catalog().product(id).await?;
    let likes = ctx.engagement().load(id).await?;
    let view_task = ctx.engagement().record_view(id);

    tracing::info!("{} ({})", product.name, product.category);
    tracing::info!("Price: {}", product.price);
    tracing::info!("{}", product.description);
    if let Some(material) = &product.material {
        tracing::info!("Material: {material}");
    }
    if let Some(size_guide) = &product.size_guide {
        tracing::info!("Size guide: {size_guide}");
    }
    if let Some(shipping_info) = &product.shipping_info {
        tracing::info!("Shipping: {shipping_info}");
    }
    tracing::info!(
        "{} like(s){} | {} view(s)",
        likes.likes_count,
        if likes.is_liked { " (you like this)" } else { "" },
        product.view_count
    );
    if product.is_low_stock() {
        tracing::warn!("Only {} left in stock!", product.stock_quantity);
    }

    // Let the fire-and-forget view land before the process exits
    if let Some(task) = view_task {
        let _ = task.await;
    }
    Ok(())
}
