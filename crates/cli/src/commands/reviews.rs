//! Review commands.

use maison_core::ProductId;
use maison_storefront::reviews::ReviewNode;
use maison_storefront::state::StoreContext;

use super::CliError;

/// Show a product's review thread.
pub async fn show(ctx: &StoreContext, product_id: i64) -> Result<(), CliError> {
    let forest = ctx.reviews().fetch_forest(ProductId::new(product_id)).await?;

    if forest.is_empty() {
        tracing::info!("No reviews yet");
        return Ok(());
    }

    for node in &forest {
        print_node(node, 0);
    }
    Ok(())
}

fn print_node(node: &ReviewNode, depth: usize) {
    let indent = "  ".repeat(depth);
    let stars = node.rating.map_or_else(String::new, |rating| {
        format!(" {}", "*".repeat(usize::from(rating)))
    });
    tracing::info!("{indent}[{}]{stars} {}", node.created_at.date_naive(), node.comment);
    for child in &node.children {
        print_node(child, depth + 1);
    }
}

/// Post a review. It is created pending and appears after moderation.
pub async fn post(
    ctx: &StoreContext,
    product_id: i64,
    rating: u8,
    comment: &str,
) -> Result<(), CliError> {
    ctx.reviews()
        .submit(ProductId::new(product_id), rating, comment)
        .await?;
    tracing::info!("Review submitted; it will appear once approved");
    Ok(())
}
