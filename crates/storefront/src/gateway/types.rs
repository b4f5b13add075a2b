//! Domain types for the remote data gateway.
//!
//! These mirror the gateway's row shapes one to one. Prices arrive as
//! integer minor units and are never recomputed client-side; `unit_price`
//! on a cart line is always the value the gateway last returned.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use maison_core::{CartItemId, Price, ProductId, ReviewId, ReviewStatus, UserId};

/// Stock level at or below which a product is surfaced as low-stock.
pub const LOW_STOCK_THRESHOLD: u32 = 5;

// =============================================================================
// Catalog Types
// =============================================================================

/// A storefront product row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    /// Unit price in minor currency units.
    pub price: Price,
    pub image_url: String,
    pub category: String,
    pub is_discounted: bool,
    /// Aggregate like count maintained by the gateway.
    pub likes_count: i64,
    /// Aggregate deduplicated view count maintained by the gateway.
    pub view_count: i64,
    pub stock_quantity: u32,
    pub material: Option<String>,
    pub size_guide: Option<String>,
    pub shipping_info: Option<String>,
}

impl Product {
    /// Whether the remaining stock is low enough to surface a warning.
    #[must_use]
    pub const fn is_low_stock(&self) -> bool {
        self.stock_quantity <= LOW_STOCK_THRESHOLD
    }
}

/// Filters for a catalog listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogFilter {
    /// Restrict to one category.
    pub category: Option<String>,
    /// Only discounted products.
    pub discounted_only: bool,
}

impl CatalogFilter {
    /// Whether any filter is active (filtered listings bypass the cache).
    #[must_use]
    pub const fn is_filtered(&self) -> bool {
        self.category.is_some() || self.discounted_only
    }
}

// =============================================================================
// Cart Types
// =============================================================================

/// One product's presence in a user's cart, as returned by the gateway.
///
/// `item_id` is the gateway-issued cart row identifier, unique within a
/// user's cart. A line with quantity 0 does not exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub item_id: CartItemId,
    pub product_id: ProductId,
    pub name: String,
    pub image_url: String,
    /// Authoritative unit price at fetch time, in minor currency units.
    #[serde(rename = "price")]
    pub unit_price: Price,
    pub quantity: u32,
}

// =============================================================================
// Review Types
// =============================================================================

/// A review or reply row as stored by the gateway (flat, parent-referencing).
///
/// `parent_id = None` marks a root review; a non-null `parent_id` references
/// another row's `id`. Nesting is materialized client-side by the review
/// tree builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub author_id: UserId,
    /// 1-5 star rating; `None` for a reply-only comment.
    pub rating: Option<u8>,
    pub comment: String,
    pub status: ReviewStatus,
    pub parent_id: Option<ReviewId>,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a new review.
///
/// The gateway always creates reviews with `status = pending` and
/// `parent_id = null`; replies are authored through the back office, not
/// this client.
#[derive(Debug, Clone, Serialize)]
pub struct NewReview {
    pub product_id: ProductId,
    pub author_id: UserId,
    pub rating: Option<u8>,
    pub comment: String,
    pub status: ReviewStatus,
    pub parent_id: Option<ReviewId>,
}

// =============================================================================
// Engagement Types
// =============================================================================

/// A user's like relationship with a product plus the aggregate count.
///
/// Owned by the gateway; the client holds a transient cached copy per viewed
/// product, replaced wholesale from toggle responses and never computed from
/// other fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeState {
    pub is_liked: bool,
    pub likes_count: i64,
}

/// Result row of the `toggle_like` remote procedure.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ToggleLikeRow {
    pub is_liked: bool,
    pub new_like_count: i64,
}

/// Result row of the `get_like_status` remote procedure.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LikeStatusRow {
    pub is_liked: bool,
}
