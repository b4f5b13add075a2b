//! Read-only product browsing.
//!
//! Thin service over the gateway's catalog reads. Listings and single
//! products are cached by the gateway client (5-minute TTL); filtered
//! listings bypass the cache.

use maison_core::ProductId;

use crate::error::Result;
use crate::gateway::GatewayClient;
use crate::gateway::types::{CatalogFilter, Product};

/// Product browsing against the gateway catalog.
pub struct CatalogService {
    gateway: GatewayClient,
}

impl CatalogService {
    pub(crate) const fn new(gateway: GatewayClient) -> Self {
        Self { gateway }
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown product, or a gateway error.
    pub async fn product(&self, id: ProductId) -> Result<Product> {
        Ok(self.gateway.fetch_product(id).await?)
    }

    /// List products, name-ordered, optionally filtered.
    ///
    /// # Errors
    ///
    /// Returns an error if the gateway call fails.
    pub async fn products(&self, filter: &CatalogFilter) -> Result<Vec<Product>> {
        Ok(self.gateway.fetch_products(filter).await?)
    }
}
