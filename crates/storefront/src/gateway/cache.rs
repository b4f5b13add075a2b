//! Cache types for gateway catalog responses.

use super::types::Product;

/// Cached value types.
///
/// Only read-only catalog data is ever cached; cart and like state are
/// mutable, gateway-owned, and always fetched fresh.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Product(Box<Product>),
    Products(Vec<Product>),
}
