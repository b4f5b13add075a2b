//! Remote data gateway client.
//!
//! The gateway owns all persistent state - products, carts, reviews, and
//! engagement counters - and exposes it as named remote procedures
//! (`POST /rest/v1/rpc/{function}`) and table reads (`GET /rest/v1/{table}`).
//! Every request carries the configured API key; user-scoped calls
//! additionally carry the session's bearer token.
//!
//! Catalog reads are cached using `moka` (5-minute TTL). Cart and like
//! state are never cached: they are mutable and the gateway is the single
//! source of truth for them.

mod cache;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use maison_core::{CartItemId, ProductId};

use crate::config::GatewayConfig;

use cache::CacheValue;
use types::{
    CartLine, CatalogFilter, LikeStatusRow, NewReview, Product, ReviewRecord, ToggleLikeRow,
};

/// Catalog cache TTL in seconds.
const CACHE_TTL_SECS: u64 = 300; // 5 minutes

/// Errors that can occur when talking to the gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Gateway returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to build a request or parse a response.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the gateway.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),
}

// =============================================================================
// GatewayClient
// =============================================================================

/// Client for the remote data gateway.
///
/// Cheaply cloneable via `Arc`; one instance is shared by every service in
/// the process.
#[derive(Clone)]
pub struct GatewayClient {
    inner: Arc<GatewayClientInner>,
}

struct GatewayClientInner {
    client: reqwest::Client,
    base: Url,
    key: SecretString,
    cache: Cache<String, CacheValue>,
}

impl GatewayClient {
    /// Create a new gateway client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build or the key is not
    /// a valid header value.
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let mut headers = HeaderMap::new();

        let mut key_value = HeaderValue::from_str(config.key.expose_secret())
            .map_err(|e| GatewayError::Parse(format!("Invalid gateway key format: {e}")))?;
        key_value.set_sensitive(true);
        headers.insert("apikey", key_value);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(CACHE_TTL_SECS))
            .build();

        Ok(Self {
            inner: Arc::new(GatewayClientInner {
                client,
                base: config.url.clone(),
                key: config.key.clone(),
                cache,
            }),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, GatewayError> {
        self.inner
            .base
            .join(path)
            .map_err(|e| GatewayError::Parse(format!("Invalid endpoint {path}: {e}")))
    }

    /// Bearer value for a request: the user token, or the key itself for
    /// anonymous reads.
    fn bearer(&self, auth: Option<&SecretString>) -> String {
        let token = auth.unwrap_or(&self.inner.key);
        format!("Bearer {}", token.expose_secret())
    }

    /// Shared response handling: rate limiting, error mapping, body text.
    async fn check(response: reqwest::Response) -> Result<String, GatewayError> {
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(GatewayError::RateLimited(retry_after));
        }

        let text = response.text().await?;

        if !status.is_success() {
            let message = parse_error_message(&text);
            tracing::error!(
                status = %status,
                message = %message,
                "Gateway returned non-success status"
            );
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(text)
    }

    /// Execute a named remote procedure and decode its JSON result.
    #[instrument(skip(self, params, auth), fields(function = %function))]
    async fn rpc<T: DeserializeOwned>(
        &self,
        function: &str,
        params: serde_json::Value,
        auth: Option<&SecretString>,
    ) -> Result<T, GatewayError> {
        let url = self.endpoint(&format!("/rest/v1/rpc/{function}"))?;

        let response = self
            .inner
            .client
            .post(url)
            .header(AUTHORIZATION, self.bearer(auth))
            .json(&params)
            .send()
            .await?;

        let text = Self::check(response).await?;

        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(
                function = %function,
                error = %e,
                body = %text.chars().take(500).collect::<String>(),
                "Failed to parse gateway RPC response"
            );
            GatewayError::Parse(e.to_string())
        })
    }

    /// Execute a named remote procedure, discarding any result payload.
    #[instrument(skip(self, params, auth), fields(function = %function))]
    async fn rpc_ack(
        &self,
        function: &str,
        params: serde_json::Value,
        auth: Option<&SecretString>,
    ) -> Result<(), GatewayError> {
        let url = self.endpoint(&format!("/rest/v1/rpc/{function}"))?;

        let response = self
            .inner
            .client
            .post(url)
            .header(AUTHORIZATION, self.bearer(auth))
            .json(&params)
            .send()
            .await?;

        Self::check(response).await?;
        Ok(())
    }

    /// Read rows from a table with PostgREST-style filters.
    #[instrument(skip(self, filters, auth), fields(table = %table))]
    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[(&str, String)],
        auth: Option<&SecretString>,
    ) -> Result<Vec<T>, GatewayError> {
        let mut url = self.endpoint(&format!("/rest/v1/{table}"))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("select", "*");
            for (name, value) in filters {
                pairs.append_pair(name, value);
            }
        }

        let response = self
            .inner
            .client
            .get(url)
            .header(AUTHORIZATION, self.bearer(auth))
            .send()
            .await?;

        let text = Self::check(response).await?;

        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(
                table = %table,
                error = %e,
                body = %text.chars().take(500).collect::<String>(),
                "Failed to parse gateway table response"
            );
            GatewayError::Parse(e.to_string())
        })
    }

    /// Insert one row into a table.
    #[instrument(skip(self, row, auth), fields(table = %table))]
    async fn insert<T: Serialize + ?Sized>(
        &self,
        table: &str,
        row: &T,
        auth: Option<&SecretString>,
    ) -> Result<(), GatewayError> {
        let url = self.endpoint(&format!("/rest/v1/{table}"))?;

        let response = self
            .inner
            .client
            .post(url)
            .header(AUTHORIZATION, self.bearer(auth))
            .header("Prefer", "return=minimal")
            .json(row)
            .send()
            .await?;

        Self::check(response).await?;
        Ok(())
    }

    // =========================================================================
    // Catalog Methods (cached)
    // =========================================================================

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the product is not found or the request fails.
    pub async fn fetch_product(&self, id: ProductId) -> Result<Product, GatewayError> {
        let cache_key = format!("product:{id}");

        // Check cache
        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let rows: Vec<Product> = self
            .select("products", &[("id", format!("eq.{id}"))], None)
            .await?;

        let product = rows
            .into_iter()
            .next()
            .ok_or_else(|| GatewayError::NotFound(format!("product {id}")))?;

        // Cache the result
        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// List products, name-ordered, optionally filtered.
    ///
    /// Only the unfiltered listing is cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn fetch_products(
        &self,
        filter: &CatalogFilter,
    ) -> Result<Vec<Product>, GatewayError> {
        let cache_key = "products:all".to_string();

        if !filter.is_filtered()
            && let Some(CacheValue::Products(products)) = self.inner.cache.get(&cache_key).await
        {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let mut filters: Vec<(&str, String)> = vec![("order", "name.asc".to_string())];
        if let Some(category) = &filter.category {
            filters.push(("category", format!("eq.{category}")));
        }
        if filter.discounted_only {
            filters.push(("is_discounted", "eq.true".to_string()));
        }

        let products: Vec<Product> = self.select("products", &filters, None).await?;

        if !filter.is_filtered() {
            self.inner
                .cache
                .insert(cache_key, CacheValue::Products(products.clone()))
                .await;
        }

        Ok(products)
    }

    // =========================================================================
    // Cart Methods (not cached - mutable state)
    // =========================================================================

    /// Fetch the authenticated user's full cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn fetch_cart(&self, auth: &SecretString) -> Result<Vec<CartLine>, GatewayError> {
        self.rpc("get_cart_for_user", serde_json::json!({}), Some(auth))
            .await
    }

    /// Add a product to the authenticated user's cart.
    ///
    /// The gateway decides whether the add collapses into an existing line
    /// or creates a new one; callers re-fetch the cart to observe the
    /// result.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn add_to_cart(
        &self,
        product_id: ProductId,
        quantity: u32,
        auth: &SecretString,
    ) -> Result<(), GatewayError> {
        self.rpc_ack(
            "add_to_cart",
            serde_json::json!({
                "product_id_to_add": product_id,
                "quantity_to_add": quantity,
            }),
            Some(auth),
        )
        .await
    }

    /// Set the quantity of a cart line. Quantity 0 removes the line.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn update_cart_quantity(
        &self,
        item_id: CartItemId,
        new_quantity: u32,
        auth: &SecretString,
    ) -> Result<(), GatewayError> {
        self.rpc_ack(
            "update_cart_quantity",
            serde_json::json!({
                "item_id_to_update": item_id,
                "new_quantity": new_quantity,
            }),
            Some(auth),
        )
        .await
    }

    /// Remove a cart line.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn remove_from_cart(
        &self,
        item_id: CartItemId,
        auth: &SecretString,
    ) -> Result<(), GatewayError> {
        self.rpc_ack(
            "remove_from_cart",
            serde_json::json!({ "item_id_to_remove": item_id }),
            Some(auth),
        )
        .await
    }

    // =========================================================================
    // Review Methods
    // =========================================================================

    /// Fetch a product's approved reviews, ascending by creation time.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn fetch_reviews(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<ReviewRecord>, GatewayError> {
        self.select(
            "reviews",
            &[
                ("product_id", format!("eq.{product_id}")),
                ("status", "eq.approved".to_string()),
                ("order", "created_at.asc".to_string()),
            ],
            None,
        )
        .await
    }

    /// Submit a new review.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn submit_review(
        &self,
        review: &NewReview,
        auth: &SecretString,
    ) -> Result<(), GatewayError> {
        self.insert("reviews", review, Some(auth)).await
    }

    // =========================================================================
    // Engagement Methods (not cached - mutable state)
    // =========================================================================

    /// Toggle the authenticated user's like on a product.
    ///
    /// Returns the authoritative post-toggle state.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or returns no row.
    pub async fn toggle_like(
        &self,
        product_id: ProductId,
        auth: &SecretString,
    ) -> Result<ToggleLikeRow, GatewayError> {
        let rows: Vec<ToggleLikeRow> = self
            .rpc(
                "toggle_like",
                serde_json::json!({ "product_id_to_toggle": product_id }),
                Some(auth),
            )
            .await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| GatewayError::NotFound(format!("like state for product {product_id}")))
    }

    /// Fetch whether the authenticated user has liked a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or returns no row.
    pub async fn fetch_like_state(
        &self,
        product_id: ProductId,
        auth: &SecretString,
    ) -> Result<LikeStatusRow, GatewayError> {
        let rows: Vec<LikeStatusRow> = self
            .rpc(
                "get_like_status",
                serde_json::json!({ "product_id_to_check": product_id }),
                Some(auth),
            )
            .await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| GatewayError::NotFound(format!("like state for product {product_id}")))
    }

    /// Record a product view for the authenticated user.
    ///
    /// The gateway deduplicates repeat views from the same user.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn record_view(
        &self,
        product_id: ProductId,
        auth: &SecretString,
    ) -> Result<(), GatewayError> {
        self.rpc_ack(
            "add_view_if_not_exists",
            serde_json::json!({ "product_id_to_view": product_id }),
            Some(auth),
        )
        .await
    }

    // =========================================================================
    // Cache Management
    // =========================================================================

    /// Invalidate a cached product.
    pub async fn invalidate_product(&self, id: ProductId) {
        self.inner.cache.invalidate(&format!("product:{id}")).await;
    }

    /// Invalidate all cached catalog data.
    pub async fn invalidate_all(&self) {
        self.inner.cache.invalidate_all();
        self.inner.cache.run_pending_tasks().await;
    }
}

/// Extract the gateway's error message from a response body.
///
/// The gateway reports errors as `{"message": "..."}`; anything else is
/// passed through truncated.
fn parse_error_message(body: &str) -> String {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        message: String,
    }

    serde_json::from_str::<ErrorBody>(body).map_or_else(
        |_| {
            let trimmed: String = body.chars().take(200).collect();
            if trimmed.is_empty() {
                "(no error details provided)".to_string()
            } else {
                trimmed
            }
        },
        |parsed| parsed.message,
    )
}
