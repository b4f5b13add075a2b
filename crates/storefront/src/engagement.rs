//! Like toggling and view recording.
//!
//! Like state is gateway-owned; the tracker keeps a transient cached copy
//! per viewed product and replaces it wholesale from toggle responses. The
//! count is never incremented locally - under concurrent likers the
//! authoritative count can diverge from a naive local +1/-1.
//!
//! Toggles are guarded per product (not globally), so a rapid double-click
//! cannot issue two toggles that cancel each other out server-side while
//! likes on other products proceed freely.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use maison_core::ProductId;

use crate::error::{Result, StoreError};
use crate::gateway::GatewayClient;
use crate::gateway::types::LikeState;
use crate::session::SessionProvider;

#[derive(Debug, Default)]
struct EngagementState {
    /// Cached like state per viewed product.
    likes: HashMap<ProductId, LikeState>,
    /// Products with a toggle in flight.
    pending: HashSet<ProductId>,
}

/// Tracker for per-product engagement (likes and views).
pub struct EngagementTracker {
    gateway: GatewayClient,
    session: Arc<SessionProvider>,
    state: Mutex<EngagementState>,
}

impl EngagementTracker {
    pub(crate) fn new(gateway: GatewayClient, session: Arc<SessionProvider>) -> Self {
        Self {
            gateway,
            session,
            state: Mutex::new(EngagementState::default()),
        }
    }

    /// Prime the cached like state for a product.
    ///
    /// The aggregate count comes from the product record; whether the
    /// current user has liked it comes from the gateway when signed in and
    /// is `false` for anonymous visitors.
    ///
    /// # Errors
    ///
    /// Returns an error if a gateway call fails; the cache is unchanged in
    /// that case.
    #[instrument(skip(self))]
    pub async fn load(&self, product_id: ProductId) -> Result<LikeState> {
        let product = self.gateway.fetch_product(product_id).await?;

        let is_liked = match self.session.current() {
            Some(auth) => {
                self.gateway
                    .fetch_like_state(product_id, auth.token())
                    .await?
                    .is_liked
            }
            None => false,
        };

        let state = LikeState {
            is_liked,
            likes_count: product.likes_count,
        };
        self.state.lock().await.likes.insert(product_id, state);
        Ok(state)
    }

    /// Toggle the current user's like on a product.
    ///
    /// On success both `is_liked` and `likes_count` are replaced wholesale
    /// from the gateway's response. On failure the cached state is left
    /// bit-for-bit unchanged and the error is surfaced.
    ///
    /// # Errors
    ///
    /// Returns `Unauthenticated` without a signed-in user (before any
    /// network call), `Busy` while a toggle for the same product is in
    /// flight, or a gateway error.
    #[instrument(skip(self))]
    pub async fn toggle_like(&self, product_id: ProductId) -> Result<LikeState> {
        let auth = self.session.current().ok_or(StoreError::Unauthenticated)?;

        {
            let mut state = self.state.lock().await;
            if !state.pending.insert(product_id) {
                return Err(StoreError::Busy(format!("like for product {product_id}")));
            }
        }

        let result = self.gateway.toggle_like(product_id, auth.token()).await;

        let mut state = self.state.lock().await;
        state.pending.remove(&product_id);
        let row = result?;

        let new_state = LikeState {
            is_liked: row.is_liked,
            likes_count: row.new_like_count,
        };
        if self.session.current_user() == Some(auth.user_id) {
            state.likes.insert(product_id, new_state);
        } else {
            debug!(%product_id, "session changed during like toggle; discarding response");
        }
        Ok(new_state)
    }

    /// Record a product view, fire-and-forget.
    ///
    /// The gateway deduplicates repeat views from the same user; the client
    /// makes no local dedup decision and never blocks on the result.
    /// Failures are logged, not surfaced - a missed view count is not
    /// user-visible-critical. Anonymous views are skipped entirely (`None`).
    ///
    /// Returns the background task handle when a view was dispatched, for
    /// callers that need to outlive it (short-lived processes, tests).
    pub fn record_view(&self, product_id: ProductId) -> Option<tokio::task::JoinHandle<()>> {
        let Some(auth) = self.session.current() else {
            debug!(%product_id, "anonymous visitor; skipping view recording");
            return None;
        };

        let gateway = self.gateway.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = gateway.record_view(product_id, auth.token()).await {
                warn!(%product_id, error = %e, "failed to record product view");
            }
        }))
    }

    /// Cached like state for a product, if primed.
    pub async fn like_state(&self, product_id: ProductId) -> Option<LikeState> {
        self.state.lock().await.likes.get(&product_id).copied()
    }

    /// Whether a toggle for the given product is currently in flight.
    pub async fn is_toggling(&self, product_id: ProductId) -> bool {
        self.state.lock().await.pending.contains(&product_id)
    }

    /// Drop all cached state. Called on identity change; engagement state
    /// belongs to exactly one user.
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        state.likes.clear();
        state.pending.clear();
    }
}
