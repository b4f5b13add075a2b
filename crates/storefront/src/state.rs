//! Process-wide storefront context shared across presentation surfaces.

use std::sync::Arc;

use tracing::info;

use crate::cart::CartSynchronizer;
use crate::catalog::CatalogService;
use crate::config::StorefrontConfig;
use crate::engagement::EngagementTracker;
use crate::error::Result;
use crate::gateway::{GatewayClient, GatewayError};
use crate::reviews::ReviewService;
use crate::session::SessionProvider;

/// Process-wide storefront context with explicit lifecycle.
///
/// Initialized once on application start, reset wholesale on identity
/// change via [`session_changed`](Self::session_changed). Cheaply cloneable
/// via `Arc`; all presentation surfaces share one instance. The services it
/// owns are the only writers of their projections - presentation reads
/// derived state and invokes operations, nothing else crosses the boundary.
#[derive(Clone)]
pub struct StoreContext {
    inner: Arc<StoreContextInner>,
}

struct StoreContextInner {
    config: StorefrontConfig,
    gateway: GatewayClient,
    session: Arc<SessionProvider>,
    cart: CartSynchronizer,
    catalog: CatalogService,
    reviews: ReviewService,
    engagement: EngagementTracker,
}

impl StoreContext {
    /// Create a new storefront context from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the gateway client fails to build.
    pub fn new(config: StorefrontConfig) -> std::result::Result<Self, GatewayError> {
        let gateway = GatewayClient::new(&config.gateway)?;
        let session = Arc::new(SessionProvider::new());

        let cart = CartSynchronizer::new(gateway.clone(), Arc::clone(&session));
        let catalog = CatalogService::new(gateway.clone());
        let reviews = ReviewService::new(gateway.clone(), Arc::clone(&session), config.orphan_policy);
        let engagement = EngagementTracker::new(gateway.clone(), Arc::clone(&session));

        Ok(Self {
            inner: Arc::new(StoreContextInner {
                config,
                gateway,
                session,
                cart,
                catalog,
                reviews,
                engagement,
            }),
        })
    }

    /// Get a reference to the configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the gateway client.
    #[must_use]
    pub fn gateway(&self) -> &GatewayClient {
        &self.inner.gateway
    }

    /// Get a reference to the session provider.
    #[must_use]
    pub fn session(&self) -> &SessionProvider {
        &self.inner.session
    }

    /// Get a reference to the cart synchronizer.
    #[must_use]
    pub fn cart(&self) -> &CartSynchronizer {
        &self.inner.cart
    }

    /// Get a reference to the catalog service.
    #[must_use]
    pub fn catalog(&self) -> &CatalogService {
        &self.inner.catalog
    }

    /// Get a reference to the review service.
    #[must_use]
    pub fn reviews(&self) -> &ReviewService {
        &self.inner.reviews
    }

    /// Get a reference to the engagement tracker.
    #[must_use]
    pub fn engagement(&self) -> &EngagementTracker {
        &self.inner.engagement
    }

    /// Reset projections after an identity change.
    ///
    /// A cart belongs to exactly one identity; stale cross-user data must
    /// never survive a sign-in, sign-out, or user switch. Engagement caches
    /// are dropped and the cart is reloaded wholesale (to empty when the
    /// change was a sign-out).
    ///
    /// # Errors
    ///
    /// Returns an error if the cart reload fails; calling
    /// [`CartSynchronizer::load`] again is the recovery path.
    pub async fn session_changed(&self) -> Result<()> {
        self.inner.engagement.reset().await;
        self.inner.cart.load().await
    }

    /// Drive [`session_changed`](Self::session_changed) from the session
    /// provider's change stream until the provider is dropped.
    ///
    /// Long-running processes spawn this once; one-shot consumers (the CLI)
    /// call `session_changed` directly instead.
    pub async fn watch_sessions(&self) {
        let mut rx = self.inner.session.subscribe();
        while rx.changed().await.is_ok() {
            info!(
                user = ?self.inner.session.current_user(),
                "session changed; resetting projections"
            );
            if let Err(e) = self.session_changed().await {
                tracing::warn!(error = %e, "projection reset after session change failed");
            }
        }
    }
}
