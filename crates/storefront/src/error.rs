//! Unified error handling for storefront operations.
//!
//! All public operations return `Result<T, StoreError>`. Validation and
//! authentication failures are produced before any network call; busy
//! rejections come from the local per-entity guards; gateway failures are
//! only knowable after the call resolves. In every failure case the owning
//! projection is left in its last confirmed-good state.

use thiserror::Error;

use crate::gateway::GatewayError;

/// Application-level error type for storefront operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Operation requires an authenticated user and none is signed in.
    #[error("Authentication required")]
    Unauthenticated,

    /// A conflicting operation on the same entity is already in flight.
    ///
    /// The caller should retry once the pending operation resolves; requests
    /// are rejected rather than queued.
    #[error("Operation already in flight: {0}")]
    Busy(String),

    /// Input rejected before any network call.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Referenced entity is absent (e.g., a stale cart item ID).
    #[error("Not found: {0}")]
    NotFound(String),

    /// The gateway returned an error or was unreachable.
    #[error("Gateway error: {0}")]
    Gateway(GatewayError),
}

impl From<GatewayError> for StoreError {
    fn from(err: GatewayError) -> Self {
        // A remote miss is a domain-level NotFound, not an opaque failure
        match err {
            GatewayError::NotFound(what) => Self::NotFound(what),
            other => Self::Gateway(other),
        }
    }
}

impl StoreError {
    /// Whether this error is a local busy-guard rejection.
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        matches!(self, Self::Busy(_))
    }
}

/// Result type alias for `StoreError`.
pub type Result<T> = std::result::Result<T, StoreError>;
