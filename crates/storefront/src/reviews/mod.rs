//! Product reviews: fetching, materialization, and submission.
//!
//! Reviews live in the gateway as a flat, parent-referencing table. This
//! module fetches a product's approved batch, filters each record on its own
//! moderation status, and materializes the nested reply forest via
//! [`tree::build_forest`]. Submission validates before any network call and
//! always creates `pending`, root-level reviews - replies are authored in
//! the back office.

pub mod tree;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use maison_core::{ProductId, ReviewId, ReviewStatus, UserId};

use crate::error::{Result, StoreError};
use crate::gateway::GatewayClient;
use crate::gateway::types::{NewReview, ReviewRecord};
use crate::session::SessionProvider;

use tree::OrphanPolicy;

/// A review with its replies attached, as produced by the tree builder.
///
/// `children` exists only in this materialized form; it is never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewNode {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub author_id: UserId,
    pub rating: Option<u8>,
    pub comment: String,
    pub status: ReviewStatus,
    pub parent_id: Option<ReviewId>,
    pub created_at: DateTime<Utc>,
    /// Replies in chronological order.
    pub children: Vec<ReviewNode>,
}

impl From<ReviewRecord> for ReviewNode {
    fn from(record: ReviewRecord) -> Self {
        Self {
            id: record.id,
            product_id: record.product_id,
            author_id: record.author_id,
            rating: record.rating,
            comment: record.comment,
            status: record.status,
            parent_id: record.parent_id,
            created_at: record.created_at,
            children: Vec::new(),
        }
    }
}

/// Review fetching and submission against the gateway.
pub struct ReviewService {
    gateway: GatewayClient,
    session: Arc<SessionProvider>,
    policy: OrphanPolicy,
}

impl ReviewService {
    pub(crate) const fn new(
        gateway: GatewayClient,
        session: Arc<SessionProvider>,
        policy: OrphanPolicy,
    ) -> Self {
        Self {
            gateway,
            session,
            policy,
        }
    }

    /// The configured policy for replies with a missing parent.
    #[must_use]
    pub const fn orphan_policy(&self) -> OrphanPolicy {
        self.policy
    }

    /// Fetch a product's visible reviews as a materialized reply forest.
    ///
    /// The gateway query already restricts to approved records; each record
    /// is still filtered on its own status here so a misbehaving gateway
    /// cannot leak pending content into the forest.
    ///
    /// # Errors
    ///
    /// Returns an error if the gateway call fails.
    pub async fn fetch_forest(&self, product_id: ProductId) -> Result<Vec<ReviewNode>> {
        let mut records = self.gateway.fetch_reviews(product_id).await?;
        records.retain(|record| record.status == ReviewStatus::Approved);
        Ok(tree::build_forest(records, self.policy))
    }

    /// Submit a new review for a product.
    ///
    /// The review is created with `status = pending` and enters the visible
    /// forest only after moderation.
    ///
    /// # Errors
    ///
    /// Returns `Unauthenticated` without a signed-in user, `Validation` for
    /// an out-of-range rating or empty comment (both rejected before any
    /// network call), or a gateway error.
    pub async fn submit(&self, product_id: ProductId, rating: u8, comment: &str) -> Result<()> {
        let auth = self.session.current().ok_or(StoreError::Unauthenticated)?;

        if !(1..=5).contains(&rating) {
            return Err(StoreError::Validation(
                "rating must be between 1 and 5".to_string(),
            ));
        }
        let comment = comment.trim();
        if comment.is_empty() {
            return Err(StoreError::Validation(
                "comment must not be empty".to_string(),
            ));
        }

        let review = NewReview {
            product_id,
            author_id: auth.user_id,
            rating: Some(rating),
            comment: comment.to_string(),
            status: ReviewStatus::Pending,
            parent_id: None,
        };

        self.gateway.submit_review(&review, auth.token()).await?;
        Ok(())
    }
}
