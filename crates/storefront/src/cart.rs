//! Cart synchronization against the gateway's authoritative cart.
//!
//! The [`CartSynchronizer`] owns the in-memory cart projection for the
//! current session. At quiescence (no in-flight mutation) the projection
//! exactly matches the gateway's cart for the signed-in user; the central
//! contract is "fail closed, never corrupt": a failed mutation leaves the
//! projection in its last confirmed-good state, and no optimistic patch is
//! applied before the gateway confirms.
//!
//! Concurrency is bounded with explicit per-entity busy guards: one add may
//! be in flight system-wide, and one mutation per cart line. A conflicting
//! request is rejected immediately with [`StoreError::Busy`] rather than
//! queued, so rapid double-submits serialize instead of racing. Guards are
//! set before the suspension point and cleared in the resumption handler on
//! both arms; the lock is never held across an await.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use maison_core::{CartItemId, Price, ProductId};

use crate::error::{Result, StoreError};
use crate::gateway::GatewayClient;
use crate::gateway::types::CartLine;
use crate::session::SessionProvider;

/// Subtotal above which shipping is free. The boundary is strict: a
/// subtotal of exactly this amount still pays the flat fee.
pub const FREE_SHIPPING_THRESHOLD: Price = Price::from_minor(500_000);

/// Flat shipping fee charged below the free-shipping threshold.
pub const FLAT_SHIPPING_FEE: Price = Price::from_minor(30_000);

/// Totals derived from the cart projection.
///
/// Always recomputed from the current lines, never cached independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartTotals {
    /// Sum of unit price times quantity over all lines.
    pub subtotal: Price,
    /// Zero above the free-shipping threshold, flat fee otherwise.
    pub shipping_cost: Price,
    /// Subtotal plus shipping.
    pub total: Price,
    /// Sum of line quantities.
    pub item_count: u32,
    /// Subtotal still missing to reach the free-shipping threshold; zero at
    /// or above it.
    pub amount_to_free_shipping: Price,
}

/// Mutation state of one cart line.
///
/// A line moves `Idle -> Pending -> Idle` on success and
/// `Idle -> Pending -> Failed` on failure. `Failed` is idle-with-error: the
/// line is mutable again (the next attempt reclaims it) and the message is
/// available for display, so the UI can distinguish "in progress" from
/// "retry".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LineStatus {
    #[default]
    Idle,
    Pending,
    /// The last mutation failed with this message.
    Failed(String),
}

impl LineStatus {
    /// Whether a mutation of this line is in flight.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

/// Mutable cart state: the projection plus the busy guards.
#[derive(Debug, Default)]
struct CartState {
    lines: Vec<CartLine>,
    /// System-wide add guard; only the gateway knows whether an add
    /// collapses into an existing line, so adds never overlap.
    adding: bool,
    /// Per-line mutation state. Absent entries are idle; other lines
    /// remain mutable while one is pending.
    line_ops: HashMap<CartItemId, LineStatus>,
}

/// Owner of the cart projection for the current session.
pub struct CartSynchronizer {
    gateway: GatewayClient,
    session: Arc<SessionProvider>,
    state: Mutex<CartState>,
}

impl CartSynchronizer {
    pub(crate) fn new(gateway: GatewayClient, session: Arc<SessionProvider>) -> Self {
        Self {
            gateway,
            session,
            state: Mutex::new(CartState::default()),
        }
    }

    /// Fetch the full cart and replace the projection wholesale.
    ///
    /// With no signed-in user the projection becomes empty; that is the
    /// valid anonymous state, not an error. Called on session establishment
    /// and usable as the recovery path after any failed reconciliation.
    ///
    /// # Errors
    ///
    /// Returns an error if the gateway call fails; the projection is left
    /// unchanged in that case.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<()> {
        let Some(auth) = self.session.current() else {
            let mut state = self.state.lock().await;
            state.lines.clear();
            state.line_ops.clear();
            return Ok(());
        };

        let fetched = self.gateway.fetch_cart(auth.token()).await?;

        // The gateway never materializes zero-quantity rows; drop any that
        // slip through so the projection invariant holds.
        let lines: Vec<CartLine> = fetched
            .into_iter()
            .filter(|line| {
                if line.quantity == 0 {
                    warn!(item_id = %line.item_id, "dropping zero-quantity cart row from gateway");
                    return false;
                }
                true
            })
            .collect();

        let mut state = self.state.lock().await;
        if self.session.current_user() == Some(auth.user_id) {
            state.lines = lines;
            // Drop parked errors for lines the gateway no longer returns
            let CartState { lines, line_ops, .. } = &mut *state;
            line_ops.retain(|id, status| {
                status.is_pending() || lines.iter().any(|line| line.item_id == *id)
            });
        } else {
            debug!("session changed during cart load; discarding fetched cart");
        }
        Ok(())
    }

    /// Add a product to the cart.
    ///
    /// On success the projection is refreshed with a full [`load`](Self::load)
    /// rather than patched locally: only the gateway knows whether the add
    /// collapsed into an existing line or created a new one.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a zero quantity and `Unauthenticated`
    /// without a signed-in user (both before any network call), `Busy` while
    /// another add is in flight (retry after it resolves; the call is not
    /// queued), or a gateway error with the projection unchanged.
    #[instrument(skip(self))]
    pub async fn add_item(&self, product_id: ProductId, quantity: u32) -> Result<()> {
        if quantity == 0 {
            return Err(StoreError::Validation(
                "quantity must be at least 1".to_string(),
            ));
        }
        let auth = self.session.current().ok_or(StoreError::Unauthenticated)?;

        {
            let mut state = self.state.lock().await;
            if state.adding {
                return Err(StoreError::Busy("add to cart".to_string()));
            }
            state.adding = true;
        }

        let result = self
            .gateway
            .add_to_cart(product_id, quantity, auth.token())
            .await;

        // Clear the guard before the reload so a failed reload cannot leave
        // it stuck.
        self.state.lock().await.adding = false;
        result?;

        if self.session.current_user() == Some(auth.user_id) {
            self.load().await?;
        } else {
            debug!(%product_id, "session changed during add; skipping cart reload");
        }
        Ok(())
    }

    /// Set a cart line's quantity. Quantity 0 removes the line.
    ///
    /// On success the line is patched in place (or removed) - a local patch
    /// is safe here because a quantity-only update cannot change price or
    /// identity. No patch is applied before the gateway confirms.
    ///
    /// # Errors
    ///
    /// Returns `Unauthenticated` without a signed-in user, `NotFound` for an
    /// `item_id` absent from the projection, `Busy` while a mutation of the
    /// same line is in flight, or a gateway error with the projection
    /// unchanged.
    #[instrument(skip(self))]
    pub async fn update_quantity(&self, item_id: CartItemId, new_quantity: u32) -> Result<()> {
        let auth = self.session.current().ok_or(StoreError::Unauthenticated)?;
        self.claim_line(item_id).await?;

        let result = self
            .gateway
            .update_cart_quantity(item_id, new_quantity, auth.token())
            .await;

        let mut state = self.state.lock().await;
        Self::settle_line(&mut state, item_id, &result);
        result?;

        if self.session.current_user() == Some(auth.user_id) {
            if new_quantity == 0 {
                state.lines.retain(|line| line.item_id != item_id);
            } else if let Some(line) = state.lines.iter_mut().find(|l| l.item_id == item_id) {
                line.quantity = new_quantity;
            }
        } else {
            debug!(%item_id, "session changed during quantity update; discarding patch");
        }
        Ok(())
    }

    /// Remove a cart line.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`update_quantity`](Self::update_quantity); the
    /// projection is unchanged on failure.
    #[instrument(skip(self))]
    pub async fn remove_item(&self, item_id: CartItemId) -> Result<()> {
        let auth = self.session.current().ok_or(StoreError::Unauthenticated)?;
        self.claim_line(item_id).await?;

        let result = self.gateway.remove_from_cart(item_id, auth.token()).await;

        let mut state = self.state.lock().await;
        Self::settle_line(&mut state, item_id, &result);
        result?;

        if self.session.current_user() == Some(auth.user_id) {
            state.lines.retain(|line| line.item_id != item_id);
        } else {
            debug!(%item_id, "session changed during removal; discarding patch");
        }
        Ok(())
    }

    /// Move a line to `Pending`, clearing any parked error.
    async fn claim_line(&self, item_id: CartItemId) -> Result<()> {
        let mut state = self.state.lock().await;
        if !state.lines.iter().any(|line| line.item_id == item_id) {
            return Err(StoreError::NotFound(format!("cart item {item_id}")));
        }
        if state
            .line_ops
            .get(&item_id)
            .is_some_and(LineStatus::is_pending)
        {
            return Err(StoreError::Busy(format!("cart item {item_id}")));
        }
        state.line_ops.insert(item_id, LineStatus::Pending);
        Ok(())
    }

    /// Resolve a line's pending state from its mutation result.
    fn settle_line(
        state: &mut CartState,
        item_id: CartItemId,
        result: &std::result::Result<(), crate::gateway::GatewayError>,
    ) {
        match result {
            Ok(()) => {
                state.line_ops.remove(&item_id);
            }
            Err(e) => {
                state
                    .line_ops
                    .insert(item_id, LineStatus::Failed(e.to_string()));
            }
        }
    }

    // =========================================================================
    // Derived Getters
    // =========================================================================

    /// Snapshot of the current projection.
    pub async fn lines(&self) -> Vec<CartLine> {
        self.state.lock().await.lines.clone()
    }

    /// Totals derived from the current projection.
    pub async fn totals(&self) -> CartTotals {
        compute_totals(&self.state.lock().await.lines)
    }

    /// Sum of line quantities in the current projection.
    pub async fn item_count(&self) -> u32 {
        self.state
            .lock()
            .await
            .lines
            .iter()
            .map(|line| line.quantity)
            .sum()
    }

    /// Whether an add is currently in flight.
    pub async fn is_adding(&self) -> bool {
        self.state.lock().await.adding
    }

    /// Whether a mutation of the given line is currently in flight.
    pub async fn is_line_pending(&self, item_id: CartItemId) -> bool {
        self.line_status(item_id).await.is_pending()
    }

    /// Mutation state of the given line.
    pub async fn line_status(&self, item_id: CartItemId) -> LineStatus {
        self.state
            .lock()
            .await
            .line_ops
            .get(&item_id)
            .cloned()
            .unwrap_or_default()
    }
}

/// Compute derived totals from a set of cart lines.
fn compute_totals(lines: &[CartLine]) -> CartTotals {
    let subtotal: Price = lines
        .iter()
        .map(|line| line.unit_price.line_total(line.quantity))
        .sum();
    let free_shipping = subtotal > FREE_SHIPPING_THRESHOLD;
    let shipping_cost = if free_shipping {
        Price::ZERO
    } else {
        FLAT_SHIPPING_FEE
    };

    CartTotals {
        subtotal,
        shipping_cost,
        total: subtotal + shipping_cost,
        item_count: lines.iter().map(|line| line.quantity).sum(),
        amount_to_free_shipping: if free_shipping {
            Price::ZERO
        } else {
            FREE_SHIPPING_THRESHOLD.saturating_sub(subtotal)
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(item_id: i64, unit_price: i64, quantity: u32) -> CartLine {
        CartLine {
            item_id: CartItemId::new(item_id),
            product_id: ProductId::new(item_id * 10),
            name: format!("product {item_id}"),
            image_url: String::new(),
            unit_price: Price::from_minor(unit_price),
            quantity,
        }
    }

    #[test]
    fn test_totals_below_threshold() {
        let totals = compute_totals(&[line(1, 100_000, 2), line(2, 50_000, 1)]);
        assert_eq!(totals.subtotal, Price::from_minor(250_000));
        assert_eq!(totals.shipping_cost, FLAT_SHIPPING_FEE);
        assert_eq!(totals.total, Price::from_minor(280_000));
        assert_eq!(totals.item_count, 3);
        assert_eq!(totals.amount_to_free_shipping, Price::from_minor(250_000));
    }

    #[test]
    fn test_totals_boundary_is_strict_greater_than() {
        // Exactly at the threshold: shipping is still charged
        let totals = compute_totals(&[line(1, 100_000, 4), line(2, 50_000, 2)]);
        assert_eq!(totals.subtotal, Price::from_minor(500_000));
        assert_eq!(totals.shipping_cost, FLAT_SHIPPING_FEE);
        assert_eq!(totals.total, Price::from_minor(530_000));
        assert_eq!(totals.amount_to_free_shipping, Price::ZERO);

        // One unit over: shipping is free
        let totals = compute_totals(&[line(1, 500_001, 1)]);
        assert_eq!(totals.shipping_cost, Price::ZERO);
        assert_eq!(totals.total, Price::from_minor(500_001));
    }

    #[test]
    fn test_totals_empty_projection() {
        let totals = compute_totals(&[]);
        assert_eq!(totals.subtotal, Price::ZERO);
        assert_eq!(totals.item_count, 0);
        // Derived values are pure functions of the projection; the empty
        // cart reports the flat fee like any other sub-threshold subtotal.
        assert_eq!(totals.shipping_cost, FLAT_SHIPPING_FEE);
    }
}
