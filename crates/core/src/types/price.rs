//! Type-safe price representation in integer minor currency units.
//!
//! The gateway stores and returns prices as whole minor units (the
//! storefront's display currency has no fractional coin in practice), so
//! arithmetic stays in `i64` end to end. Prices are never computed
//! client-side from other fields; a `Price` is always a value the gateway
//! returned, or a sum/product of such values.

use std::iter::Sum;
use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};

/// A monetary amount in minor currency units.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Price(i64);

impl Price {
    /// The zero amount.
    pub const ZERO: Self = Self(0);

    /// Create a price from minor currency units.
    #[must_use]
    pub const fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    /// Get the amount in minor currency units.
    #[must_use]
    pub const fn as_minor(&self) -> i64 {
        self.0
    }

    /// Total for a cart line: unit price times quantity.
    #[must_use]
    pub const fn line_total(&self, quantity: u32) -> Self {
        Self(self.0 * quantity as i64)
    }

    /// Subtract, clamping at zero.
    #[must_use]
    pub const fn saturating_sub(&self, other: Self) -> Self {
        let diff = self.0 - other.0;
        if diff < 0 { Self::ZERO } else { Self(diff) }
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Price {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl std::fmt::Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
