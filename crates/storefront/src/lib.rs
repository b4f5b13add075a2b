//! Maison Rose storefront client library.
//!
//! This crate is the client-side state-consistency layer between the
//! presentation surfaces (CLI today, web tomorrow) and the remote data
//! gateway that owns all persistent state:
//!
//! - [`cart`] - the cart synchronizer, reconciling local projections against
//!   the gateway's authoritative cart
//! - [`reviews`] - review fetching/submission and the pure comment-tree
//!   builder
//! - [`engagement`] - like toggling and view recording with per-product
//!   guards
//! - [`catalog`] - read-only product browsing
//!
//! The gateway is the single source of truth; this crate never holds data
//! the gateway did not originate or confirm. See [`state::StoreContext`] for
//! the process-wide entry point.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod config;
pub mod engagement;
pub mod error;
pub mod gateway;
pub mod reviews;
pub mod session;
pub mod state;
