//! Crust client library.
//!
//! The state-synchronization and access-control layer of the storefront:
//! it subscribes to the remote collections, reconciles them into one
//! consistent in-memory state, keeps the locally persisted cart consistent
//! with the catalog, and decides which capabilities an identity can see.
//!
//! # Architecture
//!
//! - [`sync`] turns remote feeds into live, deduplicated snapshots
//! - [`session`] decides between normal, forced sign-out and degraded modes
//! - [`cart`] reconciles the persisted cart against the catalog
//! - [`access`] filters capability descriptors by audience
//! - [`orchestrator`] owns every subscription and is the only writer of
//!   the shared [`state`]
//!
//! Rendering layers only read [`state::StoreSnapshot`] values and send
//! commands through an [`orchestrator::StorefrontHandle`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod access;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod orders;
pub mod remote;
pub mod routing;
pub mod session;
pub mod state;
pub mod store;
pub mod sync;

pub use orchestrator::{AppOrchestrator, StorefrontHandle};
pub use state::{StateReader, StoreSnapshot};
