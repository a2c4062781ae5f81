//! Crust Core - Shared domain types.
//!
//! This crate provides the types exchanged between the Crust components:
//! - `client` - State synchronization and access control for the storefront
//! - `cli` - Command-line tools for inspecting carts and capability tables
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no subscriptions, no storage.
//! This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype ids, prices, identities, catalog, cart and order records

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
