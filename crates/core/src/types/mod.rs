//! Core types for Crust.
//!
//! This module provides type-safe wrappers for the storefront's domain records.

pub mod cart;
pub mod catalog;
pub mod id;
pub mod identity;
pub mod order;
pub mod price;
pub mod status;

pub use cart::LineItem;
pub use catalog::{Category, Product};
pub use id::*;
pub use identity::{DeliveryAddress, Identity, IdentityId};
pub use order::{Order, OrderLine};
pub use price::{CurrencyCode, Price};
pub use status::*;
