//! Persisted cart line items.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::ProductId;

/// One batch of the locally persisted cart.
///
/// `quantity` is kept as the raw persisted value: a stored cart may predate
/// the current quantity limit or be corrupt, and reconciliation decides
/// what survives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product: ProductId,
    pub quantity: i64,
    /// Chosen option keys (e.g. "large", "extra-cheese"), unordered.
    #[serde(default)]
    pub options: BTreeSet<String>,
}

impl LineItem {
    /// Create a line item without options.
    #[must_use]
    pub const fn new(product: ProductId, quantity: i64) -> Self {
        Self {
            product,
            quantity,
            options: BTreeSet::new(),
        }
    }

    /// Add an option key.
    #[must_use]
    pub fn with_option(mut self, option: impl Into<String>) -> Self {
        self.options.insert(option.into());
        self
    }

    /// Returns `true` if both items denote the same cart line
    /// (same product, same option bag).
    #[must_use]
    pub fn same_line(&self, other: &Self) -> bool {
        self.product == other.product && self.options == other.options
    }
}
