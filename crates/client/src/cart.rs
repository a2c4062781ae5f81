//! Cart reconciliation.
//!
//! The locally persisted cart survives reloads and is identity-independent,
//! so it can reference products that were removed from the catalog or carry
//! quantities above a limit that was lowered since. [`reconcile`] resolves
//! it against the current catalog:
//!
//! - batches with a quantity ≤ 0 are dropped
//! - batches whose product is missing from a *loaded* catalog are dropped
//! - quantities above the configured maximum are clamped
//! - the order of the remaining batches is preserved
//!
//! None of this is an error: product removal is a normal catalog operation.

use crust_core::LineItem;
use tracing::warn;

use crate::catalog::Catalog;

/// Quantity bounds for a single cart line, read once at start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartLimits {
    max_quantity: u32,
}

impl CartLimits {
    /// Returns `None` if `max_quantity` is zero.
    #[must_use]
    pub const fn new(max_quantity: u32) -> Option<Self> {
        if max_quantity == 0 {
            None
        } else {
            Some(Self { max_quantity })
        }
    }

    #[must_use]
    pub const fn max_quantity(&self) -> u32 {
        self.max_quantity
    }

    /// Returns `true` if `quantity` is within `[1, max]`.
    #[must_use]
    pub fn accepts(&self, quantity: i64) -> bool {
        (1..=i64::from(self.max_quantity)).contains(&quantity)
    }

    fn clamp(self, quantity: i64) -> i64 {
        quantity.min(i64::from(self.max_quantity))
    }
}

/// Why a batch was removed during reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The persisted quantity was zero or negative.
    InvalidQuantity,
    /// The product no longer exists in the catalog.
    UnknownProduct,
}

/// Outcome of [`reconcile`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// The reconciled cart.
    pub cart: Vec<LineItem>,
    /// Batches removed from the input, with the reason.
    pub dropped: Vec<(LineItem, DropReason)>,
    /// Number of batches whose quantity was clamped.
    pub clamped: usize,
}

impl Reconciliation {
    /// Returns `true` if the reconciled cart differs from the input and the
    /// persisted copy should be rewritten.
    #[must_use]
    pub fn is_changed(&self) -> bool {
        !self.dropped.is_empty() || self.clamped > 0
    }
}

/// Reconcile `cart` against `catalog`.
///
/// A pending catalog only fixes quantities: unresolved products are kept
/// until the first catalog snapshot arrives. Reconciling the output again
/// with the same catalog and limits returns it unchanged.
#[must_use]
pub fn reconcile(cart: &[LineItem], catalog: &Catalog, limits: CartLimits) -> Reconciliation {
    let mut reconciled = Vec::with_capacity(cart.len());
    let mut dropped = Vec::new();
    let mut clamped = 0;

    for item in cart {
        if item.quantity <= 0 {
            dropped.push((item.clone(), DropReason::InvalidQuantity));
            continue;
        }
        if catalog.is_loaded() && !catalog.contains(item.product) {
            dropped.push((item.clone(), DropReason::UnknownProduct));
            continue;
        }

        let quantity = limits.clamp(item.quantity);
        if quantity != item.quantity {
            warn!(
                product = %item.product,
                from = item.quantity,
                to = quantity,
                "Clamped cart line quantity"
            );
            clamped += 1;
        }
        reconciled.push(LineItem {
            quantity,
            ..item.clone()
        });
    }

    for (item, reason) in &dropped {
        warn!(product = %item.product, ?reason, "Dropped cart line");
    }

    Reconciliation {
        cart: reconciled,
        dropped,
        clamped,
    }
}

/// Total number of items: the sum of quantities across all batches.
#[must_use]
pub fn item_count(cart: &[LineItem]) -> u64 {
    cart.iter()
        .map(|item| u64::try_from(item.quantity).unwrap_or(0))
        .sum()
}

/// Add a batch: merged into an existing line with the same product and
/// option bag, otherwise appended.
#[must_use]
pub fn add(cart: &[LineItem], batch: LineItem, limits: CartLimits) -> Vec<LineItem> {
    let mut next = cart.to_vec();
    if batch.quantity <= 0 {
        return next;
    }
    match next.iter_mut().find(|line| line.same_line(&batch)) {
        Some(line) => {
            line.quantity = limits.clamp(line.quantity.saturating_add(batch.quantity));
        }
        None => next.push(LineItem {
            quantity: limits.clamp(batch.quantity),
            ..batch
        }),
    }
    next
}

/// Set the quantity of the line at `index`.
///
/// Quantities outside `[1, max]` and unknown indices leave the cart as is.
#[must_use]
pub fn set_quantity(
    cart: &[LineItem],
    index: usize,
    quantity: i64,
    limits: CartLimits,
) -> Vec<LineItem> {
    let mut next = cart.to_vec();
    if !limits.accepts(quantity) {
        return next;
    }
    if let Some(line) = next.get_mut(index) {
        line.quantity = quantity;
    }
    next
}

/// Remove the line at `index`, if any.
#[must_use]
pub fn remove(cart: &[LineItem], index: usize) -> Vec<LineItem> {
    let mut next = cart.to_vec();
    if index < next.len() {
        next.remove(index);
    }
    next
}
