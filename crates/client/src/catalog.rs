//! Catalog snapshot.

use std::collections::HashMap;
use std::sync::Arc;

use crust_core::{Product, ProductId};

/// The live mapping from product id to product record.
///
/// A catalog is replaced atomically on every remote update and is cheap to
/// clone. Before the first snapshot arrives the catalog is *pending*: it is
/// empty, but an empty pending catalog says nothing about which products
/// exist.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    products: Arc<[Product]>,
    index: Arc<HashMap<ProductId, usize>>,
    loaded: bool,
}

impl Catalog {
    /// The catalog before any snapshot has arrived.
    #[must_use]
    pub fn pending() -> Self {
        Self::default()
    }

    /// Build a loaded catalog from a full snapshot.
    ///
    /// If an id appears more than once the first record wins.
    #[must_use]
    pub fn from_products(products: impl Into<Arc<[Product]>>) -> Self {
        let products = products.into();
        let mut index = HashMap::with_capacity(products.len());
        for (position, product) in products.iter().enumerate() {
            index.entry(product.id).or_insert(position);
        }
        Self {
            products,
            index: Arc::new(index),
            loaded: true,
        }
    }

    /// Returns `true` once a snapshot has been received.
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        self.loaded
    }

    #[must_use]
    pub fn get(&self, id: ProductId) -> Option<&Product> {
        self.index
            .get(&id)
            .and_then(|&position| self.products.get(position))
    }

    #[must_use]
    pub fn contains(&self, id: ProductId) -> bool {
        self.index.contains_key(&id)
    }

    /// Products in snapshot order.
    #[must_use]
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.products.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crust_core::{CurrencyCode, Price};
    use rust_decimal::Decimal;

    use super::*;

    pub(crate) fn product(id: i64, title: &str) -> Product {
        Product {
            id: ProductId::new(id),
            title: title.to_owned(),
            category: "pizza".to_owned(),
            description: String::new(),
            price: Price::new(Decimal::new(4500, 2), CurrencyCode::USD),
            picture_url: String::new(),
        }
    }

    pub(crate) fn catalog(ids: &[i64]) -> Catalog {
        Catalog::from_products(
            ids.iter()
                .map(|&id| product(id, &format!("Pizza {id}")))
                .collect::<Vec<_>>(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_pending_catalog() {
        let catalog = Catalog::pending();
        assert!(!catalog.is_loaded());
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_lookup() {
        let catalog = catalog(&[1, 2]);
        assert!(catalog.is_loaded());
        assert!(catalog.contains(ProductId::new(2)));
        assert!(!catalog.contains(ProductId::new(3)));
        assert_eq!(
            catalog.get(ProductId::new(1)).map(|p| p.title.as_str()),
            Some("Pizza 1")
        );
    }

    #[test]
    fn test_first_duplicate_wins() {
        let catalog = Catalog::from_products(vec![product(1, "First"), product(1, "Second")]);
        assert_eq!(
            catalog.get(ProductId::new(1)).map(|p| p.title.as_str()),
            Some("First")
        );
        assert_eq!(catalog.len(), 2);
    }
}
