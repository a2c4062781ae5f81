//! Persisted cart commands.
//!
//! These operate on the cart file at `CRUST_CART_PATH` directly, without an
//! orchestrator.

use std::path::Path;

use crust_client::cart::{self, DropReason};
use crust_client::catalog::Catalog;
use crust_client::config::{ClientConfig, ConfigError};
use crust_client::store::{JsonFileStore, LocalStore, StoreError};
use crust_core::{LineItem, Product, ProductId};
use thiserror::Error;
use tracing::{info, warn};

/// Errors from cart commands.
#[derive(Debug, Error)]
pub enum CartError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Failed to read catalog {path}: {source}")]
    CatalogRead {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid catalog: {0}")]
    CatalogParse(#[from] serde_json::Error),

    #[error("Quantity must be between 1 and {0}")]
    InvalidQuantity(u32),
}

fn store(config: &ClientConfig) -> JsonFileStore<LineItem> {
    JsonFileStore::new(&config.cart_path)
}

fn log_cart(lines: &[LineItem]) {
    for (index, line) in lines.iter().enumerate() {
        let options: Vec<&str> = line.options.iter().map(String::as_str).collect();
        info!(
            "  [{index}] product {} x{} {}",
            line.product,
            line.quantity,
            options.join(", ")
        );
    }
}

/// Print the persisted cart.
///
/// # Errors
///
/// Returns an error if the cart file cannot be read.
pub fn show(config: &ClientConfig) -> Result<(), CartError> {
    let lines = store(config).read()?;
    info!(
        path = %config.cart_path.display(),
        lines = lines.len(),
        items = cart::item_count(&lines),
        "Persisted cart"
    );
    log_cart(&lines);
    Ok(())
}

/// Add a batch to the persisted cart, merging it into a matching line.
///
/// # Errors
///
/// Returns an error if the quantity is out of range or the cart file
/// cannot be read or written.
pub fn add(
    config: &ClientConfig,
    product: i64,
    quantity: i64,
    options: Vec<String>,
) -> Result<(), CartError> {
    let limits = config.cart_limits()?;
    if !limits.accepts(quantity) {
        return Err(CartError::InvalidQuantity(limits.max_quantity()));
    }

    let mut batch = LineItem::new(ProductId::new(product), quantity);
    batch.options.extend(options);

    let mut store = store(config);
    let next = cart::add(&store.read()?, batch, limits);
    store.write(&next)?;

    info!(lines = next.len(), items = cart::item_count(&next), "Cart updated");
    Ok(())
}

/// Reconcile the persisted cart against a JSON catalog export.
///
/// # Errors
///
/// Returns an error if the catalog or cart cannot be read, or the cart
/// cannot be written.
pub fn reconcile(config: &ClientConfig, catalog: &Path, write: bool) -> Result<(), CartError> {
    let limits = config.cart_limits()?;
    let catalog = load_catalog(catalog)?;

    let mut store = store(config);
    let lines = store.read()?;
    let result = cart::reconcile(&lines, &catalog, limits);

    for (line, reason) in &result.dropped {
        let reason = match reason {
            DropReason::InvalidQuantity => "invalid quantity",
            DropReason::UnknownProduct => "product removed from catalog",
        };
        warn!(product = %line.product, quantity = line.quantity, "Would drop line: {reason}");
    }
    info!(
        kept = result.cart.len(),
        dropped = result.dropped.len(),
        clamped = result.clamped,
        items = cart::item_count(&result.cart),
        "Reconciled cart"
    );
    log_cart(&result.cart);

    if result.is_changed() {
        if write {
            store.write(&result.cart)?;
            info!(path = %config.cart_path.display(), "Persisted cart rewritten");
        } else {
            info!("Run again with --write to rewrite the persisted cart");
        }
    }
    Ok(())
}

fn load_catalog(path: &Path) -> Result<Catalog, CartError> {
    let json = std::fs::read_to_string(path).map_err(|source| CartError::CatalogRead {
        path: path.display().to_string(),
        source,
    })?;
    let products: Vec<Product> = serde_json::from_str(&json)?;
    Ok(Catalog::from_products(products))
}
