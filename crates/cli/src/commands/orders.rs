//! Admin order console over JSON exports.

use std::path::Path;

use crust_client::catalog::Catalog;
use crust_client::orders::{self, OrderRow};
use crust_core::{Identity, Order, OrderStatus, Product};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::info;

/// Errors from order commands.
#[derive(Debug, Error)]
pub enum OrdersError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid export: {0}")]
    Parse(#[from] serde_json::Error),
}

fn load<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, OrdersError> {
    let json = std::fs::read_to_string(path).map_err(|source| OrdersError::Read {
        path: path.display().to_string(),
        source,
    })?;
    Ok(serde_json::from_str(&json)?)
}

/// Number of rows per status, in workflow order.
fn status_counts(rows: &[OrderRow]) -> Vec<(OrderStatus, usize)> {
    OrderStatus::all()
        .into_iter()
        .map(|status| (status, rows.iter().filter(|row| row.status == status).count()))
        .collect()
}

/// Print the order console rows, optionally only those in `status`.
///
/// Clients and the catalog are optional: missing references render as
/// placeholders.
///
/// # Errors
///
/// Returns an error if an export cannot be read or parsed.
pub fn list(
    orders: &Path,
    clients: Option<&Path>,
    catalog: Option<&Path>,
    status: Option<OrderStatus>,
) -> Result<(), OrdersError> {
    let orders: Vec<Order> = load(orders)?;
    let clients: Vec<Identity> = clients.map(load).transpose()?.unwrap_or_default();
    let catalog = match catalog {
        Some(path) => Catalog::from_products(load::<Product>(path)?),
        None => Catalog::pending(),
    };

    let rows = orders::order_rows(&orders, &clients, &catalog);
    for row in rows.iter().filter(|row| status.is_none_or(|s| row.status == s)) {
        info!(
            "  #{} [{}] {} {} | {}",
            row.id, row.status, row.client, row.total, row.products
        );
    }
    for (status, count) in status_counts(&rows) {
        info!(%status, count, "Orders by status");
    }
    Ok(())
}
