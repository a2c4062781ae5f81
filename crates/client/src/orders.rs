//! Admin order console rows.
//!
//! Orders and clients arrive on independent subscriptions in any
//! interleaving, so the join is recomputed from whatever snapshots are
//! current and tolerates missing references.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use crust_core::{Identity, IdentityId, Order, OrderId, OrderLine, OrderStatus};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::catalog::Catalog;

/// Shown when an order references a client that is not (yet) known.
pub const UNKNOWN_CLIENT: &str = "Unknown client";
/// Shown when an order references a product missing from the catalog.
pub const UNKNOWN_PRODUCT: &str = "Unknown product";

/// One row of the admin order grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderRow {
    pub id: OrderId,
    pub client: String,
    pub phone: String,
    pub address: String,
    pub products: String,
    pub status: OrderStatus,
    pub date: DateTime<Utc>,
    pub total: Decimal,
}

/// Project every order into a display row, in order.
#[must_use]
pub fn order_rows(orders: &[Order], clients: &[Identity], catalog: &Catalog) -> Vec<OrderRow> {
    let clients: HashMap<&IdentityId, &Identity> =
        clients.iter().map(|client| (&client.id, client)).collect();

    orders
        .iter()
        .map(|order| {
            let client = clients.get(&order.user_id);
            OrderRow {
                id: order.id,
                client: client.map_or_else(|| UNKNOWN_CLIENT.to_owned(), |c| c.name.clone()),
                phone: client
                    .and_then(|c| c.phone_number.clone())
                    .unwrap_or_default(),
                address: client
                    .map(|c| c.delivery_address.summary())
                    .unwrap_or_default(),
                products: product_summary(&order.products, catalog),
                status: order.status,
                date: order.created_at,
                total: order.total_price,
            }
        })
        .collect()
}

fn product_summary(lines: &[OrderLine], catalog: &Catalog) -> String {
    lines
        .iter()
        .map(|line| {
            let title = catalog
                .get(line.product)
                .map_or(UNKNOWN_PRODUCT, |product| product.title.as_str());
            let options = if line.options.is_empty() {
                String::new()
            } else {
                let options: Vec<&str> = line.options.iter().map(String::as_str).collect();
                format!("options: {} ", options.join(", "))
            };
            format!("product: {title} {options}count: {}. ", line.count)
        })
        .collect()
}
