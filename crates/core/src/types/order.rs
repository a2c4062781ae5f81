//! Order documents.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{IdentityId, OrderId, OrderStatus, ProductId};

/// One product line of a placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    #[serde(rename = "productId")]
    pub product: ProductId,
    pub count: u32,
    #[serde(default)]
    pub options: BTreeSet<String>,
}

/// An order document from the remote orders collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub user_id: IdentityId,
    pub products: Vec<OrderLine>,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(rename = "dateCreate")]
    pub created_at: DateTime<Utc>,
    pub total_price: Decimal,
}
