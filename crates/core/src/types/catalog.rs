//! Catalog documents.

use serde::{Deserialize, Serialize};

use super::{CategoryId, Price, ProductId};

/// A product document from the remote catalog collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    /// Name of the category the product is listed under.
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    pub price: Price,
    #[serde(default, rename = "picture")]
    pub picture_url: String,
}

/// A category document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}
