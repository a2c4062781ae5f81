//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `CRUST_MAX_ITEMS_PER_LINE` - Maximum quantity per cart line (default: 10)
//! - `CRUST_CART_PATH` - Local persisted cart file (default: .crust/cart.json)
//! - `CRUST_PRODUCTS_COLLECTION` - Remote catalog collection (default: products)
//! - `CRUST_CATEGORIES_COLLECTION` - Remote categories collection (default: categories)
//! - `CRUST_ORDERS_COLLECTION` - Remote orders collection (default: orders)
//! - `CRUST_CLIENTS_COLLECTION` - Remote clients collection (default: clients)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;

use thiserror::Error;

use crate::cart::CartLimits;

const DEFAULT_MAX_ITEMS_PER_LINE: u32 = 10;
const DEFAULT_CART_PATH: &str = ".crust/cart.json";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Client application configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Maximum quantity per cart line item, read once at start
    pub max_items_per_line: u32,
    /// File backing the locally persisted cart
    pub cart_path: PathBuf,
    /// Names of the remote collections
    pub collections: CollectionNames,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g. "production", "staging")
    pub sentry_environment: Option<String>,
}

/// Names of the remote collections the orchestrator subscribes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionNames {
    pub products: String,
    pub categories: String,
    pub orders: String,
    pub clients: String,
}

impl Default for CollectionNames {
    fn default() -> Self {
        Self {
            products: "products".to_owned(),
            categories: "categories".to_owned(),
            orders: "orders".to_owned(),
            clients: "clients".to_owned(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            max_items_per_line: DEFAULT_MAX_ITEMS_PER_LINE,
            cart_path: PathBuf::from(DEFAULT_CART_PATH),
            collections: CollectionNames::default(),
            sentry_dsn: None,
            sentry_environment: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let max_items_per_line = match lookup("CRUST_MAX_ITEMS_PER_LINE") {
            Some(raw) => parse_max_items(&raw)?,
            None => DEFAULT_MAX_ITEMS_PER_LINE,
        };
        let cart_path = lookup("CRUST_CART_PATH")
            .map_or_else(|| PathBuf::from(DEFAULT_CART_PATH), PathBuf::from);

        let defaults = CollectionNames::default();
        let collections = CollectionNames {
            products: lookup("CRUST_PRODUCTS_COLLECTION").unwrap_or(defaults.products),
            categories: lookup("CRUST_CATEGORIES_COLLECTION").unwrap_or(defaults.categories),
            orders: lookup("CRUST_ORDERS_COLLECTION").unwrap_or(defaults.orders),
            clients: lookup("CRUST_CLIENTS_COLLECTION").unwrap_or(defaults.clients),
        };

        Ok(Self {
            max_items_per_line,
            cart_path,
            collections,
            sentry_dsn: lookup("SENTRY_DSN").filter(|dsn| !dsn.is_empty()),
            sentry_environment: lookup("SENTRY_ENVIRONMENT"),
        })
    }

    /// Cart limits derived from this configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the configured maximum is zero.
    pub fn cart_limits(&self) -> Result<CartLimits, ConfigError> {
        CartLimits::new(self.max_items_per_line).ok_or_else(|| {
            ConfigError::InvalidEnvVar(
                "CRUST_MAX_ITEMS_PER_LINE".to_owned(),
                "must be at least 1".to_owned(),
            )
        })
    }
}

fn parse_max_items(raw: &str) -> Result<u32, ConfigError> {
    let invalid = |reason: String| {
        ConfigError::InvalidEnvVar("CRUST_MAX_ITEMS_PER_LINE".to_owned(), reason)
    };
    let value = raw
        .trim()
        .parse::<u32>()
        .map_err(|e| invalid(e.to_string()))?;
    if value == 0 {
        return Err(invalid("must be at least 1".to_owned()));
    }
    Ok(value)
}
