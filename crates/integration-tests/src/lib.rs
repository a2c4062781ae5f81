//! Integration tests for Crust.
//!
//! The tests drive a full [`AppOrchestrator`] against the in-memory
//! document store, either with an in-memory cart store or a JSON file.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p crust-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `session` - Identity, forced sign-out and degraded mode
//! - `cart` - Reconciliation and cart persistence
//! - `access` - Capability filtering per audience

use std::time::Duration;

use crust_client::config::ClientConfig;
use crust_client::error::ClientError;
use crust_client::remote::MemoryDocumentStore;
use crust_client::routing::CapabilityTable;
use crust_client::store::{LocalStore, MemoryStore};
use crust_client::{AppOrchestrator, StateReader, StoreSnapshot, StorefrontHandle};
use crust_core::{CurrencyCode, LineItem, Price, Product, ProductId};
use rust_decimal::Decimal;
use thiserror::Error;
use tokio::task::JoinHandle;

/// How long a test waits for the published state to settle.
pub const WAIT: Duration = Duration::from_secs(5);

/// Errors from the test harness.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("Timed out waiting for the expected state")]
    Timeout,

    #[error("Orchestrator task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// A running orchestrator wired to an in-memory document store.
///
/// Tests keep their own handle on the cart store: a clone of a
/// [`MemoryStore`] or the path of a file store.
pub struct TestContext {
    pub remote: MemoryDocumentStore,
    pub handle: StorefrontHandle,
    pub reader: StateReader,
    task: JoinHandle<()>,
}

impl TestContext {
    /// Start an orchestrator persisting the cart to `local`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn start<L>(config: &ClientConfig, local: L) -> Result<Self, HarnessError>
    where
        L: LocalStore<LineItem>,
    {
        let remote = MemoryDocumentStore::new();
        let (orchestrator, handle, reader) = AppOrchestrator::new(
            config,
            CapabilityTable::default(),
            remote.clone(),
            remote.clone(),
            local,
        )?;
        let task = tokio::spawn(orchestrator.run());
        Ok(Self {
            remote,
            handle,
            reader,
            task,
        })
    }

    /// Wait until `predicate` holds for the published state.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Timeout`] if it does not hold within [`WAIT`].
    pub async fn until(
        &mut self,
        predicate: impl FnMut(&StoreSnapshot) -> bool,
    ) -> Result<(), HarnessError> {
        tokio::time::timeout(WAIT, self.reader.wait_for(predicate))
            .await
            .map_err(|_| HarnessError::Timeout)??;
        Ok(())
    }

    /// Shut the orchestrator down and wait for the run loop to finish.
    ///
    /// # Errors
    ///
    /// Returns an error if the run loop does not stop within [`WAIT`].
    pub async fn stop(self) -> Result<(), HarnessError> {
        self.handle.shutdown();
        tokio::time::timeout(WAIT, self.task)
            .await
            .map_err(|_| HarnessError::Timeout)??;
        Ok(())
    }
}

/// A fresh in-memory cart store holding `cart`.
#[must_use]
pub fn memory_cart(cart: Vec<LineItem>) -> MemoryStore<LineItem> {
    MemoryStore::with_records(cart)
}

/// A product priced at 45.00.
#[must_use]
pub fn product(id: i64, title: &str) -> Product {
    Product {
        id: ProductId::new(id),
        title: title.to_owned(),
        category: "pizza".to_owned(),
        description: String::new(),
        price: Price::new(Decimal::new(4500, 2), CurrencyCode::USD),
        picture_url: String::new(),
    }
}

#[must_use]
pub const fn line(product: i64, quantity: i64) -> LineItem {
    LineItem::new(ProductId::new(product), quantity)
}
