//! Scripted session against the in-memory document store.
//!
//! Walks through the main state transitions: catalog arrival, cart
//! commands, sign-in, product removal, an expired credential, and a
//! transport outage with recovery.

use std::time::Duration;

use crust_client::config::ClientConfig;
use crust_client::error::ClientError;
use crust_client::remote::{MemoryDocumentStore, SourceError};
use crust_client::routing::CapabilityTable;
use crust_client::session::{SessionErrorCode, SessionMode};
use crust_client::store::MemoryStore;
use crust_client::{AppOrchestrator, StateReader, StoreSnapshot};
use crust_core::{
    Category, CategoryId, CurrencyCode, Identity, LineItem, Order, Price, Product, ProductId,
};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::info;

const STEP_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors from the demo session.
#[derive(Debug, Error)]
pub enum DemoError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("Failed to publish documents: {0}")]
    Publish(#[from] serde_json::Error),

    #[error("Timed out waiting for: {0}")]
    Timeout(&'static str),

    #[error("Orchestrator task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

fn pizza(id: i64, title: &str, cents: i64) -> Product {
    Product {
        id: ProductId::new(id),
        title: title.to_owned(),
        category: "pizza".to_owned(),
        description: String::new(),
        price: Price::new(Decimal::new(cents, 2), CurrencyCode::ILS),
        picture_url: String::new(),
    }
}

async fn step(
    reader: &mut StateReader,
    label: &'static str,
    predicate: impl FnMut(&StoreSnapshot) -> bool,
) -> Result<(), DemoError> {
    let snapshot = tokio::time::timeout(STEP_TIMEOUT, reader.wait_for(predicate))
        .await
        .map_err(|_| DemoError::Timeout(label))??;
    let paths: Vec<&str> = snapshot.menu.iter().map(|d| d.path.as_str()).collect();
    info!(
        identity = %snapshot.identity.id,
        cart_count = snapshot.cart_count,
        session = ?snapshot.session_mode,
        menu = ?paths,
        "{label}"
    );
    Ok(())
}

fn log_line_totals(snapshot: &StoreSnapshot) {
    for line in &*snapshot.cart {
        let Some(product) = snapshot.catalog.get(line.product) else {
            continue;
        };
        let quantity = u32::try_from(line.quantity).unwrap_or(0);
        info!(
            quantity,
            total = %product.price.times(quantity).display(),
            "  {}",
            product.title
        );
    }
}

/// Run the scripted session.
///
/// # Errors
///
/// Returns an error if a step does not complete in time.
pub async fn run(config: &ClientConfig) -> Result<(), DemoError> {
    let remote = MemoryDocumentStore::new();
    let local = MemoryStore::default();

    remote.publish(
        &config.collections.products,
        &[
            pizza(1, "Margherita", 4200),
            pizza(2, "Pepperoni", 4800),
            pizza(3, "Four Cheese", 5200),
        ],
    )?;
    remote.publish(
        &config.collections.categories,
        &[Category {
            id: CategoryId::new(1),
            name: "Pizza".to_owned(),
        }],
    )?;

    let (orchestrator, handle, mut reader) = AppOrchestrator::new(
        config,
        CapabilityTable::default(),
        remote.clone(),
        remote.clone(),
        local.clone(),
    )?;
    let task = tokio::spawn(orchestrator.run());

    step(&mut reader, "Catalog loaded", |s| s.catalog.len() == 3).await?;
    for product in reader.current().catalog.products() {
        info!(id = %product.id, price = %product.price.display(), "  {}", product.title);
    }

    handle.add_to_cart(LineItem::new(ProductId::new(1), 2))?;
    handle.add_to_cart(LineItem::new(ProductId::new(3), 1).with_option("large"))?;
    step(&mut reader, "Cart filled", |s| s.cart_count == 3).await?;
    log_line_totals(&reader.current());

    remote.sign_in(Identity::client("demo-user", "Dana"));
    step(&mut reader, "Signed in", |s| s.identity.is_authenticated()).await?;
    let snapshot = reader.current();
    info!(
        initial = %snapshot.identity.initial(),
        path = snapshot.landing_path(),
        "Landing path"
    );

    remote.publish(
        &config.collections.products,
        &[pizza(1, "Margherita", 4200), pizza(2, "Pepperoni", 4800)],
    )?;
    step(&mut reader, "Product removed", |s| s.cart_count == 2).await?;

    remote.expire_session();
    step(&mut reader, "Credential expired", |s| {
        s.identity.is_guest() && s.session_code == SessionErrorCode::None
    })
    .await?;

    remote.fail(
        &config.collections.orders,
        SourceError::Unavailable("connection reset".to_owned()),
    );
    step(&mut reader, "Connection lost", |s| {
        s.session_mode == SessionMode::Degraded
    })
    .await?;

    remote.publish::<Order>(&config.collections.orders, &[])?;
    step(&mut reader, "Connection restored", |s| {
        s.session_mode == SessionMode::Normal
    })
    .await?;

    handle.shutdown();
    task.await?;

    info!(
        sign_out_requests = remote.sign_out_requests(),
        cart_writes = local.writes(),
        "Demo complete"
    );
    Ok(())
}
