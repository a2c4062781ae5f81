//! Cart reconciliation and persistence through a running orchestrator.

#![allow(clippy::unwrap_used)]

use crust_client::cart::{self, CartLimits, DropReason};
use crust_client::catalog::Catalog;
use crust_client::config::ClientConfig;
use crust_client::store::{JsonFileStore, LocalStore};
use crust_core::{LineItem, ProductId};
use crust_integration_tests::{TestContext, line, memory_cart, product};

fn file_config(dir: &std::path::Path, max_items_per_line: u32) -> ClientConfig {
    ClientConfig {
        max_items_per_line,
        cart_path: dir.join("cart.json"),
        ..ClientConfig::default()
    }
}

fn file_store(config: &ClientConfig) -> JsonFileStore<LineItem> {
    JsonFileStore::new(&config.cart_path)
}

// ============================================================================
// Reconciliation
// ============================================================================

#[test]
fn test_removed_product_is_dropped() {
    let catalog = Catalog::from_products(vec![product(1, "Margherita")]);
    let limits = CartLimits::new(10).unwrap();

    let result = cart::reconcile(&[line(1, 3), line(2, 2)], &catalog, limits);

    assert_eq!(result.cart, vec![line(1, 3)]);
    assert_eq!(result.dropped, vec![(line(2, 2), DropReason::UnknownProduct)]);
    assert_eq!(cart::item_count(&result.cart), 3);
}

#[test]
fn test_lowered_limit_clamps_persisted_batch() {
    let catalog = Catalog::from_products(vec![product(1, "Margherita")]);
    let persisted = cart::add(&[], line(1, 8), CartLimits::new(10).unwrap());

    let result = cart::reconcile(&persisted, &catalog, CartLimits::new(5).unwrap());

    assert_eq!(result.cart, vec![line(1, 5)]);
    assert_eq!(result.clamped, 1);
    assert!(result.is_changed());
}

// ============================================================================
// Persistence
// ============================================================================

#[tokio::test]
async fn test_catalog_removal_rewrites_cart_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = file_config(dir.path(), 10);
    file_store(&config).write(&[line(1, 3), line(2, 2)]).unwrap();

    let mut ctx = TestContext::start(&config, file_store(&config)).unwrap();
    ctx.until(|s| s.cart_count == 5).await.unwrap();

    ctx.remote
        .publish("products", &[product(1, "Margherita")])
        .unwrap();
    ctx.until(|s| s.catalog.is_loaded() && s.cart_count == 3)
        .await
        .unwrap();
    ctx.stop().await.unwrap();

    assert_eq!(file_store(&config).read().unwrap(), vec![line(1, 3)]);
}

#[tokio::test]
async fn test_lowered_limit_is_applied_before_the_catalog_arrives() {
    let dir = tempfile::tempdir().unwrap();
    let config = file_config(dir.path(), 5);
    file_store(&config).write(&[line(1, 8)]).unwrap();

    let mut ctx = TestContext::start(&config, file_store(&config)).unwrap();
    ctx.until(|s| s.cart_count == 5).await.unwrap();
    assert!(!ctx.reader.current().catalog.is_loaded());
    ctx.stop().await.unwrap();

    assert_eq!(file_store(&config).read().unwrap(), vec![line(1, 5)]);
}

#[tokio::test]
async fn test_cart_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config = file_config(dir.path(), 10);

    let mut ctx = TestContext::start(&config, file_store(&config)).unwrap();
    ctx.remote
        .publish("products", &[product(1, "Margherita"), product(2, "Pepperoni")])
        .unwrap();
    ctx.until(|s| s.catalog.len() == 2).await.unwrap();
    ctx.handle.add_to_cart(line(1, 2).with_option("large")).unwrap();
    ctx.handle.add_to_cart(line(1, 2).with_option("large")).unwrap();
    ctx.handle.add_to_cart(line(2, 1)).unwrap();
    ctx.until(|s| s.cart_count == 5).await.unwrap();
    assert_eq!(ctx.reader.current().cart.len(), 2);
    ctx.stop().await.unwrap();

    let mut ctx = TestContext::start(&config, file_store(&config)).unwrap();
    ctx.until(|s| s.cart_count == 5).await.unwrap();
    let snapshot = ctx.reader.current();
    assert_eq!(snapshot.cart.first().map(|l| l.quantity), Some(4));
    ctx.stop().await.unwrap();
}

#[tokio::test]
async fn test_unreadable_cart_file_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let config = file_config(dir.path(), 10);
    std::fs::write(&config.cart_path, "not json").unwrap();

    let mut ctx = TestContext::start(&config, file_store(&config)).unwrap();
    ctx.handle.add_to_cart(line(7, 2)).unwrap();
    ctx.until(|s| s.cart_count == 2).await.unwrap();
    ctx.stop().await.unwrap();

    assert_eq!(file_store(&config).read().unwrap(), vec![line(7, 2)]);
}

#[tokio::test]
async fn test_unchanged_cart_is_not_rewritten() {
    let store = memory_cart(vec![line(1, 2)]);
    let mut ctx = TestContext::start(&ClientConfig::default(), store.clone()).unwrap();

    ctx.remote
        .publish("products", &[product(1, "Margherita")])
        .unwrap();
    ctx.until(|s| s.catalog.is_loaded()).await.unwrap();
    ctx.handle.set_quantity(0, 2).unwrap();
    ctx.handle.add_to_cart(LineItem::new(ProductId::new(9), 1)).unwrap();
    ctx.handle.remove_line(0).unwrap();
    ctx.until(|s| s.cart_count == 0).await.unwrap();
    ctx.stop().await.unwrap();

    // Only the removal touched the store
    assert_eq!(store.writes(), 1);
    assert!(store.records().is_empty());
}
