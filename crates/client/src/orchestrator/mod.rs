//! Application orchestrator.
//!
//! [`AppOrchestrator`] owns every subscription for the lifetime of the
//! session and runs a single task: events from the remote feeds and
//! commands from [`StorefrontHandle`]s are applied one at a time by the
//! [`Dispatcher`], which is the only writer of shared state.
//!
//! ```rust,ignore
//! let (orchestrator, handle, reader) =
//!     AppOrchestrator::new(&config, CapabilityTable::default(), remote, auth, local)?;
//! let task = tokio::spawn(orchestrator.run());
//!
//! handle.add_to_cart(LineItem::new(ProductId::new(1), 2))?;
//! let snapshot = reader.wait_for(|s| s.cart_count == 2).await?;
//!
//! handle.shutdown();
//! task.await?;
//! ```

mod dispatcher;

pub use dispatcher::{Dispatcher, Effect, Outcome};

use crust_core::{Category, Identity, LineItem, Order, Product};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::config::{ClientConfig, CollectionNames};
use crate::error::{ClientError, Result, report_error};
use crate::remote::{CollectionSource, FeedEvent, IdentitySource};
use crate::routing::CapabilityTable;
use crate::state::StateReader;
use crate::store::LocalStore;
use crate::sync::{IdentityStream, IdentityUpdate, open_collection, open_identity};

/// A request sent to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Voluntary sign-out of the current identity.
    RequestSignOut,
    AddToCart(LineItem),
    SetQuantity { index: usize, quantity: i64 },
    RemoveLine(usize),
    ClearCart,
}

/// Cloneable handle for sending commands to a running orchestrator.
#[derive(Debug, Clone)]
pub struct StorefrontHandle {
    commands: mpsc::UnboundedSender<Command>,
    shutdown: CancellationToken,
}

impl StorefrontHandle {
    /// Sign the current identity out.
    ///
    /// The resulting guest emission is treated as voluntary.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::OrchestratorStopped`] if the orchestrator is
    /// no longer running.
    pub fn request_sign_out(&self) -> Result<()> {
        self.send(Command::RequestSignOut)
    }

    /// # Errors
    ///
    /// Returns [`ClientError::OrchestratorStopped`] if the orchestrator is
    /// no longer running.
    pub fn add_to_cart(&self, batch: LineItem) -> Result<()> {
        self.send(Command::AddToCart(batch))
    }

    /// # Errors
    ///
    /// Returns [`ClientError::OrchestratorStopped`] if the orchestrator is
    /// no longer running.
    pub fn set_quantity(&self, index: usize, quantity: i64) -> Result<()> {
        self.send(Command::SetQuantity { index, quantity })
    }

    /// # Errors
    ///
    /// Returns [`ClientError::OrchestratorStopped`] if the orchestrator is
    /// no longer running.
    pub fn remove_line(&self, index: usize) -> Result<()> {
        self.send(Command::RemoveLine(index))
    }

    /// # Errors
    ///
    /// Returns [`ClientError::OrchestratorStopped`] if the orchestrator is
    /// no longer running.
    pub fn clear_cart(&self) -> Result<()> {
        self.send(Command::ClearCart)
    }

    /// Stop the orchestrator. Every subscription is disposed before
    /// [`AppOrchestrator::run`] returns.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| ClientError::OrchestratorStopped)
    }
}

/// Owner of the subscriptions, the local cart store and shared state.
pub struct AppOrchestrator<R, I, L> {
    remote: R,
    auth: I,
    local: L,
    collections: CollectionNames,
    dispatcher: Dispatcher,
    commands: mpsc::UnboundedReceiver<Command>,
    shutdown: CancellationToken,
}

impl<R, I, L> AppOrchestrator<R, I, L>
where
    R: CollectionSource,
    I: IdentitySource,
    L: LocalStore<LineItem>,
{
    /// Create an orchestrator. Nothing is subscribed until [`run`](Self::run).
    ///
    /// # Errors
    ///
    /// Returns an error if the configured cart limit is invalid.
    pub fn new(
        config: &ClientConfig,
        table: CapabilityTable,
        remote: R,
        auth: I,
        local: L,
    ) -> Result<(Self, StorefrontHandle, StateReader)> {
        let limits = config.cart_limits()?;
        let (dispatcher, reader) = Dispatcher::new(limits, table);
        let (commands_tx, commands) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();

        let handle = StorefrontHandle {
            commands: commands_tx,
            shutdown: shutdown.clone(),
        };
        let orchestrator = Self {
            remote,
            auth,
            local,
            collections: config.collections.clone(),
            dispatcher,
            commands,
            shutdown,
        };
        Ok((orchestrator, handle, reader))
    }

    /// Subscribe to every feed and apply events until shut down.
    #[instrument(skip_all, name = "orchestrator")]
    pub async fn run(mut self) {
        let token = self.shutdown.clone();
        let names = &self.collections;
        let mut identity = open_identity(&self.auth, &token);
        let mut products = open_collection::<Product, _>(&self.remote, &names.products, &token);
        let mut categories =
            open_collection::<Category, _>(&self.remote, &names.categories, &token);
        let mut orders = open_collection::<Order, _>(&self.remote, &names.orders, &token);
        let mut clients = open_collection::<Identity, _>(&self.remote, &names.clients, &token);
        info!("Orchestrator started");

        let stored = self.local.read().unwrap_or_else(|e| {
            report_error(&e, "Failed to read the persisted cart");
            Vec::new()
        });
        let outcome = self.dispatcher.load_cart(&stored);
        self.apply(outcome, &mut identity);

        loop {
            let outcome = tokio::select! {
                () = token.cancelled() => break,
                Some(command) = self.commands.recv() => self.dispatcher.on_command(command),
                Some(update) = identity.next(), if identity.is_active() => match update {
                    IdentityUpdate::Emission(emission) => self.dispatcher.on_identity(emission),
                    IdentityUpdate::Failed(e) => self.dispatcher.on_failure("identity", &e),
                },
                Some(event) = products.next(), if products.is_active() => match event {
                    FeedEvent::Snapshot(items) => self.dispatcher.on_catalog(items),
                    FeedEvent::Failed(e) => self.dispatcher.on_failure(products.name(), &e),
                },
                Some(event) = categories.next(), if categories.is_active() => match event {
                    FeedEvent::Snapshot(items) => self.dispatcher.on_categories(items),
                    FeedEvent::Failed(e) => self.dispatcher.on_failure(categories.name(), &e),
                },
                Some(event) = orders.next(), if orders.is_active() => match event {
                    FeedEvent::Snapshot(items) => self.dispatcher.on_orders(items),
                    FeedEvent::Failed(e) => self.dispatcher.on_failure(orders.name(), &e),
                },
                Some(event) = clients.next(), if clients.is_active() => match event {
                    FeedEvent::Snapshot(items) => self.dispatcher.on_clients(items),
                    FeedEvent::Failed(e) => self.dispatcher.on_failure(clients.name(), &e),
                },
                else => break,
            };
            self.apply(outcome, &mut identity);
        }

        identity.dispose();
        products.dispose();
        categories.dispose();
        orders.dispose();
        clients.dispose();
        info!("Orchestrator stopped");
    }

    fn apply(&mut self, outcome: Outcome, identity: &mut IdentityStream) {
        for effect in outcome.effects {
            match effect {
                Effect::SignOut => {
                    info!("Requesting sign-out");
                    identity.request_sign_out();
                    self.auth.sign_out();
                }
                Effect::PersistCart(cart) => {
                    if let Err(e) = self.local.write(&cart) {
                        report_error(&e, "Failed to persist the cart");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use crust_core::ProductId;
    use tokio::task::JoinHandle;
    use tokio::time::timeout;

    use super::*;
    use crate::catalog::fixtures::product;
    use crate::remote::{MemoryDocumentStore, SourceError};
    use crate::session::{SessionErrorCode, SessionMode};
    use crate::state::StoreSnapshot;
    use crate::store::MemoryStore;

    const WAIT: Duration = Duration::from_secs(5);

    struct Harness {
        remote: MemoryDocumentStore,
        local: MemoryStore<LineItem>,
        handle: StorefrontHandle,
        reader: StateReader,
        task: JoinHandle<()>,
    }

    impl Harness {
        fn start(cart: Vec<LineItem>) -> Self {
            let remote = MemoryDocumentStore::new();
            let local = MemoryStore::with_records(cart);
            let (orchestrator, handle, reader) = AppOrchestrator::new(
                &ClientConfig::default(),
                CapabilityTable::default(),
                remote.clone(),
                remote.clone(),
                local.clone(),
            )
            .unwrap();
            let task = tokio::spawn(orchestrator.run());
            Self {
                remote,
                local,
                handle,
                reader,
                task,
            }
        }

        async fn until(&mut self, predicate: impl FnMut(&StoreSnapshot) -> bool) {
            timeout(WAIT, self.reader.wait_for(predicate))
                .await
                .unwrap()
                .unwrap();
        }

        async fn stop(self) -> MemoryStore<LineItem> {
            self.handle.shutdown();
            timeout(WAIT, self.task).await.unwrap().unwrap();
            self.local
        }
    }

    fn line(product: i64, quantity: i64) -> LineItem {
        LineItem::new(ProductId::new(product), quantity)
    }

    #[tokio::test]
    async fn test_catalog_removal_rewrites_persisted_cart() {
        let mut harness = Harness::start(vec![line(1, 3), line(2, 2)]);
        harness
            .remote
            .publish("products", &[product(1, "Margherita"), product(2, "Pepperoni")])
            .unwrap();
        harness
            .until(|s| s.catalog.len() == 2 && s.cart_count == 5)
            .await;

        harness
            .remote
            .publish("products", &[product(1, "Margherita")])
            .unwrap();
        harness.until(|s| s.cart_count == 3).await;

        let local = harness.stop().await;
        assert_eq!(local.records(), vec![line(1, 3)]);
        assert_eq!(local.writes(), 1);
    }

    #[tokio::test]
    async fn test_forced_sign_out_on_auth_error() {
        let mut harness = Harness::start(Vec::new());
        harness.remote.sign_in(Identity::client("u1", "Dana"));
        harness.until(|s| s.identity.is_authenticated()).await;

        harness
            .remote
            .fail("orders", SourceError::PermissionDenied("orders".to_owned()));
        harness
            .until(|s| s.identity.is_guest() && s.session_code == SessionErrorCode::None)
            .await;

        assert_eq!(harness.remote.sign_out_requests(), 1);
        harness.stop().await;
    }

    #[tokio::test]
    async fn test_transport_error_degrades_until_recovery() {
        let mut harness = Harness::start(Vec::new());
        harness
            .remote
            .fail("categories", SourceError::Unavailable("offline".to_owned()));
        harness
            .until(|s| s.session_mode == SessionMode::Degraded)
            .await;

        harness.remote.publish::<Category>("categories", &[]).unwrap();
        harness
            .until(|s| s.session_mode == SessionMode::Normal)
            .await;
        harness.stop().await;
    }

    #[tokio::test]
    async fn test_commands_after_shutdown_fail() {
        let harness = Harness::start(Vec::new());
        let handle = harness.handle.clone();
        harness.stop().await;
        assert!(matches!(
            handle.clear_cart(),
            Err(ClientError::OrchestratorStopped)
        ));
    }
}
