//! Shared, read-only application state.
//!
//! The orchestrator publishes a new [`StoreSnapshot`] for every change.
//! Readers hold an `Arc` to an immutable value, so they never observe a
//! partially applied update.

use std::sync::Arc;

use crust_core::{Category, Identity, LineItem, Order};
use tokio::sync::watch;

use crate::access::{self, CapabilityDescriptor};
use crate::catalog::Catalog;
use crate::error::{ClientError, Result};
use crate::orders::{self, OrderRow};
use crate::routing::{self, CapabilityTable};
use crate::session::{SessionErrorCode, SessionMode};

/// One consistent view of everything the client knows.
#[derive(Debug, Clone)]
pub struct StoreSnapshot {
    pub identity: Arc<Identity>,
    pub catalog: Catalog,
    pub categories: Arc<[Category]>,
    pub orders: Arc<[Order]>,
    /// Client profiles, for the admin order console.
    pub clients: Arc<[Identity]>,
    /// The reconciled cart.
    pub cart: Arc<[LineItem]>,
    /// Sum of quantities in [`cart`](Self::cart).
    pub cart_count: u64,
    /// Routes visible to [`identity`](Self::identity).
    pub routes: Arc<[CapabilityDescriptor]>,
    /// Menu entries visible to [`identity`](Self::identity).
    pub menu: Arc<[CapabilityDescriptor]>,
    /// Profile and sign-in entries visible to [`identity`](Self::identity).
    pub auth: Arc<[CapabilityDescriptor]>,
    pub session_code: SessionErrorCode,
    pub session_mode: SessionMode,
}

impl StoreSnapshot {
    /// The state at process start: the guest, a pending catalog and an
    /// empty cart.
    #[must_use]
    pub fn initial(table: &CapabilityTable) -> Self {
        let guest = Identity::guest();
        Self {
            routes: access::visible(&table.routes, &guest).into(),
            menu: access::visible(&table.menu, &guest).into(),
            auth: access::visible(&table.auth, &guest).into(),
            identity: Arc::new(guest),
            catalog: Catalog::pending(),
            categories: Arc::from([]),
            orders: Arc::from([]),
            clients: Arc::from([]),
            cart: Arc::from([]),
            cart_count: 0,
            session_code: SessionErrorCode::None,
            session_mode: SessionMode::Normal,
        }
    }

    /// Rows for the admin order console.
    #[must_use]
    pub fn order_rows(&self) -> Vec<OrderRow> {
        orders::order_rows(&self.orders, &self.clients, &self.catalog)
    }

    /// Where the current identity lands after signing in.
    #[must_use]
    pub fn landing_path(&self) -> &'static str {
        routing::landing_path(&self.identity, self.cart_count)
    }
}

/// Read access to the published [`StoreSnapshot`]. Cheap to clone.
#[derive(Debug, Clone)]
pub struct StateReader {
    rx: watch::Receiver<Arc<StoreSnapshot>>,
}

impl StateReader {
    pub(crate) const fn new(rx: watch::Receiver<Arc<StoreSnapshot>>) -> Self {
        Self { rx }
    }

    /// The latest snapshot.
    #[must_use]
    pub fn current(&self) -> Arc<StoreSnapshot> {
        Arc::clone(&self.rx.borrow())
    }

    /// Wait for a snapshot newer than the last one seen by this reader.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::OrchestratorStopped`] once the orchestrator
    /// has shut down.
    pub async fn changed(&mut self) -> Result<Arc<StoreSnapshot>> {
        self.rx
            .changed()
            .await
            .map_err(|_| ClientError::OrchestratorStopped)?;
        Ok(Arc::clone(&self.rx.borrow_and_update()))
    }

    /// Wait until `predicate` holds for the current snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::OrchestratorStopped`] if the orchestrator
    /// shuts down before that happens.
    pub async fn wait_for(
        &mut self,
        mut predicate: impl FnMut(&StoreSnapshot) -> bool,
    ) -> Result<Arc<StoreSnapshot>> {
        let snapshot = self
            .rx
            .wait_for(|snapshot| predicate(snapshot.as_ref()))
            .await
            .map_err(|_| ClientError::OrchestratorStopped)?;
        Ok(Arc::clone(&snapshot))
    }
}
