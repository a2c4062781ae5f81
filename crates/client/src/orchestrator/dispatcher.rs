//! The single writer of shared state.
//!
//! [`Dispatcher`] applies one event at a time to a draft [`StoreSnapshot`]
//! and publishes the result. It performs no I/O: side effects are returned
//! as [`Effect`]s for the run loop to carry out.

use std::sync::Arc;

use crust_core::{Category, Identity, LineItem, Order, Product};
use tokio::sync::watch;
use tracing::{debug, info};

use super::Command;
use crate::access;
use crate::cart::{self, CartLimits};
use crate::catalog::Catalog;
use crate::error::{add_breadcrumb, clear_sentry_user, report_error, set_sentry_user};
use crate::remote::SourceError;
use crate::routing::CapabilityTable;
use crate::session::{
    SessionEffect, SessionErrorCode, SessionErrorMachine, SessionMode, SessionState, Transition,
};
use crate::state::{StateReader, StoreSnapshot};
use crate::sync::{EmissionKind, IdentityEmission};

/// A side effect requested by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Ask the identity source to sign the current identity out.
    SignOut,
    /// Replace the persisted cart.
    PersistCart(Vec<LineItem>),
}

/// What handling one event produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    pub effects: Vec<Effect>,
    /// Session state changes, in order.
    pub transitions: Vec<Transition>,
}

impl Outcome {
    fn push_transition(&mut self, transition: Transition) {
        if transition.effect == Some(SessionEffect::ForceSignOut) {
            self.effects.push(Effect::SignOut);
        }
        if transition.is_change() {
            self.transitions.push(transition);
        }
    }
}

#[derive(Debug)]
pub struct Dispatcher {
    draft: StoreSnapshot,
    session: SessionErrorMachine,
    limits: CartLimits,
    table: CapabilityTable,
    state: watch::Sender<Arc<StoreSnapshot>>,
}

impl Dispatcher {
    /// Create a dispatcher publishing the initial state.
    #[must_use]
    pub fn new(limits: CartLimits, table: CapabilityTable) -> (Self, StateReader) {
        let draft = StoreSnapshot::initial(&table);
        let (state, rx) = watch::channel(Arc::new(draft.clone()));
        let dispatcher = Self {
            draft,
            session: SessionErrorMachine::new(),
            limits,
            table,
            state,
        };
        (dispatcher, StateReader::new(rx))
    }

    #[must_use]
    pub const fn session_state(&self) -> SessionState {
        self.session.state()
    }

    /// Install the cart read from the local store at start.
    pub fn load_cart(&mut self, stored: &[LineItem]) -> Outcome {
        let mut outcome = Outcome::default();
        info!(lines = stored.len(), "Loaded persisted cart");
        self.reconcile_cart(stored, &mut outcome);
        self.publish();
        outcome
    }

    pub fn on_identity(&mut self, emission: IdentityEmission) -> Outcome {
        let mut outcome = Outcome::default();
        let IdentityEmission { identity, kind } = emission;
        match kind {
            EmissionKind::SignedIn => {
                set_sentry_user(&identity.id, identity.email.as_deref());
                add_breadcrumb(
                    "identity",
                    "Signed in",
                    Some(&[("id", identity.id.as_str())]),
                );
            }
            EmissionKind::SignedOut => {
                clear_sentry_user();
                add_breadcrumb("identity", "Signed out", None);
            }
            EmissionKind::ImposedSignOut => {
                clear_sentry_user();
                add_breadcrumb("identity", "Session expired", None);
            }
            EmissionKind::Guest => {}
        }

        self.set_identity(identity);

        match kind {
            EmissionKind::SignedIn => {
                let transition = self
                    .session
                    .signal(SessionErrorCode::None, &self.draft.identity);
                outcome.push_transition(transition);
            }
            EmissionKind::ImposedSignOut => {
                let transition = self
                    .session
                    .signal(SessionErrorCode::AuthError, &self.draft.identity);
                outcome.push_transition(transition);
                outcome.push_transition(self.session.guest_observed());
            }
            EmissionKind::SignedOut | EmissionKind::Guest => {
                outcome.push_transition(self.session.guest_observed());
            }
        }

        self.note_session();
        self.publish();
        outcome
    }

    /// A new catalog snapshot: replace it and reconcile the cart.
    pub fn on_catalog(&mut self, products: Vec<Product>) -> Outcome {
        let mut outcome = Outcome::default();
        self.draft.catalog = Catalog::from_products(products);
        debug!(products = self.draft.catalog.len(), "Catalog replaced");
        let current = self.draft.cart.to_vec();
        self.reconcile_cart(&current, &mut outcome);
        self.succeeded(&mut outcome);
        outcome
    }

    pub fn on_categories(&mut self, categories: Vec<Category>) -> Outcome {
        let mut outcome = Outcome::default();
        self.draft.categories = categories.into();
        self.succeeded(&mut outcome);
        outcome
    }

    pub fn on_orders(&mut self, orders: Vec<Order>) -> Outcome {
        let mut outcome = Outcome::default();
        self.draft.orders = orders.into();
        self.succeeded(&mut outcome);
        outcome
    }

    pub fn on_clients(&mut self, clients: Vec<Identity>) -> Outcome {
        let mut outcome = Outcome::default();
        self.draft.clients = clients.into();
        self.succeeded(&mut outcome);
        outcome
    }

    /// A subscription failed. Last known snapshots are retained.
    pub fn on_failure(&mut self, source: &str, error: &SourceError) -> Outcome {
        let mut outcome = Outcome::default();
        info!(source, %error, "Subscription failed");
        let transition = self.session.signal(error.code(), &self.draft.identity);
        if transition.is_change() && transition.to == SessionState::Degraded {
            report_error(error, "Session degraded");
        }
        outcome.push_transition(transition);
        self.note_session();
        self.publish();
        outcome
    }

    pub fn on_command(&mut self, command: Command) -> Outcome {
        let mut outcome = Outcome::default();
        debug!(?command, "Command received");
        let next = match command {
            Command::RequestSignOut => {
                if self.draft.identity.is_authenticated() {
                    outcome.effects.push(Effect::SignOut);
                }
                return outcome;
            }
            Command::AddToCart(batch) => cart::add(&self.draft.cart, batch, self.limits),
            Command::SetQuantity { index, quantity } => {
                cart::set_quantity(&self.draft.cart, index, quantity, self.limits)
            }
            Command::RemoveLine(index) => cart::remove(&self.draft.cart, index),
            Command::ClearCart => Vec::new(),
        };
        let reconciled = cart::reconcile(&next, &self.draft.catalog, self.limits).cart;
        if reconciled.as_slice() != &*self.draft.cart {
            outcome.effects.push(Effect::PersistCart(reconciled.clone()));
            self.install_cart(reconciled);
            self.publish();
        }
        outcome
    }

    /// Reconcile `cart` and install it, requesting a rewrite of the
    /// persisted copy when reconciliation changed anything.
    fn reconcile_cart(&mut self, cart: &[LineItem], outcome: &mut Outcome) {
        let reconciliation = cart::reconcile(cart, &self.draft.catalog, self.limits);
        if reconciliation.is_changed() {
            outcome
                .effects
                .push(Effect::PersistCart(reconciliation.cart.clone()));
        }
        self.install_cart(reconciliation.cart);
    }

    /// The item count is recomputed on every replacement.
    fn install_cart(&mut self, cart: Vec<LineItem>) {
        self.draft.cart_count = cart::item_count(&cart);
        self.draft.cart = cart.into();
    }

    fn set_identity(&mut self, identity: Identity) {
        self.draft.routes = access::visible(&self.table.routes, &identity).into();
        self.draft.menu = access::visible(&self.table.menu, &identity).into();
        self.draft.auth = access::visible(&self.table.auth, &identity).into();
        self.draft.identity = Arc::new(identity);
    }

    /// Every successful snapshot is a `none` signal.
    fn succeeded(&mut self, outcome: &mut Outcome) {
        let transition = self
            .session
            .signal(SessionErrorCode::None, &self.draft.identity);
        outcome.push_transition(transition);
        self.note_session();
        self.publish();
    }

    fn note_session(&mut self) {
        let mode = self.session.mode();
        if mode != self.draft.session_mode {
            let message = match mode {
                SessionMode::Normal => "Connection restored",
                SessionMode::Degraded => "Connection degraded",
            };
            add_breadcrumb("session", message, None);
        }
        self.draft.session_code = self.session.code();
        self.draft.session_mode = mode;
    }

    fn publish(&self) {
        self.state.send_replace(Arc::new(self.draft.clone()));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crust_core::ProductId;

    use super::*;
    use crate::catalog::fixtures::product;
    use crate::routing::{PATH_ADMIN_CATALOG, PATH_LOGIN};
    use crate::sync::SignOutTracker;

    fn dispatcher(max: u32) -> (Dispatcher, StateReader) {
        Dispatcher::new(CartLimits::new(max).unwrap(), CapabilityTable::default())
    }

    fn line(product: i64, quantity: i64) -> LineItem {
        LineItem::new(ProductId::new(product), quantity)
    }

    fn persisted(outcome: &Outcome) -> Option<&[LineItem]> {
        outcome.effects.iter().find_map(|effect| match effect {
            Effect::PersistCart(cart) => Some(cart.as_slice()),
            Effect::SignOut => None,
        })
    }

    fn sign_outs(outcome: &Outcome) -> usize {
        outcome
            .effects
            .iter()
            .filter(|effect| **effect == Effect::SignOut)
            .count()
    }

    #[test]
    fn test_cart_is_reconciled_when_catalog_arrives() {
        let (mut dispatcher, reader) = dispatcher(10);
        let loaded = dispatcher.load_cart(&[line(1, 3), line(2, 2)]);
        assert_eq!(persisted(&loaded), None);
        assert_eq!(reader.current().cart_count, 5);

        let outcome = dispatcher.on_catalog(vec![product(1, "Margherita")]);
        assert_eq!(persisted(&outcome), Some(&[line(1, 3)][..]));
        let snapshot = reader.current();
        assert_eq!(&*snapshot.cart, &[line(1, 3)]);
        assert_eq!(snapshot.cart_count, 3);
    }

    #[test]
    fn test_lowered_limit_rewrites_persisted_cart() {
        let (mut dispatcher, reader) = dispatcher(5);
        let outcome = dispatcher.load_cart(&[line(1, 8)]);
        assert_eq!(persisted(&outcome), Some(&[line(1, 5)][..]));
        assert_eq!(reader.current().cart_count, 5);
    }

    #[test]
    fn test_identity_recomputes_capabilities() {
        let (mut dispatcher, reader) = dispatcher(10);
        assert!(reader.current().auth.iter().any(|d| d.path == PATH_LOGIN));

        let mut tracker = SignOutTracker::new();
        dispatcher.on_identity(tracker.observe(Identity::administrator("a1", "Root")));

        let snapshot = reader.current();
        assert!(snapshot.identity.is_administrator());
        assert!(snapshot.menu.iter().any(|d| d.path == PATH_ADMIN_CATALOG));
        assert!(!snapshot.auth.iter().any(|d| d.path == PATH_LOGIN));
    }

    #[test]
    fn test_imposed_sign_out_recovers_without_request() {
        let (mut dispatcher, reader) = dispatcher(10);
        let mut tracker = SignOutTracker::new();
        dispatcher.on_identity(tracker.observe(Identity::client("u1", "Dana")));

        let outcome = dispatcher.on_identity(tracker.observe(Identity::guest()));
        assert_eq!(sign_outs(&outcome), 0);
        let states: Vec<_> = outcome.transitions.iter().map(|t| t.to).collect();
        assert_eq!(
            states,
            vec![SessionState::RecoveringFromAuthError, SessionState::Normal]
        );
        assert_eq!(reader.current().session_code, SessionErrorCode::None);
        assert!(reader.current().identity.is_guest());
    }

    #[test]
    fn test_auth_error_while_authenticated_forces_one_sign_out() {
        let (mut dispatcher, reader) = dispatcher(10);
        let mut tracker = SignOutTracker::new();
        dispatcher.on_identity(tracker.observe(Identity::client("u1", "Dana")));

        let first = dispatcher.on_failure("orders", &SourceError::Unauthenticated);
        let second = dispatcher.on_failure("clients", &SourceError::Unauthenticated);
        assert_eq!(sign_outs(&first) + sign_outs(&second), 1);
        assert_eq!(reader.current().session_code, SessionErrorCode::AuthError);
        assert_eq!(reader.current().session_mode, SessionMode::Normal);

        tracker.request_sign_out();
        let signed_out = dispatcher.on_identity(tracker.observe(Identity::guest()));
        assert_eq!(sign_outs(&signed_out), 0);
        assert_eq!(dispatcher.session_state(), SessionState::Normal);
    }

    #[test]
    fn test_transport_error_degrades_until_next_snapshot() {
        let (mut dispatcher, reader) = dispatcher(10);
        dispatcher.on_catalog(vec![product(1, "Margherita")]);

        dispatcher.on_failure("products", &SourceError::Unavailable("offline".to_owned()));
        let degraded = reader.current();
        assert_eq!(degraded.session_mode, SessionMode::Degraded);
        assert_eq!(degraded.catalog.len(), 1);

        dispatcher.on_categories(Vec::new());
        assert_eq!(reader.current().session_mode, SessionMode::Normal);
    }

    #[test]
    fn test_sign_out_request_only_when_authenticated() {
        let (mut dispatcher, _reader) = dispatcher(10);
        assert!(dispatcher.on_command(Command::RequestSignOut).effects.is_empty());

        let mut tracker = SignOutTracker::new();
        dispatcher.on_identity(tracker.observe(Identity::client("u1", "Dana")));
        assert_eq!(
            dispatcher.on_command(Command::RequestSignOut).effects,
            vec![Effect::SignOut]
        );
    }

    #[test]
    fn test_cart_commands_persist_changes() {
        let (mut dispatcher, reader) = dispatcher(10);
        dispatcher.on_catalog(vec![product(1, "Margherita"), product(2, "Pepperoni")]);

        let added = dispatcher.on_command(Command::AddToCart(line(1, 2)));
        assert_eq!(persisted(&added), Some(&[line(1, 2)][..]));

        let merged = dispatcher.on_command(Command::AddToCart(line(1, 9)));
        assert_eq!(persisted(&merged), Some(&[line(1, 10)][..]));

        let rejected = dispatcher.on_command(Command::SetQuantity {
            index: 0,
            quantity: 0,
        });
        assert!(rejected.effects.is_empty());

        let unknown = dispatcher.on_command(Command::AddToCart(line(7, 1)));
        assert!(unknown.effects.is_empty());

        dispatcher.on_command(Command::AddToCart(line(2, 1)));
        dispatcher.on_command(Command::RemoveLine(0));
        assert_eq!(&*reader.current().cart, &[line(2, 1)]);

        let cleared = dispatcher.on_command(Command::ClearCart);
        assert_eq!(persisted(&cleared), Some(&[][..]));
        assert_eq!(reader.current().cart_count, 0);
    }
}
