//! Live snapshot subscriptions.
//!
//! A [`Subscription`] wraps one remote feed together with its cancellation
//! token. Consumers pull events with [`Subscription::next`]; each snapshot
//! fully supersedes the previous one.

mod collection;
mod identity;

pub use collection::{Subscription, open_collection};
pub use identity::{
    EmissionKind, IdentityEmission, IdentityStream, IdentityUpdate, SignOutTracker, open_identity,
};
