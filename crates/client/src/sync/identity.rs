//! The identity feed.
//!
//! Both a requested sign-out and an expired credential end in the same
//! guest emission. [`SignOutTracker`] tells them apart by remembering
//! whether an authenticated identity was seen and whether the consumer
//! asked to sign out since.

use crust_core::Identity;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::Subscription;
use crate::remote::{FeedEvent, IdentitySource, SourceError};

/// How an identity emission relates to the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmissionKind {
    /// An authenticated identity (a sign-in or a profile update).
    SignedIn,
    /// The guest, with no authenticated identity before it.
    Guest,
    /// The guest after a requested sign-out.
    SignedOut,
    /// The guest after an authenticated identity, without a request.
    ImposedSignOut,
}

/// A classified identity emission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityEmission {
    pub identity: Identity,
    pub kind: EmissionKind,
}

/// One event of an [`IdentityStream`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityUpdate {
    Emission(IdentityEmission),
    Failed(SourceError),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SignOutTracker {
    authenticated_seen: bool,
    sign_out_requested: bool,
}

impl SignOutTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a consumer-initiated sign-out. Ignored while no
    /// authenticated identity has been seen.
    pub const fn request_sign_out(&mut self) {
        if self.authenticated_seen {
            self.sign_out_requested = true;
        }
    }

    /// Classify `identity`, normalizing an empty id to the guest.
    pub fn observe(&mut self, identity: Identity) -> IdentityEmission {
        let identity = identity.normalized();
        let kind = if identity.is_authenticated() {
            self.authenticated_seen = true;
            EmissionKind::SignedIn
        } else if std::mem::take(&mut self.authenticated_seen) {
            if std::mem::take(&mut self.sign_out_requested) {
                EmissionKind::SignedOut
            } else {
                EmissionKind::ImposedSignOut
            }
        } else {
            EmissionKind::Guest
        };
        IdentityEmission { identity, kind }
    }
}

/// The identity subscription together with its sign-out tracking.
#[derive(Debug)]
pub struct IdentityStream {
    subscription: Subscription<Identity>,
    tracker: SignOutTracker,
}

/// Subscribe to the identity feed of `source`.
pub fn open_identity<I>(source: &I, parent: &CancellationToken) -> IdentityStream
where
    I: IdentitySource,
{
    let cancel = parent.child_token();
    let feed = source.subscribe(cancel.clone());
    IdentityStream {
        subscription: Subscription::new("identity", feed, cancel),
        tracker: SignOutTracker::new(),
    }
}

impl IdentityStream {
    /// Wait for the next update. Cancel safe.
    pub async fn next(&mut self) -> Option<IdentityUpdate> {
        let update = match self.subscription.next().await? {
            FeedEvent::Snapshot(identity) => {
                let emission = self.tracker.observe(identity);
                if emission.kind == EmissionKind::ImposedSignOut {
                    info!("Identity lost without a sign-out request");
                }
                IdentityUpdate::Emission(emission)
            }
            FeedEvent::Failed(error) => IdentityUpdate::Failed(error),
        };
        Some(update)
    }

    /// Mark the next guest emission as voluntary.
    pub const fn request_sign_out(&mut self) {
        self.tracker.request_sign_out();
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.subscription.is_active()
    }

    pub fn dispose(&mut self) {
        self.subscription.dispose();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;
    use crate::remote::MemoryDocumentStore;

    const WAIT: Duration = Duration::from_secs(2);

    fn dana() -> Identity {
        Identity::client("u1", "Dana")
    }

    #[test]
    fn test_requested_sign_out() {
        let mut tracker = SignOutTracker::new();
        assert_eq!(tracker.observe(Identity::guest()).kind, EmissionKind::Guest);
        assert_eq!(tracker.observe(dana()).kind, EmissionKind::SignedIn);
        tracker.request_sign_out();
        assert_eq!(
            tracker.observe(Identity::guest()).kind,
            EmissionKind::SignedOut
        );
    }

    #[test]
    fn test_imposed_sign_out() {
        let mut tracker = SignOutTracker::new();
        tracker.observe(dana());
        assert_eq!(
            tracker.observe(Identity::guest()).kind,
            EmissionKind::ImposedSignOut
        );
        // Only the first guest after an authenticated identity counts.
        assert_eq!(tracker.observe(Identity::guest()).kind, EmissionKind::Guest);
    }

    #[test]
    fn test_request_while_guest_is_ignored() {
        let mut tracker = SignOutTracker::new();
        tracker.request_sign_out();
        tracker.observe(dana());
        assert_eq!(
            tracker.observe(Identity::guest()).kind,
            EmissionKind::ImposedSignOut
        );
    }

    #[test]
    fn test_request_survives_profile_update() {
        let mut tracker = SignOutTracker::new();
        tracker.observe(dana());
        tracker.request_sign_out();
        tracker.observe(Identity {
            name: "Dana R".to_owned(),
            ..dana()
        });
        assert_eq!(
            tracker.observe(Identity::guest()).kind,
            EmissionKind::SignedOut
        );
    }

    #[test]
    fn test_empty_id_is_normalized_to_guest() {
        let mut tracker = SignOutTracker::new();
        let emission = tracker.observe(Identity {
            name: "leftover".to_owned(),
            is_admin: true,
            ..Identity::guest()
        });
        assert_eq!(emission.identity, Identity::GUEST);
    }

    #[tokio::test]
    async fn test_stream_classifies_expired_session() {
        let store = MemoryDocumentStore::new();
        store.sign_in(dana());
        let mut stream = open_identity(&store, &CancellationToken::new());

        let first = timeout(WAIT, stream.next()).await.unwrap().unwrap();
        assert!(matches!(
            first,
            IdentityUpdate::Emission(IdentityEmission { kind: EmissionKind::SignedIn, .. })
        ));

        store.expire_session();
        let second = timeout(WAIT, stream.next()).await.unwrap().unwrap();
        assert!(matches!(
            second,
            IdentityUpdate::Emission(IdentityEmission { kind: EmissionKind::ImposedSignOut, .. })
        ));

        stream.dispose();
        assert!(!stream.is_active());
        assert_eq!(stream.next().await, None);
    }
}
