//! In-process document store and authentication provider.
//!
//! Collections hold JSON documents and are replaced wholesale by
//! [`MemoryDocumentStore::publish`]. Failures can be injected per collection
//! or on the identity feed, and sign-out requests are counted.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crust_core::Identity;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{CollectionSource, FEED_CAPACITY, FeedEvent, IdentitySource, SourceError};

/// State of one collection as seen by new subscribers.
#[derive(Debug, Clone)]
enum CollectionState {
    /// Nothing published yet; subscribers wait.
    Pending,
    Ready(Arc<[serde_json::Value]>),
    Failed(SourceError),
}

struct Inner {
    collections: Mutex<HashMap<String, watch::Sender<CollectionState>>>,
    auth: watch::Sender<FeedEvent<Identity>>,
    sign_out_requests: AtomicUsize,
}

/// Cheaply cloneable in-memory store; clones share the same data.
#[derive(Clone)]
pub struct MemoryDocumentStore {
    inner: Arc<Inner>,
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocumentStore {
    /// Create an empty store with the guest signed in.
    #[must_use]
    pub fn new() -> Self {
        let (auth, _) = watch::channel(FeedEvent::Snapshot(Identity::guest()));
        Self {
            inner: Arc::new(Inner {
                collections: Mutex::new(HashMap::new()),
                auth,
                sign_out_requests: AtomicUsize::new(0),
            }),
        }
    }

    /// Replace the contents of `collection`.
    ///
    /// # Errors
    ///
    /// Returns an error if a document cannot be serialized.
    pub fn publish<T: Serialize>(
        &self,
        collection: &str,
        documents: &[T],
    ) -> Result<(), serde_json::Error> {
        let documents = documents
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        debug!(collection, count = documents.len(), "Publishing documents");
        self.with_collection(collection, |state| {
            state.send_replace(CollectionState::Ready(documents.into()));
        });
        Ok(())
    }

    /// Make `collection` fail for current and future subscribers.
    pub fn fail(&self, collection: &str, error: SourceError) {
        self.with_collection(collection, |state| {
            state.send_replace(CollectionState::Failed(error));
        });
    }

    /// Sign `identity` in.
    pub fn sign_in(&self, identity: Identity) {
        self.inner.auth.send_replace(FeedEvent::Snapshot(identity));
    }

    /// Drop the credential on the provider side without a sign-out request.
    pub fn expire_session(&self) {
        self.inner
            .auth
            .send_replace(FeedEvent::Snapshot(Identity::guest()));
    }

    /// Make the identity feed report `error`.
    pub fn fail_auth(&self, error: SourceError) {
        self.inner.auth.send_replace(FeedEvent::Failed(error));
    }

    /// Number of [`IdentitySource::sign_out`] calls received so far.
    #[must_use]
    pub fn sign_out_requests(&self) -> usize {
        self.inner.sign_out_requests.load(Ordering::SeqCst)
    }

    fn with_collection<R>(
        &self,
        collection: &str,
        f: impl FnOnce(&watch::Sender<CollectionState>) -> R,
    ) -> R {
        let mut collections = self
            .inner
            .collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let state = collections
            .entry(collection.to_owned())
            .or_insert_with(|| watch::channel(CollectionState::Pending).0);
        f(state)
    }
}

impl CollectionSource for MemoryDocumentStore {
    fn subscribe<T>(
        &self,
        collection: &str,
        cancel: CancellationToken,
    ) -> mpsc::Receiver<FeedEvent<Vec<T>>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let state = self.with_collection(collection, watch::Sender::subscribe);
        let name = collection.to_owned();
        spawn_feed(state, cancel, move |state| match state {
            CollectionState::Pending => None,
            CollectionState::Ready(documents) => {
                Some(FeedEvent::Snapshot(decode_documents(&name, documents)))
            }
            CollectionState::Failed(error) => Some(FeedEvent::Failed(error.clone())),
        })
    }
}

impl IdentitySource for MemoryDocumentStore {
    fn subscribe(&self, cancel: CancellationToken) -> mpsc::Receiver<FeedEvent<Identity>> {
        spawn_feed(self.inner.auth.subscribe(), cancel, |event| Some(event.clone()))
    }

    fn sign_out(&self) {
        self.inner.sign_out_requests.fetch_add(1, Ordering::SeqCst);
        self.inner
            .auth
            .send_replace(FeedEvent::Snapshot(Identity::guest()));
    }
}

/// Forward every value of `state` (starting with the current one) into a
/// bounded feed until `cancel` fires or the receiver goes away.
fn spawn_feed<S, E>(
    mut state: watch::Receiver<S>,
    cancel: CancellationToken,
    map: impl Fn(&S) -> Option<E> + Send + 'static,
) -> mpsc::Receiver<E>
where
    S: Send + Sync + 'static,
    E: Send + 'static,
{
    let (tx, rx) = mpsc::channel(FEED_CAPACITY);
    tokio::spawn(async move {
        loop {
            let event = map(&*state.borrow_and_update());
            if let Some(event) = event {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    sent = tx.send(event) => if sent.is_err() { break },
                }
            }
            tokio::select! {
                () = cancel.cancelled() => break,
                changed = state.changed() => if changed.is_err() { break },
            }
        }
        debug!("Memory feed released");
    });
    rx
}

fn decode_documents<T: DeserializeOwned>(
    collection: &str,
    documents: &[serde_json::Value],
) -> Vec<T> {
    documents
        .iter()
        .filter_map(|document| match T::deserialize(document) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!(collection, error = %e, "Skipping malformed document");
                None
            }
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use crust_core::{Category, CategoryId};
    use tokio::time::timeout;

    use super::*;

    const WAIT: Duration = Duration::from_secs(2);

    fn category(id: i64, name: &str) -> Category {
        Category {
            id: CategoryId::new(id),
            name: name.to_owned(),
        }
    }

    #[tokio::test]
    async fn test_subscriber_waits_for_first_publish() {
        let store = MemoryDocumentStore::new();
        let mut feed =
            CollectionSource::subscribe::<Category>(&store, "categories", CancellationToken::new());

        assert!(timeout(Duration::from_millis(50), feed.recv()).await.is_err());

        store.publish("categories", &[category(1, "Pizza")]).unwrap();
        let event = timeout(WAIT, feed.recv()).await.unwrap().unwrap();
        assert_eq!(event, FeedEvent::Snapshot(vec![category(1, "Pizza")]));
    }

    #[tokio::test]
    async fn test_late_subscriber_sees_current_snapshot() {
        let store = MemoryDocumentStore::new();
        store.publish("categories", &[category(1, "Pizza")]).unwrap();
        store
            .publish("categories", &[category(1, "Pizza"), category(2, "Drinks")])
            .unwrap();

        let mut feed =
            CollectionSource::subscribe::<Category>(&store, "categories", CancellationToken::new());
        let FeedEvent::Snapshot(items) = timeout(WAIT, feed.recv()).await.unwrap().unwrap() else {
            panic!("expected snapshot");
        };
        assert_eq!(items.len(), 2);
    }

    #[tokio::test]
    async fn test_malformed_documents_are_skipped() {
        let store = MemoryDocumentStore::new();
        store
            .publish(
                "categories",
                &[
                    serde_json::json!({"id": 1, "name": "Pizza"}),
                    serde_json::json!({"name": "no id"}),
                ],
            )
            .unwrap();

        let mut feed =
            CollectionSource::subscribe::<Category>(&store, "categories", CancellationToken::new());
        let event = timeout(WAIT, feed.recv()).await.unwrap().unwrap();
        assert_eq!(event, FeedEvent::Snapshot(vec![category(1, "Pizza")]));
    }

    #[tokio::test]
    async fn test_cancel_releases_feed() {
        let store = MemoryDocumentStore::new();
        let cancel = CancellationToken::new();
        let mut feed = CollectionSource::subscribe::<Category>(&store, "categories", cancel.clone());

        cancel.cancel();
        assert!(timeout(WAIT, feed.recv()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sign_out_is_counted_and_emits_guest() {
        let store = MemoryDocumentStore::new();
        store.sign_in(Identity::client("u1", "Dana"));
        let mut feed = IdentitySource::subscribe(&store, CancellationToken::new());
        let first = timeout(WAIT, feed.recv()).await.unwrap().unwrap();
        assert_eq!(first, FeedEvent::Snapshot(Identity::client("u1", "Dana")));

        store.sign_out();
        let second = timeout(WAIT, feed.recv()).await.unwrap().unwrap();
        assert_eq!(second, FeedEvent::Snapshot(Identity::guest()));
        assert_eq!(store.sign_out_requests(), 1);
    }
}
