use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::remote::{CollectionSource, FeedEvent, SourceError};

/// A disposable handle on one remote feed.
///
/// - only the latest of a run of queued snapshots is delivered; failures
///   are never coalesced away
/// - a snapshot equal to the previously delivered one is suppressed
/// - after [`dispose`](Self::dispose) returns, [`next`](Self::next) yields
///   nothing
///
/// Dropping the handle cancels the feed.
#[derive(Debug)]
pub struct Subscription<S> {
    name: String,
    id: Uuid,
    feed: mpsc::Receiver<FeedEvent<S>>,
    cancel: CancellationToken,
    last: Option<S>,
    /// A failure found while draining, delivered on the following call.
    held: Option<SourceError>,
    closed: bool,
}

/// Subscribe to `collection` on `source`.
///
/// The subscription is cancelled together with `parent`.
pub fn open_collection<T, R>(
    source: &R,
    collection: &str,
    parent: &CancellationToken,
) -> Subscription<Vec<T>>
where
    T: DeserializeOwned + Clone + PartialEq + Send + 'static,
    R: CollectionSource,
{
    let cancel = parent.child_token();
    let feed = source.subscribe::<T>(collection, cancel.clone());
    Subscription::new(collection, feed, cancel)
}

impl<S: Clone + PartialEq> Subscription<S> {
    /// Wrap a feed that stops producing once `cancel` fires.
    #[must_use]
    pub fn new(
        name: &str,
        feed: mpsc::Receiver<FeedEvent<S>>,
        cancel: CancellationToken,
    ) -> Self {
        let id = Uuid::new_v4();
        info!(subscription = name, %id, "Subscription opened");
        Self {
            name: name.to_owned(),
            id,
            feed,
            cancel,
            last: None,
            held: None,
            closed: false,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Returns `false` once disposed or once the feed has ended.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !self.closed
    }

    /// Wait for the next event.
    ///
    /// A feed that ends without being disposed yields one
    /// [`SourceError::Closed`] failure and then `None`.
    ///
    /// # Cancel safety
    ///
    /// This method is cancel safe: no event is lost if the future is
    /// dropped before it completes.
    pub async fn next(&mut self) -> Option<FeedEvent<S>> {
        loop {
            if self.closed {
                return None;
            }
            if let Some(error) = self.held.take() {
                self.last = None;
                return Some(FeedEvent::Failed(error));
            }
            let Some(event) = self.feed.recv().await else {
                self.closed = true;
                if self.cancel.is_cancelled() {
                    return None;
                }
                info!(subscription = %self.name, id = %self.id, "Feed ended by the source");
                return Some(FeedEvent::Failed(SourceError::Closed));
            };

            let mut snapshot = match event {
                FeedEvent::Snapshot(snapshot) => snapshot,
                FeedEvent::Failed(error) => {
                    // A snapshot after a failure is always delivered.
                    self.last = None;
                    return Some(FeedEvent::Failed(error));
                }
            };
            while let Ok(newer) = self.feed.try_recv() {
                match newer {
                    FeedEvent::Snapshot(newer) => snapshot = newer,
                    FeedEvent::Failed(error) => {
                        self.held = Some(error);
                        break;
                    }
                }
            }

            if self.last.as_ref() == Some(&snapshot) {
                debug!(subscription = %self.name, "Suppressed unchanged snapshot");
                continue;
            }
            debug!(subscription = %self.name, "Snapshot delivered");
            self.last = Some(snapshot.clone());
            return Some(FeedEvent::Snapshot(snapshot));
        }
    }

    /// Stop delivery and release the remote channel. Safe to call again.
    pub fn dispose(&mut self) {
        if self.closed && self.cancel.is_cancelled() {
            return;
        }
        self.cancel.cancel();
        self.feed.close();
        self.closed = true;
        self.last = None;
        self.held = None;
        info!(subscription = %self.name, id = %self.id, "Subscription disposed");
    }
}

impl<S> Drop for Subscription<S> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
