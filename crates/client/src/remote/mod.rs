//! Remote document store and authentication provider interfaces.
//!
//! # Contract
//!
//! - A collection feed delivers full snapshots, never deltas
//! - Each feed is bound to a `CancellationToken`; once it is cancelled the
//!   source stops producing and releases the underlying channel
//! - The identity feed emits [`Identity::GUEST`] in place of failing when
//!   no credential is present
//!
//! [`MemoryDocumentStore`] implements both sources in-process.

mod memory;

pub use memory::MemoryDocumentStore;

use crust_core::Identity;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::session::SessionErrorCode;

/// Capacity of a single feed channel.
pub const FEED_CAPACITY: usize = 16;

/// Errors reported by a remote source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// The credential is missing, expired or revoked.
    #[error("unauthenticated")]
    Unauthenticated,

    /// The credential is valid but lacks access to the collection.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The remote side cannot be reached.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// The remote side closed the feed.
    #[error("feed closed")]
    Closed,
}

impl SourceError {
    /// The session error code this failure normalizes to.
    #[must_use]
    pub const fn code(&self) -> SessionErrorCode {
        match self {
            Self::Unauthenticated | Self::PermissionDenied(_) => SessionErrorCode::AuthError,
            Self::Unavailable(_) | Self::Closed => SessionErrorCode::TransportError,
        }
    }
}

/// One event on a remote feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent<S> {
    /// A complete replacement of the feed's contents.
    Snapshot(S),
    /// The source could not produce a snapshot.
    Failed(SourceError),
}

/// A remote document store exposing named collections.
pub trait CollectionSource: Send + Sync + 'static {
    /// Open a snapshot feed for `collection`.
    ///
    /// Must be called from within a Tokio runtime. The feed ends when
    /// `cancel` is cancelled or the receiver is closed.
    fn subscribe<T>(
        &self,
        collection: &str,
        cancel: CancellationToken,
    ) -> mpsc::Receiver<FeedEvent<Vec<T>>>
    where
        T: DeserializeOwned + Send + 'static;
}

/// The authentication provider.
pub trait IdentitySource: Send + Sync + 'static {
    /// Open the identity feed.
    ///
    /// Must be called from within a Tokio runtime.
    fn subscribe(&self, cancel: CancellationToken) -> mpsc::Receiver<FeedEvent<Identity>>;

    /// Ask the provider to drop the current credential.
    ///
    /// The resulting guest identity arrives through the feed.
    fn sign_out(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            SourceError::Unauthenticated.code(),
            SessionErrorCode::AuthError
        );
        assert_eq!(
            SourceError::PermissionDenied("orders".to_owned()).code(),
            SessionErrorCode::AuthError
        );
        assert_eq!(
            SourceError::Unavailable("connection refused".to_owned()).code(),
            SessionErrorCode::TransportError
        );
        assert_eq!(SourceError::Closed.code(), SessionErrorCode::TransportError);
    }
}
