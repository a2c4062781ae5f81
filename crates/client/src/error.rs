//! Unified error handling with Sentry integration.
//!
//! Nothing in the client is fatal: failures degrade to a well-defined state.
//! [`ClientError`] collects the error types of each concern for the few
//! entry points that can fail outright (configuration, the file store).

use thiserror::Error;

use crate::config::ConfigError;
use crate::remote::SourceError;
use crate::store::StoreError;

/// Client-level error type.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A remote source failed.
    #[error("Remote error: {0}")]
    Source(#[from] SourceError),

    /// The local store failed.
    #[error("Local store error: {0}")]
    Store(#[from] StoreError),

    /// The orchestrator is no longer running.
    #[error("Orchestrator stopped")]
    OrchestratorStopped,
}

/// Result type alias for `ClientError`.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Capture `error` to Sentry and log it with the event id.
pub fn report_error(error: &(dyn std::error::Error + 'static), context: &str) {
    let event_id = sentry::capture_error(error);
    tracing::error!(
        error = %error,
        sentry_event_id = %event_id,
        "{context}"
    );
}

/// Set the Sentry user context from an identity id.
///
/// Call this when an authenticated identity is observed to associate
/// errors with it.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for a state transition.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of
/// transitions leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("session", "Degraded", Some(&[("code", "transport_error")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_display() {
        let err = ClientError::from(SourceError::Unavailable("offline".to_string()));
        assert_eq!(err.to_string(), "Remote error: service unavailable: offline");

        let err = ClientError::from(ConfigError::InvalidEnvVar(
            "CRUST_MAX_ITEMS_PER_LINE".to_string(),
            "must be at least 1".to_string(),
        ));
        assert!(err.to_string().starts_with("Configuration error:"));
    }

    #[test]
    fn test_helpers_without_client_are_noops() {
        set_sentry_user(&"uid-1", None);
        add_breadcrumb("identity", "Signed in", Some(&[("id", "uid-1")]));
        clear_sentry_user();
        report_error(&SourceError::Closed, "Feed closed");
    }
}
