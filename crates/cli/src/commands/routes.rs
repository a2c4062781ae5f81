//! Capability table commands.

use std::path::Path;

use crust_client::access::{self, CapabilityDescriptor, CapabilityIssue};
use crust_client::routing::{self, CapabilityTable};
use thiserror::Error;
use tracing::{error, info};

use super::{AudienceArg, CapabilitySet};

/// Errors from capability table commands.
#[derive(Debug, Error)]
pub enum RoutesError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid capability table: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("{0} validation errors found")]
    Invalid(usize),
}

fn load_table(path: Option<&Path>) -> Result<CapabilityTable, RoutesError> {
    let Some(path) = path else {
        return Ok(CapabilityTable::default());
    };
    let json = std::fs::read_to_string(path).map_err(|source| RoutesError::Read {
        path: path.display().to_string(),
        source,
    })?;
    Ok(CapabilityTable::from_json(&json)?)
}

fn select(table: &CapabilityTable, set: CapabilitySet) -> &[CapabilityDescriptor] {
    match set {
        CapabilitySet::Routes => &table.routes,
        CapabilitySet::Menu => &table.menu,
        CapabilitySet::Auth => &table.auth,
    }
}

/// Print the descriptors of `set` visible to `audience`.
///
/// # Errors
///
/// Returns an error if the table cannot be read or parsed.
pub fn show(
    audience: AudienceArg,
    set: CapabilitySet,
    table: Option<&Path>,
) -> Result<(), RoutesError> {
    let table = load_table(table)?;
    let visible = access::visible(select(&table, set), &audience.identity());

    info!(?audience, ?set, count = visible.len(), "Visible capabilities");
    for descriptor in &visible {
        info!("  {:<24} {}", descriptor.path, descriptor.label);
    }
    Ok(())
}

/// Validate every set of a capability table.
///
/// # Errors
///
/// Returns an error if the table cannot be loaded or has issues.
pub fn validate(table: Option<&Path>) -> Result<(), RoutesError> {
    let table = load_table(table)?;

    let mut issues = 0;
    for set in [CapabilitySet::Routes, CapabilitySet::Menu, CapabilitySet::Auth] {
        for issue in access::validate(select(&table, set)) {
            issues += 1;
            match issue {
                CapabilityIssue::Unreachable { path } => {
                    error!(?set, "  - {path}: no audience can reach this entry");
                }
                CapabilityIssue::DuplicatePath { path } => {
                    error!(?set, "  - {path}: declared more than once");
                }
            }
        }
    }

    if issues > 0 {
        return Err(RoutesError::Invalid(issues));
    }
    info!("Capability table validated successfully");
    Ok(())
}

/// Print the landing path after sign-in.
pub fn landing(audience: AudienceArg, first_login: bool, cart_count: u64) {
    let identity = crust_core::Identity {
        is_first_login: first_login,
        ..audience.identity()
    };
    info!(
        ?audience,
        first_login,
        cart_count,
        path = routing::landing_path(&identity, cart_count),
        "Landing path"
    );
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_table_validates() {
        validate(None).unwrap();
    }

    #[test]
    fn test_dead_entry_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("routes.json");
        std::fs::write(
            &path,
            r#"{
                "routes": [{"path": "/hidden", "label": "Hidden", "page": "index"}],
                "menu": [],
                "auth": []
            }"#,
        )
        .unwrap();

        assert!(matches!(validate(Some(path.as_path())), Err(RoutesError::Invalid(1))));
    }

    #[test]
    fn test_missing_table_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        let result = show(AudienceArg::Guest, CapabilitySet::Menu, Some(missing.as_path()));
        assert!(matches!(result, Err(RoutesError::Read { .. })));
    }
}
