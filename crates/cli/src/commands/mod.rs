//! Command implementations.

pub mod cart;
pub mod demo;
pub mod orders;
pub mod routes;

use clap::ValueEnum;
use crust_core::Identity;

/// Audience selector for commands that need an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AudienceArg {
    Guest,
    User,
    Admin,
}

impl AudienceArg {
    /// A representative identity for the audience.
    #[must_use]
    pub fn identity(self) -> Identity {
        match self {
            Self::Guest => Identity::guest(),
            Self::User => Identity::client("cli-user", "Client"),
            Self::Admin => Identity::administrator("cli-admin", "Administrator"),
        }
    }
}

/// One of the three descriptor sets of a capability table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CapabilitySet {
    Routes,
    Menu,
    Auth,
}
