//! Capability visibility.
//!
//! Every route and menu entry declares which audiences may see it. The
//! filter is a pure function of the descriptor list and the identity and
//! is recomputed on every identity emission.

use std::collections::HashSet;

use crust_core::Identity;
use serde::{Deserialize, Serialize};

use crate::routing::Page;

/// The audience an identity belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Audience {
    Guest,
    User,
    Administrator,
}

impl Audience {
    /// Classify `identity`. The role flag is ignored for the guest.
    #[must_use]
    pub fn of(identity: &Identity) -> Self {
        if identity.is_guest() {
            Self::Guest
        } else if identity.is_administrator() {
            Self::Administrator
        } else {
            Self::User
        }
    }
}

/// The three independent visibility flags of a descriptor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Visibility {
    #[serde(default, rename = "isGuest")]
    pub guest: bool,
    #[serde(default, rename = "isUser")]
    pub user: bool,
    #[serde(default, rename = "isAdmin")]
    pub admin: bool,
}

impl Visibility {
    #[must_use]
    pub const fn new(guest: bool, user: bool, admin: bool) -> Self {
        Self { guest, user, admin }
    }

    /// Visible to all three audiences.
    #[must_use]
    pub const fn is_universal(&self) -> bool {
        self.guest && self.user && self.admin
    }

    /// Visible to nobody.
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        !(self.guest || self.user || self.admin)
    }

    #[must_use]
    pub const fn admits(&self, audience: Audience) -> bool {
        self.is_universal()
            || match audience {
                Audience::Guest => self.guest,
                Audience::User => self.user,
                Audience::Administrator => self.admin,
            }
    }
}

/// A declared route or menu entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityDescriptor {
    pub path: String,
    pub label: String,
    /// What a rendering layer shows for this entry.
    pub page: Page,
    #[serde(flatten)]
    pub visibility: Visibility,
}

impl CapabilityDescriptor {
    #[must_use]
    pub fn new(path: &str, label: &str, page: Page, visibility: Visibility) -> Self {
        Self {
            path: path.to_owned(),
            label: label.to_owned(),
            page,
            visibility,
        }
    }
}

/// The descriptors visible to `identity`, in input order.
#[must_use]
pub fn visible(
    descriptors: &[CapabilityDescriptor],
    identity: &Identity,
) -> Vec<CapabilityDescriptor> {
    let audience = Audience::of(identity);
    descriptors
        .iter()
        .filter(|descriptor| descriptor.visibility.admits(audience))
        .cloned()
        .collect()
}

/// A problem found by [`validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapabilityIssue {
    /// No audience flag is set, so the entry can never be reached.
    Unreachable { path: String },
    /// The path was already declared earlier in the same set.
    DuplicatePath { path: String },
}

/// Report unreachable entries and duplicate paths. Nothing is filtered.
#[must_use]
pub fn validate(descriptors: &[CapabilityDescriptor]) -> Vec<CapabilityIssue> {
    let mut seen = HashSet::new();
    let mut issues = Vec::new();
    for descriptor in descriptors {
        if descriptor.visibility.is_dead() {
            issues.push(CapabilityIssue::Unreachable {
                path: descriptor.path.clone(),
            });
        }
        if !seen.insert(descriptor.path.as_str()) {
            issues.push(CapabilityIssue::DuplicatePath {
                path: descriptor.path.clone(),
            });
        }
    }
    issues
}
