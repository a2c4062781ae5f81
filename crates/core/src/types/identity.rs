//! Identity of the current actor.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Identifier issued by the authentication provider.
///
/// The empty identifier is reserved for the guest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityId(String);

impl IdentityId {
    /// The guest identifier.
    pub const GUEST: Self = Self(String::new());

    /// Create an identifier from the provider's uid.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns `true` for the empty (guest) identifier.
    #[must_use]
    pub fn is_guest(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for IdentityId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Where orders for an identity are delivered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryAddress {
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub house: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flat: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl DeliveryAddress {
    const EMPTY: Self = Self {
        street: String::new(),
        house: String::new(),
        flat: None,
        floor: None,
        comment: None,
    };

    /// One-line summary used by order listings ("street house").
    #[must_use]
    pub fn summary(&self) -> String {
        format!("{} {}", self.street, self.house).trim().to_owned()
    }
}

/// The current actor: either the guest or an authenticated client/administrator.
///
/// Identities are replaced wholesale on every identity emission and never
/// mutated in place. An identity with an empty [`IdentityId`] is the guest;
/// its role flag is ignored (see [`Identity::is_administrator`]).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    #[serde(default)]
    pub id: IdentityId,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub is_first_login: bool,
    #[serde(default)]
    pub delivery_address: DeliveryAddress,
    #[serde(default, rename = "photoURL")]
    pub photo_url: String,
}

impl Identity {
    /// The canonical guest identity.
    pub const GUEST: Self = Self {
        id: IdentityId::GUEST,
        name: String::new(),
        email: None,
        phone_number: None,
        is_admin: false,
        is_first_login: false,
        delivery_address: DeliveryAddress::EMPTY,
        photo_url: String::new(),
    };

    /// Returns the canonical guest identity.
    #[must_use]
    pub const fn guest() -> Self {
        Self::GUEST
    }

    /// Create an authenticated, non-administrator identity.
    #[must_use]
    pub fn client(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: IdentityId::new(id),
            name: name.into(),
            ..Self::GUEST
        }
    }

    /// Create an authenticated administrator identity.
    #[must_use]
    pub fn administrator(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            is_admin: true,
            ..Self::client(id, name)
        }
    }

    /// Returns `true` if this is the guest.
    #[must_use]
    pub fn is_guest(&self) -> bool {
        self.id.is_guest()
    }

    /// Returns `true` if this identity is authenticated.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        !self.is_guest()
    }

    /// Role flag, always `false` for the guest.
    #[must_use]
    pub fn is_administrator(&self) -> bool {
        self.is_authenticated() && self.is_admin
    }

    /// Collapse any identity with an empty id into the canonical guest.
    #[must_use]
    pub fn normalized(self) -> Self {
        if self.is_guest() { Self::GUEST } else { self }
    }

    /// Avatar initial: the first letter of the name, or `'A'`.
    #[must_use]
    pub fn initial(&self) -> char {
        self.name
            .chars()
            .next()
            .and_then(|c| c.to_uppercase().next())
            .unwrap_or('A')
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_guest_is_never_administrator() {
        let forged = Identity {
            is_admin: true,
            ..Identity::guest()
        };
        assert!(forged.is_guest());
        assert!(!forged.is_administrator());
        assert_eq!(forged.normalized(), Identity::GUEST);
    }

    #[test]
    fn test_roles() {
        assert!(Identity::client("u1", "Dana").is_authenticated());
        assert!(!Identity::client("u1", "Dana").is_administrator());
        assert!(Identity::administrator("a1", "Root").is_administrator());
    }

    #[test]
    fn test_initial() {
        assert_eq!(Identity::client("u1", "dana").initial(), 'D');
        assert_eq!(Identity::guest().initial(), 'A');
    }

    #[test]
    fn test_deserialize_document() {
        let json = r#"{
            "id": "uid-1",
            "name": "Dana",
            "isAdmin": false,
            "isFirstLogin": true,
            "deliveryAddress": {"street": "Herzl", "house": "12"},
            "photoURL": ""
        }"#;
        let identity: Identity = serde_json::from_str(json).unwrap();
        assert_eq!(identity.id.as_str(), "uid-1");
        assert!(identity.is_first_login);
        assert_eq!(identity.delivery_address.summary(), "Herzl 12");
    }

    #[test]
    fn test_address_summary_trims_missing_parts() {
        assert_eq!(DeliveryAddress::default().summary(), "");
    }
}
