//! Status enums for order documents.

use serde::{Deserialize, Serialize};

/// Kitchen workflow status of an order.
///
/// Declared in workflow order: an order starts `Waiting` and ends `Complete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Waiting,
    Cooking,
    Delivering,
    Paid,
    Complete,
}

impl OrderStatus {
    /// Every status, in workflow order.
    #[must_use]
    pub const fn all() -> [Self; 5] {
        [
            Self::Waiting,
            Self::Cooking,
            Self::Delivering,
            Self::Paid,
            Self::Complete,
        ]
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Waiting => write!(f, "waiting"),
            Self::Cooking => write!(f, "cooking"),
            Self::Delivering => write!(f, "delivering"),
            Self::Paid => write!(f, "paid"),
            Self::Complete => write!(f, "complete"),
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(Self::Waiting),
            "cooking" => Ok(Self::Cooking),
            "delivering" => Ok(Self::Delivering),
            "paid" => Ok(Self::Paid),
            "complete" => Ok(Self::Complete),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_matches_serde() {
        for status in OrderStatus::all() {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{status}\""));
            assert_eq!(status.to_string().parse::<OrderStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_from_str_rejects_unknown() {
        assert!("burnt".parse::<OrderStatus>().is_err());
    }
}
