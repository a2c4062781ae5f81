//! Newtype IDs for type-safe document references.
//!
//! Use the `define_id!` macro to create type-safe ID wrappers that prevent
//! accidentally mixing IDs from different collections.

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `i64` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`, `Ord`
/// - Conversion methods: `new()`, `as_i64()`
/// - `From<i64>` and `Into<i64>` implementations
///
/// # Example
///
/// ```rust
/// # use crust_core::define_id;
/// define_id!(ToppingId);
/// define_id!(CourierId);
///
/// let topping = ToppingId::new(1);
/// let courier = CourierId::new(1);
///
/// // These are different types, so this won't compile:
/// // let _: ToppingId = courier;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Create a new ID from an i64 value.
            #[must_use]
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Get the underlying i64 value.
            #[must_use]
            pub const fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

// Document ids of the remote collections
define_id!(ProductId);
define_id!(OrderId);
define_id!(CategoryId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_id_serializes_transparently() {
        let id = ProductId::new(42);
        assert_eq!(serde_json::to_string(&id).unwrap(), "42");

        let parsed: ProductId = serde_json::from_str("42").unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_id_display_and_conversions() {
        let id = OrderId::from(7);
        assert_eq!(id.to_string(), "7");
        assert_eq!(i64::from(id), 7);
        assert_eq!(id.as_i64(), 7);
    }
}
