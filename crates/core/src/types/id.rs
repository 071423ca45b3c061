//! Newtype IDs for type-safe entity references.
//!
//! Use the `define_string_id!` macro to create type-safe ID wrappers that prevent
//! accidentally mixing IDs from different entity types. Backend identifiers are
//! opaque strings (e.g. Mongo-style object ids), so the wrappers hold a `String`.

/// Macro to define a type-safe string ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`
/// - `From<String>`, `From<&str>` and `Display` implementations
///
/// # Example
///
/// ```rust
/// # use orderdesk_core::define_string_id;
/// define_string_id!(RiderId);
/// define_string_id!(VehicleId);
///
/// let rider = RiderId::new("r-1");
/// let vehicle = VehicleId::new("r-1");
///
/// // These are different types, so this won't compile:
/// // let _: RiderId = vehicle;
/// assert_eq!(rider.as_str(), vehicle.as_str());
/// ```
#[macro_export]
macro_rules! define_string_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the underlying string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the ID and return the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id!(OrderId);
define_string_id!(CustomerId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_serialize_transparently() {
        let id = OrderId::new("65f1c0ffee");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"65f1c0ffee\"");

        let parsed: CustomerId = serde_json::from_str("\"cust-9\"").unwrap();
        assert_eq!(parsed.as_str(), "cust-9");
    }

    #[test]
    fn test_ids_order_lexicographically() {
        let mut ids = vec![OrderId::from("c"), OrderId::from("a"), OrderId::from("b")];
        ids.sort();
        let joined: Vec<&str> = ids.iter().map(OrderId::as_str).collect();
        assert_eq!(joined, ["a", "b", "c"]);
    }
}
