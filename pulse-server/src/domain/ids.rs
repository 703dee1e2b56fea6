//! Entity id types.
//!
//! Transit feeds identify stops, trips, routes and vehicles by free-form
//! strings. These newtypes guarantee that any id held by the engine is
//! non-empty, reasonably sized, and free of control characters, so keys
//! built from them are always well-formed.

use std::fmt;

/// Maximum accepted id length in bytes.
const MAX_ID_LEN: usize = 128;

/// Error returned when parsing an invalid entity id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid id: {reason}")]
pub struct InvalidId {
    reason: &'static str,
}

fn validate(s: &str) -> Result<(), InvalidId> {
    if s.is_empty() {
        return Err(InvalidId {
            reason: "must not be empty",
        });
    }
    if s.len() > MAX_ID_LEN {
        return Err(InvalidId {
            reason: "exceeds maximum length",
        });
    }
    if s.chars().any(|c| c.is_control()) {
        return Err(InvalidId {
            reason: "must not contain control characters",
        });
    }
    Ok(())
}

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            serde::Serialize,
            serde::Deserialize,
        )]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Parse an id from a string.
            ///
            /// The input must be non-empty, at most 128 bytes, and contain
            /// no control characters.
            pub fn parse(s: impl Into<String>) -> Result<Self, InvalidId> {
                let s = s.into();
                validate(&s)?;
                Ok(Self(s))
            }

            /// Returns the id as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = InvalidId;

            fn try_from(s: String) -> Result<Self, InvalidId> {
                Self::parse(s)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> String {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }
    };
}

entity_id!(
    /// A GTFS stop id.
    StopId
);

entity_id!(
    /// A GTFS trip id, identifying one scheduled run along a route.
    TripId
);

entity_id!(
    /// A GTFS route id.
    RouteId
);

entity_id!(
    /// A vehicle id as reported by the live feed.
    VehicleId
);
