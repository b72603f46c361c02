//! Newtype IDs for type-safe identifiers.
//!
//! Using newtypes prevents accidentally mixing up different ID types,
//! e.g., passing a UserId where a SessionId is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Macro to generate newtype ID structs over integer row ids.
macro_rules! define_id {
    ($name:ident) => {
        /// A unique identifier.
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        pub struct $name(i64);

        impl $name {
            /// Create an ID from a raw row id.
            pub fn new(id: i64) -> Self {
                Self(id)
            }

            /// Get the raw row id.
            pub fn value(&self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }
    };
}

define_id!(UserId);
define_id!(SessionId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_creation() {
        let id = UserId::new(7);
        assert_eq!(id.value(), 7);
    }

    #[test]
    fn test_id_display() {
        let id = SessionId::new(42);
        assert_eq!(format!("{}", id), "42");
    }

    #[test]
    fn test_id_equality() {
        assert_eq!(UserId::new(1), UserId::from(1));
        assert_ne!(UserId::new(1), UserId::new(2));
    }

    #[test]
    fn test_id_serialization() {
        let id = UserId::new(7);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "7");

        let back: UserId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
