//! Identifiers shared across the haruki crates

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// The chat user a wizard session belongs to.
///
/// Handed over by the bridge as-is; nothing here authenticates it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerKey(String);

impl OwnerKey {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OwnerKey {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for OwnerKey {
    fn from(id: String) -> Self {
        Self(id)
    }
}

macro_rules! random_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

random_id! {
    /// One incarnation of a wizard session. A fresh invocation by the same
    /// owner gets a new id, so a stale expiry watcher can tell it is stale.
    SessionId
}

random_id! {
    /// A connected bridge on the IPC socket
    ClientId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_keys_compare_by_value() {
        assert_eq!(OwnerKey::new("1001"), OwnerKey::from("1001"));
        assert_eq!(OwnerKey::from(String::from("1001")).as_str(), "1001");
        assert_ne!(OwnerKey::new("1001"), OwnerKey::new("1002"));
        assert_eq!(OwnerKey::new("1001").to_string(), "1001");
    }

    #[test]
    fn fresh_ids_differ() {
        assert_ne!(SessionId::new(), SessionId::new());
        assert_ne!(ClientId::new(), ClientId::default());
    }

    #[test]
    fn owner_key_is_a_bare_json_string() {
        let json = serde_json::to_string(&OwnerKey::new("424242")).unwrap();
        assert_eq!(json, "\"424242\"");
        let back: OwnerKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back.as_str(), "424242");
    }
}
