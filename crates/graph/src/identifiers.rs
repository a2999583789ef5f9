//! Newtype domain identifiers.
//!
//! Every name that acts as a registry key or package label is represented as a
//! distinct newtype wrapping a `String`. This prevents accidentally
//! interchanging — for example — a [`TypeName`] with a [`SubmitterName`] even
//! though both are strings under the hood.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

string_id! {
    /// Identifies a node type: the key under which its descriptor is
    /// registered and the name stored in saved graph documents.
    ///
    /// Unique process-wide; registering a second descriptor under the same
    /// type name is a startup failure.
    TypeName
}

string_id! {
    /// Identifies the plugin package a descriptor was discovered in.
    ///
    /// Attached by the plugin loader, not declared by the descriptor itself.
    PackageName
}

string_id! {
    /// Version string of the plugin package a descriptor was discovered in.
    PackageVersion
}

string_id! {
    /// Identifies a submitter in the submitter registry.
    SubmitterName
}

// ---------------------------------------------------------------------------
// Session identity
// ---------------------------------------------------------------------------

/// Identifies a single process run.
///
/// Generated once at startup and stamped into status records so log and
/// telemetry entries from collaborating tools can be correlated back to the
/// run that produced them. Never part of cache identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generates a new random session identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a [`SessionId`] from an existing UUID (e.g. read back from a
    /// status record).
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Returns the underlying [`Uuid`].
    pub fn as_uuid(self) -> Uuid {
        self.0
    }

    /// Returns the identifier for the current process, generating it on first
    /// access.
    pub fn current() -> SessionId {
        static CURRENT: OnceLock<SessionId> = OnceLock::new();
        *CURRENT.get_or_init(SessionId::new_random)
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_names_are_rejected() {
        assert!(TypeName::new("").is_none());
        assert!(SubmitterName::new("").is_none());
        assert_eq!(TypeName::new("Resize").unwrap().as_str(), "Resize");
    }

    #[test]
    fn session_id_is_stable_within_a_process() {
        assert_eq!(SessionId::current(), SessionId::current());
    }
}
