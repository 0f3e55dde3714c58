//! Identifier types.
//!
//! `HeroKey`, `DefinitionId` and `ClassId` are interned string keys backed by
//! `Arc<str>`, so cloning a key is cheap and comparison is by content.
//! `InstanceId` is a UUID minted for every equipment instance.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

macro_rules! define_key {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
        pub struct $name(Arc<str>);

        impl $name {
            /// Create a key from a string slice.
            pub fn new(s: &str) -> Self {
                Self(Arc::from(s))
            }

            /// Get the string representation of this key.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(Arc::from(s))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                self.0.as_ref().serialize(serializer)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                Ok(Self::from(s))
            }
        }
    };
}

define_key!(
    /// Key identifying one hero within a session.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use zzgear::HeroKey;
    ///
    /// let a = HeroKey::new("knight");
    /// let b: HeroKey = "knight".into();
    /// assert_eq!(a, b);
    /// ```
    HeroKey
);

define_key!(
    /// Stable identifier into the item catalog.
    DefinitionId
);

define_key!(
    /// Identifier of a class definition.
    ClassId
);

/// Globally unique identity of one equipment instance.
///
/// Stackable items never carry one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceId(Uuid);

impl InstanceId {
    /// Mint a fresh random identity.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
