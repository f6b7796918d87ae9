//! Blob storage types.
//!
//! These model whole objects in a key-addressed store and the version tokens
//! used for conditional (compare-and-swap) writes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque version token of a stored object (S3 ETag, content hash, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectVersion(pub String);

impl ObjectVersion {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A whole object fetched from blob storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub version: ObjectVersion,
}

/// Precondition attached to a write.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum WriteCondition {
    /// Overwrite whatever is there.
    #[default]
    Unconditional,
    /// Only write if the current object still has this version.
    IfMatch(ObjectVersion),
    /// Only write if no object exists at the key.
    IfAbsent,
}

impl WriteCondition {
    /// Check the precondition against the version currently stored (if any).
    pub fn is_satisfied_by(&self, current: Option<&ObjectVersion>) -> bool {
        match (self, current) {
            (WriteCondition::Unconditional, _) => true,
            (WriteCondition::IfMatch(expected), Some(actual)) => expected == actual,
            (WriteCondition::IfMatch(_), None) => false,
            (WriteCondition::IfAbsent, current) => current.is_none(),
        }
    }
}
