//! Entity key newtypes.
//!
//! A view row is addressed by a composite key: the message id plus the
//! owner id used as the store's partition key.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque message identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Create a new message identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the inner string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<S: Into<String>> From<S> for MessageId {
    fn from(value: S) -> Self {
        Self(value.into())
    }
}

/// Opaque owner identifier, used as the partition key in the view and
/// source stores.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    /// Create a new owner identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the inner string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<S: Into<String>> From<S> for OwnerId {
    fn from(value: S) -> Self {
        Self(value.into())
    }
}

/// Composite key addressing one logical entity across all stores.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityKey {
    pub id: MessageId,
    pub owner: OwnerId,
}

impl EntityKey {
    /// Build a key from its two components.
    #[must_use]
    pub fn new(id: impl Into<MessageId>, owner: impl Into<OwnerId>) -> Self {
        Self {
            id: id.into(),
            owner: owner.into(),
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.id)
    }
}
