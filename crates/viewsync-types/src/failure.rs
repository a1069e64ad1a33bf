//! Two-kind failure taxonomy.
//!
//! Every error surfaced by the pipeline is classified as either
//! [`FailureKind::Transient`] (expected to resolve with time: store
//! unavailability, timeouts, eventual-consistency lag) or
//! [`FailureKind::Permanent`] (malformed input, schema defects, violated
//! upstream invariants). The retry decision is a pure function of this
//! classification plus the remaining budget.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::keys::MessageId;

/// Retryability class of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Expected to succeed on a later attempt without intervention.
    Transient,
    /// Never expected to succeed on retry.
    Permanent,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Transient => "transient",
            Self::Permanent => "permanent",
        })
    }
}

/// Classified pipeline failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("[{kind}] {reason}")]
pub struct Failure {
    pub kind: FailureKind,
    pub reason: String,
    /// Entity the failure relates to, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<MessageId>,
}

impl Failure {
    /// Transient failure with a human-readable reason.
    #[must_use]
    pub fn transient(reason: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Transient,
            reason: reason.into(),
            entity: None,
        }
    }

    /// Permanent failure with a human-readable reason.
    #[must_use]
    pub fn permanent(reason: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Permanent,
            reason: reason.into(),
            entity: None,
        }
    }

    /// Attach the entity id the failure relates to.
    #[must_use]
    pub fn with_entity(mut self, entity: impl Into<MessageId>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    /// Returns `true` for [`FailureKind::Transient`].
    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.kind == FailureKind::Transient
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_and_reason() {
        let failure = Failure::transient("store unavailable");
        assert_eq!(failure.to_string(), "[transient] store unavailable");

        let failure = Failure::permanent("malformed input");
        assert_eq!(failure.to_string(), "[permanent] malformed input");
    }

    #[test]
    fn with_entity_attaches_id() {
        let failure = Failure::transient("timeout").with_entity("MSG-1");
        assert_eq!(failure.entity.unwrap().as_str(), "MSG-1");
    }

    #[test]
    fn is_transient_matches_kind() {
        assert!(Failure::transient("x").is_transient());
        assert!(!Failure::permanent("x").is_transient());
    }

    #[test]
    fn serde_roundtrip() {
        let failure = Failure::permanent("bad shape").with_entity("MSG-9");
        let json = serde_json::to_string(&failure).unwrap();
        let back: Failure = serde_json::from_str(&json).unwrap();
        assert_eq!(failure, back);
    }
}
