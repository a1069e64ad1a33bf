//! Status change events consumed from the change feed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::keys::{EntityKey, MessageId, OwnerId};

/// Processing state of the underlying message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    Accepted,
    Processed,
    Rejected,
}

/// Status fields carried by an event and projected onto the view row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusFlags {
    pub archived: bool,
    pub processing: ProcessingStatus,
    pub read: bool,
}

/// One status change delivered by the feed. Immutable once emitted.
///
/// `version` increases monotonically per entity; redelivery and reordering
/// are expected, so consumers must treat application as idempotent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChangeEvent {
    pub id: MessageId,
    pub owner: OwnerId,
    pub version: u64,
    pub status: StatusFlags,
    /// Feed-side ingestion timestamp.
    pub ingested_at: DateTime<Utc>,
}

impl StatusChangeEvent {
    /// Composite key of the entity this event targets.
    #[must_use]
    pub fn key(&self) -> EntityKey {
        EntityKey {
            id: self.id.clone(),
            owner: self.owner.clone(),
        }
    }
}
