//! Authoritative source records and their enriched form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::content::Content;
use crate::keys::{EntityKey, MessageId, OwnerId};

/// Authoritative metadata for one message, as stored in the source store.
///
/// Content lives in a separate store and may lag behind this record
/// (eventual consistency); `pending` marks records whose content is not
/// yet expected to exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub id: MessageId,
    pub owner: OwnerId,
    pub sender_service_id: String,
    pub created_at: DateTime<Utc>,
    /// Identifier of the content payload in the content store.
    pub content_ref: String,
    pub pending: bool,
    /// Retention hint in seconds, if the record is subject to cleanup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u64>,
}

impl SourceRecord {
    /// Composite key of this record.
    #[must_use]
    pub fn key(&self) -> EntityKey {
        EntityKey {
            id: self.id.clone(),
            owner: self.owner.clone(),
        }
    }
}

/// A source record paired with its content, when content exists.
///
/// Pending records pass through enrichment untouched, so `content` stays
/// `None` for them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    pub record: SourceRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_omitted_when_absent() {
        let record = SourceRecord {
            id: MessageId::new("MSG-1"),
            owner: OwnerId::new("OWNER-A"),
            sender_service_id: "svc".into(),
            created_at: "2026-03-01T08:00:00Z".parse().unwrap(),
            content_ref: "MSG-1".into(),
            pending: false,
            ttl: None,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("ttl").is_none());
    }

    #[test]
    fn enriched_record_roundtrip() {
        let record = SourceRecord {
            id: MessageId::new("MSG-2"),
            owner: OwnerId::new("OWNER-B"),
            sender_service_id: "svc".into(),
            created_at: "2026-03-01T08:00:00Z".parse().unwrap(),
            content_ref: "MSG-2".into(),
            pending: true,
            ttl: Some(3600),
        };
        let enriched = EnrichedRecord {
            record,
            content: None,
        };
        let json = serde_json::to_string(&enriched).unwrap();
        let back: EnrichedRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(enriched, back);
    }
}
