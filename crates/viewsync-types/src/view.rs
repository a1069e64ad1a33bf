//! The denormalized view record and its projection from source data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::content::Content;
use crate::event::{StatusChangeEvent, StatusFlags};
use crate::keys::{EntityKey, MessageId, OwnerId};
use crate::record::SourceRecord;

/// Presence marker for an optional content component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentFlag {
    pub has: bool,
}

/// Payment component: presence plus the notice number copied from content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentComponent {
    pub has: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notice_number: Option<String>,
}

/// Derived component flags, one per optional content sub-structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewComponents {
    pub attachments: ComponentFlag,
    pub certificate: ComponentFlag,
    pub legal_data: ComponentFlag,
    pub payment: PaymentComponent,
    pub third_party: ComponentFlag,
}

/// Shape defect found while validating a projected view record.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ViewDefect {
    #[error("view field '{0}' must not be empty")]
    EmptyField(&'static str),

    #[error("payment component marked present without a notice number")]
    PaymentNoticeMissing,
}

/// Query-optimized projection of a message, its content, and its latest
/// status.
///
/// Invariant: `version` is monotonically non-decreasing per entity key.
/// Rows are created only by the rebuild path and updated only by the
/// version-conditioned patch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewRecord {
    pub id: MessageId,
    pub owner: OwnerId,
    pub title: String,
    pub sender_service_id: String,
    pub created_at: DateTime<Utc>,
    pub status: StatusFlags,
    pub version: u64,
    pub components: ViewComponents,
}

impl ViewRecord {
    /// Pure projection of source metadata, content, and an incoming event
    /// into a fresh view record.
    ///
    /// Component flags derive strictly from optional-field presence in
    /// `content`; no side effects.
    #[must_use]
    pub fn project(record: &SourceRecord, content: &Content, event: &StatusChangeEvent) -> Self {
        Self {
            id: record.id.clone(),
            owner: record.owner.clone(),
            title: content.subject.clone(),
            sender_service_id: record.sender_service_id.clone(),
            created_at: record.created_at,
            status: event.status,
            version: event.version,
            components: ViewComponents {
                attachments: ComponentFlag {
                    has: content
                        .legal_data
                        .as_ref()
                        .is_some_and(|legal| legal.has_attachment),
                },
                certificate: ComponentFlag {
                    has: content.certificate.is_some(),
                },
                legal_data: ComponentFlag {
                    has: content.legal_data.is_some(),
                },
                payment: PaymentComponent {
                    has: content.payment.is_some(),
                    notice_number: content
                        .payment
                        .as_ref()
                        .map(|payment| payment.notice_number.clone()),
                },
                third_party: ComponentFlag {
                    has: content.third_party.is_some(),
                },
            },
        }
    }

    /// Check shape invariants before the record is persisted.
    ///
    /// # Errors
    ///
    /// Returns a [`ViewDefect`] describing the first violated invariant.
    pub fn validate(&self) -> Result<(), ViewDefect> {
        if self.id.as_str().is_empty() {
            return Err(ViewDefect::EmptyField("id"));
        }
        if self.owner.as_str().is_empty() {
            return Err(ViewDefect::EmptyField("owner"));
        }
        if self.title.is_empty() {
            return Err(ViewDefect::EmptyField("title"));
        }
        if self.sender_service_id.is_empty() {
            return Err(ViewDefect::EmptyField("sender_service_id"));
        }
        if self.components.payment.has && self.components.payment.notice_number.is_none() {
            return Err(ViewDefect::PaymentNoticeMissing);
        }
        Ok(())
    }

    /// Composite key of this row.
    #[must_use]
    pub fn key(&self) -> EntityKey {
        EntityKey {
            id: self.id.clone(),
            owner: self.owner.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{LegalData, PaymentData, ThirdPartyData};
    use crate::event::ProcessingStatus;

    fn record() -> SourceRecord {
        SourceRecord {
            id: MessageId::new("MSG-1"),
            owner: OwnerId::new("OWNER-A"),
            sender_service_id: "svc-1".into(),
            created_at: "2026-03-01T08:00:00Z".parse().unwrap(),
            content_ref: "MSG-1".into(),
            pending: false,
            ttl: None,
        }
    }

    fn event(version: u64) -> StatusChangeEvent {
        StatusChangeEvent {
            id: MessageId::new("MSG-1"),
            owner: OwnerId::new("OWNER-A"),
            version,
            status: StatusFlags {
                archived: false,
                processing: ProcessingStatus::Processed,
                read: false,
            },
            ingested_at: "2026-03-01T09:00:00Z".parse().unwrap(),
        }
    }

    #[test]
    fn projection_copies_metadata_and_status() {
        let view = ViewRecord::project(&record(), &Content::bare("subject"), &event(5));
        assert_eq!(view.id.as_str(), "MSG-1");
        assert_eq!(view.title, "subject");
        assert_eq!(view.sender_service_id, "svc-1");
        assert_eq!(view.version, 5);
        assert_eq!(view.status.processing, ProcessingStatus::Processed);
    }

    #[test]
    fn bare_content_projects_no_components() {
        let view = ViewRecord::project(&record(), &Content::bare("s"), &event(1));
        assert!(!view.components.attachments.has);
        assert!(!view.components.certificate.has);
        assert!(!view.components.legal_data.has);
        assert!(!view.components.payment.has);
        assert!(view.components.payment.notice_number.is_none());
        assert!(!view.components.third_party.has);
    }

    #[test]
    fn payment_presence_copies_notice_number() {
        let mut content = Content::bare("s");
        content.payment = Some(PaymentData {
            notice_number: "302099".into(),
            amount: None,
        });
        let view = ViewRecord::project(&record(), &content, &event(1));
        assert!(view.components.payment.has);
        assert_eq!(
            view.components.payment.notice_number.as_deref(),
            Some("302099")
        );
    }

    #[test]
    fn attachments_follow_legal_data_flag() {
        let mut content = Content::bare("s");
        content.legal_data = Some(LegalData {
            has_attachment: true,
        });
        let view = ViewRecord::project(&record(), &content, &event(1));
        assert!(view.components.attachments.has);
        assert!(view.components.legal_data.has);

        content.legal_data = Some(LegalData {
            has_attachment: false,
        });
        let view = ViewRecord::project(&record(), &content, &event(1));
        assert!(!view.components.attachments.has);
        assert!(view.components.legal_data.has);
    }

    #[test]
    fn third_party_presence_sets_flag_only() {
        let mut content = Content::bare("s");
        content.third_party = Some(ThirdPartyData {
            third_party_id: "tp-1".into(),
        });
        let view = ViewRecord::project(&record(), &content, &event(1));
        assert!(view.components.third_party.has);
    }

    #[test]
    fn validate_accepts_projection_of_valid_input() {
        let view = ViewRecord::project(&record(), &Content::bare("s"), &event(1));
        assert!(view.validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_title() {
        let view = ViewRecord::project(&record(), &Content::bare(""), &event(1));
        assert_eq!(view.validate(), Err(ViewDefect::EmptyField("title")));
    }

    #[test]
    fn validate_rejects_payment_without_notice() {
        let mut view = ViewRecord::project(&record(), &Content::bare("s"), &event(1));
        view.components.payment.has = true;
        assert_eq!(view.validate(), Err(ViewDefect::PaymentNoticeMissing));
    }
}
