//! Shared data model and failure taxonomy for the viewsync pipeline.
//!
//! Pure types only: no I/O, no store contracts. Both the store and engine
//! crates depend on this crate without circular dependencies.

pub mod content;
pub mod envelope;
pub mod event;
pub mod failure;
pub mod keys;
pub mod record;
pub mod view;

pub use content::{CertificateData, Content, LegalData, PaymentData, ThirdPartyData};
pub use envelope::{RetryEnvelope, StorableError};
pub use event::{ProcessingStatus, StatusChangeEvent, StatusFlags};
pub use failure::{Failure, FailureKind};
pub use keys::{EntityKey, MessageId, OwnerId};
pub use record::{EnrichedRecord, SourceRecord};
pub use view::{ComponentFlag, PaymentComponent, ViewComponents, ViewDefect, ViewRecord};
