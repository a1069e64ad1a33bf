//! Engine error model.
//!
//! Item-level failures are classified [`Failure`](viewsync_types::Failure)
//! values and never abort a batch; only the variants here do. `Transport`
//! means the retry transport itself refused a send, `Redeliver` is the
//! deliberate re-raise that asks the delivery transport to hand the input
//! back later, and `Infrastructure` wraps opaque host-side errors.

use viewsync_store::StoreError;
use viewsync_types::Failure;

/// Batch-level engine error.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The retry transport could not accept an envelope.
    #[error("retry transport failure: {0}")]
    Transport(#[from] StoreError),

    /// Raised so the delivery transport redelivers the input later.
    #[error("redeliver: {0}")]
    Redeliver(Failure),

    /// Host-side error outside the failure taxonomy.
    #[error(transparent)]
    Infrastructure(#[from] anyhow::Error),
}
