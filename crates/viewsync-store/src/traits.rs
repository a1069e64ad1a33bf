//! Store trait definitions.
//!
//! Narrow contracts over the external stores the pipeline consumes. All
//! implementations must be `Send + Sync` for use behind `Arc<dyn _>`.

use async_trait::async_trait;
use viewsync_types::{
    Content, EnrichedRecord, EntityKey, RetryEnvelope, SourceRecord, StatusFlags, StorableError,
    ViewRecord,
};

use crate::error;

/// Outcome of a version-conditioned patch against the view store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    /// The stored version was older; status fields were updated.
    Applied,
    /// The stored version was equal or newer; nothing was written.
    PreconditionFailed,
    /// No view row exists for this key.
    NotFound,
}

/// Store holding denormalized view rows.
#[async_trait]
pub trait ViewStore: Send + Sync {
    /// Update status fields only if the stored version is strictly less
    /// than `version`. The write also advances the stored version.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`](crate::StoreError) on storage failure.
    /// Precondition misses and missing rows are outcomes, not errors.
    async fn patch_if_version_less(
        &self,
        key: &EntityKey,
        status: &StatusFlags,
        version: u64,
    ) -> error::Result<PatchOutcome>;

    /// Insert a freshly rebuilt view row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`](crate::StoreError::Conflict) if a
    /// row already exists, or another [`StoreError`](crate::StoreError) on
    /// storage failure.
    async fn create(&self, view: &ViewRecord) -> error::Result<()>;

    /// Read a view row, if present.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`](crate::StoreError) on storage failure.
    async fn get(&self, key: &EntityKey) -> error::Result<Option<ViewRecord>>;
}

/// Authoritative store of source record metadata.
#[async_trait]
pub trait SourceStore: Send + Sync {
    /// Look up a source record by entity key.
    ///
    /// Returns `Ok(None)` when no record exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`](crate::StoreError) on storage failure.
    async fn find(&self, key: &EntityKey) -> error::Result<Option<SourceRecord>>;
}

/// Store of externally held content payloads.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Fetch the content payload for a content reference.
    ///
    /// Returns `Ok(None)` when the payload does not (yet) exist — absence
    /// is an outcome, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`](crate::StoreError) on storage failure.
    async fn get_content(&self, content_ref: &str) -> error::Result<Option<Content>>;
}

/// Durable, append-only error log. Never read back by the pipeline.
#[async_trait]
pub trait ErrorLog: Send + Sync {
    /// Append one error entry.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`](crate::StoreError) on storage failure.
    async fn append(&self, error: &StorableError) -> error::Result<()>;
}

/// Transport moving failed inputs into the failure-handler pipeline.
#[async_trait]
pub trait RetryTransport: Send + Sync {
    /// Enqueue a retry envelope.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`](crate::StoreError) if the transport is
    /// unreachable; this is a batch-level infrastructure failure.
    async fn send(&self, envelope: &RetryEnvelope) -> error::Result<()>;
}

/// Failure publishing a batch of enriched records downstream.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// The transport itself is unreachable; the whole batch failed.
    #[error("publish transport unreachable: {0}")]
    Unreachable(String),

    /// Some records failed to send; carries their batch indices.
    #[error("{} record(s) failed to send", .0.len())]
    Partial(Vec<usize>),
}

/// Downstream sink for enriched records (the publication variant).
#[async_trait]
pub trait MessagePublisher: Send + Sync {
    /// Publish a batch of enriched records.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::Partial`] when only some records failed, or
    /// [`PublishError::Unreachable`] when the transport is down.
    async fn publish(&self, batch: &[EnrichedRecord]) -> Result<(), PublishError>;
}

/// Fire-and-forget observability sink. Must never block pipeline logic.
pub trait TelemetrySink: Send + Sync {
    /// Emit one named event with structured properties.
    fn emit(&self, name: &str, properties: serde_json::Value);
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Verify the store traits are object-safe.
    #[test]
    fn traits_are_object_safe() {
        fn _views(_: &dyn ViewStore) {}
        fn _sources(_: &dyn SourceStore) {}
        fn _contents(_: &dyn ContentStore) {}
        fn _log(_: &dyn ErrorLog) {}
        fn _retry(_: &dyn RetryTransport) {}
        fn _publisher(_: &dyn MessagePublisher) {}
        fn _telemetry(_: &dyn TelemetrySink) {}
    }

    #[test]
    fn publish_error_partial_counts() {
        let err = PublishError::Partial(vec![0, 2]);
        assert_eq!(err.to_string(), "2 record(s) failed to send");
    }
}
