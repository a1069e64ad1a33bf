//! In-memory store implementations.
//!
//! Used by tests and by embedders that wire the engine against their own
//! infrastructure later. Each store carries a `fail_next` knob that makes
//! the next call return [`StoreError::Unavailable`], for exercising the
//! failure-classification paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use viewsync_types::{
    Content, EnrichedRecord, EntityKey, RetryEnvelope, SourceRecord, StatusFlags, StorableError,
    ViewRecord,
};

use crate::error::{Result, StoreError};
use crate::traits::{
    ContentStore, ErrorLog, MessagePublisher, PatchOutcome, PublishError, RetryTransport,
    SourceStore, TelemetrySink, ViewStore,
};

fn take_fault(flag: &AtomicBool, op: &str) -> Result<()> {
    if flag.swap(false, Ordering::SeqCst) {
        return Err(StoreError::Unavailable(format!("injected fault: {op}")));
    }
    Ok(())
}

/// In-memory view store with version-conditioned patch semantics.
#[derive(Default)]
pub struct InMemoryViewStore {
    rows: Mutex<HashMap<EntityKey, ViewRecord>>,
    fail_next: AtomicBool,
}

impl InMemoryViewStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call fail with [`StoreError::Unavailable`].
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Number of stored rows.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    /// Returns `true` when no rows are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ViewStore for InMemoryViewStore {
    async fn patch_if_version_less(
        &self,
        key: &EntityKey,
        status: &StatusFlags,
        version: u64,
    ) -> Result<PatchOutcome> {
        take_fault(&self.fail_next, "patch_if_version_less")?;
        let mut rows = self.rows.lock().map_err(|_| StoreError::LockPoisoned)?;
        match rows.get_mut(key) {
            None => Ok(PatchOutcome::NotFound),
            Some(row) if row.version < version => {
                row.status = *status;
                row.version = version;
                Ok(PatchOutcome::Applied)
            }
            Some(_) => Ok(PatchOutcome::PreconditionFailed),
        }
    }

    async fn create(&self, view: &ViewRecord) -> Result<()> {
        take_fault(&self.fail_next, "create")?;
        let mut rows = self.rows.lock().map_err(|_| StoreError::LockPoisoned)?;
        let key = view.key();
        if rows.contains_key(&key) {
            return Err(StoreError::Conflict(format!("view row exists: {key}")));
        }
        rows.insert(key, view.clone());
        Ok(())
    }

    async fn get(&self, key: &EntityKey) -> Result<Option<ViewRecord>> {
        let rows = self.rows.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(rows.get(key).cloned())
    }
}

/// In-memory source record store.
#[derive(Default)]
pub struct InMemorySourceStore {
    records: Mutex<HashMap<EntityKey, SourceRecord>>,
    fail_next: AtomicBool,
}

impl InMemorySourceStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn insert(&self, record: SourceRecord) {
        self.records.lock().unwrap().insert(record.key(), record);
    }

    /// Make the next call fail with [`StoreError::Unavailable`].
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl SourceStore for InMemorySourceStore {
    async fn find(&self, key: &EntityKey) -> Result<Option<SourceRecord>> {
        take_fault(&self.fail_next, "find")?;
        let records = self.records.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(records.get(key).cloned())
    }
}

/// In-memory content store keyed by content reference.
#[derive(Default)]
pub struct InMemoryContentStore {
    blobs: Mutex<HashMap<String, Content>>,
    fail_next: AtomicBool,
}

impl InMemoryContentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a content payload.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn insert(&self, content_ref: impl Into<String>, content: Content) {
        self.blobs.lock().unwrap().insert(content_ref.into(), content);
    }

    /// Make the next call fail with [`StoreError::Unavailable`].
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn get_content(&self, content_ref: &str) -> Result<Option<Content>> {
        take_fault(&self.fail_next, "get_content")?;
        let blobs = self.blobs.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(blobs.get(content_ref).cloned())
    }
}

/// In-memory append-only error log.
#[derive(Default)]
pub struct InMemoryErrorLog {
    entries: Mutex<Vec<StorableError>>,
    fail_next: AtomicBool,
}

impl InMemoryErrorLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call fail with [`StoreError::Unavailable`].
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Snapshot of appended entries.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn entries(&self) -> Vec<StorableError> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl ErrorLog for InMemoryErrorLog {
    async fn append(&self, error: &StorableError) -> Result<()> {
        take_fault(&self.fail_next, "append")?;
        let mut entries = self.entries.lock().map_err(|_| StoreError::LockPoisoned)?;
        entries.push(error.clone());
        Ok(())
    }
}

/// In-memory retry transport capturing sent envelopes.
#[derive(Default)]
pub struct InMemoryRetryTransport {
    sent: Mutex<Vec<RetryEnvelope>>,
    fail_next: AtomicBool,
}

impl InMemoryRetryTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call fail with [`StoreError::Unavailable`].
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Snapshot of sent envelopes.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn sent(&self) -> Vec<RetryEnvelope> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl RetryTransport for InMemoryRetryTransport {
    async fn send(&self, envelope: &RetryEnvelope) -> Result<()> {
        take_fault(&self.fail_next, "send")?;
        let mut sent = self.sent.lock().map_err(|_| StoreError::LockPoisoned)?;
        sent.push(envelope.clone());
        Ok(())
    }
}

/// In-memory publisher capturing published records.
///
/// `fail_indices` makes the next publish report those batch positions as
/// failed; `unreachable` makes the next publish fail wholesale.
#[derive(Default)]
pub struct InMemoryPublisher {
    published: Mutex<Vec<EnrichedRecord>>,
    fail_indices: Mutex<Vec<usize>>,
    unreachable: AtomicBool,
}

impl InMemoryPublisher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark batch positions that the next publish will reject.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn fail_indices(&self, indices: Vec<usize>) {
        *self.fail_indices.lock().unwrap() = indices;
    }

    /// Make the next publish fail as transport-unreachable.
    pub fn set_unreachable(&self) {
        self.unreachable.store(true, Ordering::SeqCst);
    }

    /// Snapshot of successfully published records.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn published(&self) -> Vec<EnrichedRecord> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessagePublisher for InMemoryPublisher {
    async fn publish(&self, batch: &[EnrichedRecord]) -> std::result::Result<(), PublishError> {
        if self.unreachable.swap(false, Ordering::SeqCst) {
            return Err(PublishError::Unreachable("injected outage".into()));
        }
        let failing = std::mem::take(&mut *self.fail_indices.lock().unwrap());
        let mut published = self.published.lock().unwrap();
        for (index, record) in batch.iter().enumerate() {
            if !failing.contains(&index) {
                published.push(record.clone());
            }
        }
        if failing.is_empty() {
            Ok(())
        } else {
            Err(PublishError::Partial(failing))
        }
    }
}

/// Telemetry sink recording emitted events.
#[derive(Default)]
pub struct RecordingTelemetry {
    events: Mutex<Vec<(String, serde_json::Value)>>,
}

impl RecordingTelemetry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of emitted `(name, properties)` pairs.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn events(&self) -> Vec<(String, serde_json::Value)> {
        self.events.lock().unwrap().clone()
    }
}

impl TelemetrySink for RecordingTelemetry {
    fn emit(&self, name: &str, properties: serde_json::Value) {
        self.events
            .lock()
            .unwrap()
            .push((name.to_string(), properties));
    }
}

/// Telemetry sink forwarding events to structured logs.
#[derive(Default)]
pub struct TracingTelemetry;

impl TelemetrySink for TracingTelemetry {
    fn emit(&self, name: &str, properties: serde_json::Value) {
        tracing::info!(event = name, properties = %properties, "telemetry");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use viewsync_types::{
        Content, MessageId, OwnerId, ProcessingStatus, StatusChangeEvent, ViewRecord,
    };

    fn record(id: &str, owner: &str) -> SourceRecord {
        SourceRecord {
            id: MessageId::new(id),
            owner: OwnerId::new(owner),
            sender_service_id: "svc".into(),
            created_at: "2026-03-01T08:00:00Z".parse().unwrap(),
            content_ref: id.to_string(),
            pending: false,
            ttl: None,
        }
    }

    fn event(id: &str, owner: &str, version: u64) -> StatusChangeEvent {
        StatusChangeEvent {
            id: MessageId::new(id),
            owner: OwnerId::new(owner),
            version,
            status: StatusFlags {
                archived: false,
                processing: ProcessingStatus::Processed,
                read: false,
            },
            ingested_at: "2026-03-01T09:00:00Z".parse().unwrap(),
        }
    }

    fn view(id: &str, owner: &str, version: u64) -> ViewRecord {
        ViewRecord::project(
            &record(id, owner),
            &Content::bare("subject"),
            &event(id, owner, version),
        )
    }

    #[tokio::test]
    async fn patch_missing_row_is_not_found() {
        let store = InMemoryViewStore::new();
        let outcome = store
            .patch_if_version_less(
                &EntityKey::new("m", "o"),
                &event("m", "o", 1).status,
                1,
            )
            .await
            .unwrap();
        assert_eq!(outcome, PatchOutcome::NotFound);
    }

    #[tokio::test]
    async fn patch_advances_version_when_older() {
        let store = InMemoryViewStore::new();
        store.create(&view("m", "o", 2)).await.unwrap();

        let outcome = store
            .patch_if_version_less(&EntityKey::new("m", "o"), &event("m", "o", 5).status, 5)
            .await
            .unwrap();
        assert_eq!(outcome, PatchOutcome::Applied);

        let stored = store.get(&EntityKey::new("m", "o")).await.unwrap().unwrap();
        assert_eq!(stored.version, 5);
    }

    #[tokio::test]
    async fn patch_stale_version_fails_precondition_without_write() {
        let store = InMemoryViewStore::new();
        store.create(&view("m", "o", 5)).await.unwrap();

        let outcome = store
            .patch_if_version_less(&EntityKey::new("m", "o"), &event("m", "o", 3).status, 3)
            .await
            .unwrap();
        assert_eq!(outcome, PatchOutcome::PreconditionFailed);

        let stored = store.get(&EntityKey::new("m", "o")).await.unwrap().unwrap();
        assert_eq!(stored.version, 5);
    }

    #[tokio::test]
    async fn create_twice_conflicts() {
        let store = InMemoryViewStore::new();
        store.create(&view("m", "o", 1)).await.unwrap();
        let err = store.create(&view("m", "o", 1)).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn fail_next_injects_one_fault() {
        let store = InMemorySourceStore::new();
        store.insert(record("m", "o"));
        store.fail_next();

        let err = store.find(&EntityKey::new("m", "o")).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));

        // Next call succeeds again.
        let found = store.find(&EntityKey::new("m", "o")).await.unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn publisher_partial_failure_reports_indices() {
        let publisher = InMemoryPublisher::new();
        publisher.fail_indices(vec![1]);

        let batch = vec![
            EnrichedRecord {
                record: record("a", "o"),
                content: Some(Content::bare("s")),
            },
            EnrichedRecord {
                record: record("b", "o"),
                content: Some(Content::bare("s")),
            },
        ];
        let err = publisher.publish(&batch).await.unwrap_err();
        assert!(matches!(err, PublishError::Partial(indices) if indices == vec![1]));
        assert_eq!(publisher.published().len(), 1);
        assert_eq!(publisher.published()[0].record.id.as_str(), "a");
    }

    #[test]
    fn recording_telemetry_captures_events() {
        let telemetry = RecordingTelemetry::new();
        telemetry.emit("pipeline.failed", serde_json::json!({"reason": "x"}));
        let events = telemetry.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, "pipeline.failed");
    }
}
