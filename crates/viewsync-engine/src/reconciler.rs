//! View reconciliation: conditional patch with fallback rebuild.
//!
//! The happy path is a single version-conditioned patch against the view
//! store. A precondition miss means a newer event already won and is an
//! idempotent success. A missing row means the view was never built (or a
//! create raced) and triggers a full rebuild from source metadata and
//! content.

use std::future::Future;
use std::sync::Arc;

use tokio::time::timeout;
use viewsync_store::{ContentStore, PatchOutcome, SourceStore, ViewStore};
use viewsync_types::{Failure, StatusChangeEvent, ViewRecord};

use crate::config::EngineConfig;

/// How an event was absorbed into the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// Status fields were patched in place.
    Patched,
    /// A newer (or equal) version was already stored; nothing written.
    AlreadyCurrent,
    /// No row existed; a fresh one was projected and created.
    Rebuilt,
}

/// Applies status change events to the view store.
#[derive(Clone)]
pub struct Reconciler {
    views: Arc<dyn ViewStore>,
    sources: Arc<dyn SourceStore>,
    contents: Arc<dyn ContentStore>,
    config: EngineConfig,
}

impl Reconciler {
    #[must_use]
    pub fn new(
        views: Arc<dyn ViewStore>,
        sources: Arc<dyn SourceStore>,
        contents: Arc<dyn ContentStore>,
        config: EngineConfig,
    ) -> Self {
        Self {
            views,
            sources,
            contents,
            config,
        }
    }

    /// Run a store call under the per-call deadline, classifying errors.
    async fn bounded<T, F>(&self, context: &str, call: F) -> Result<T, Failure>
    where
        F: Future<Output = Result<T, viewsync_store::StoreError>>,
    {
        match timeout(self.config.op_timeout(), call).await {
            Err(_) => Err(Failure::transient(format!("{context}: deadline exceeded"))),
            Ok(Err(err)) => Err(err.to_failure(context)),
            Ok(Ok(value)) => Ok(value),
        }
    }

    /// Absorb one status change event.
    ///
    /// # Errors
    ///
    /// Transient [`Failure`] for store errors and timeouts; Permanent for
    /// a missing source record, missing content after metadata was
    /// confirmed, or a projection that fails validation.
    pub async fn apply(&self, event: &StatusChangeEvent) -> Result<Applied, Failure> {
        let key = event.key();
        let outcome = self
            .bounded(
                "cannot patch view",
                self.views
                    .patch_if_version_less(&key, &event.status, event.version),
            )
            .await
            .map_err(|failure| failure.with_entity(event.id.clone()))?;

        match outcome {
            PatchOutcome::Applied => {
                tracing::debug!(entity = %key, version = event.version, "view patched");
                Ok(Applied::Patched)
            }
            PatchOutcome::PreconditionFailed => {
                tracing::debug!(entity = %key, version = event.version, "view already current");
                Ok(Applied::AlreadyCurrent)
            }
            PatchOutcome::NotFound => self
                .rebuild(event)
                .await
                .map_err(|failure| failure.with_entity(event.id.clone())),
        }
    }

    /// Rebuild the view row from source metadata and content.
    ///
    /// Absence is Permanent on both lookups here: the event proves the
    /// record went through ingestion, so missing metadata or content is a
    /// violated upstream invariant, not lag.
    async fn rebuild(&self, event: &StatusChangeEvent) -> Result<Applied, Failure> {
        let key = event.key();
        let record = self
            .bounded("cannot read source record", self.sources.find(&key))
            .await?
            .ok_or_else(|| Failure::permanent("source record not found"))?;

        let content = self
            .bounded(
                "cannot read content",
                self.contents.get_content(&record.content_ref),
            )
            .await?
            .ok_or_else(|| Failure::permanent("content not found for stored record"))?;

        let view = ViewRecord::project(&record, &content, event);
        view.validate()
            .map_err(|defect| Failure::permanent(format!("view validation failed: {defect}")))?;

        self.bounded("cannot create view", self.views.create(&view))
            .await?;
        tracing::info!(entity = %key, version = event.version, "view rebuilt");
        Ok(Applied::Rebuilt)
    }
}
