//! Batch drivers.
//!
//! One driver invocation consumes one delivered batch. Items fail
//! independently: a failed item is diverted to the retry transport and the
//! batch continues. Only infrastructure failures (retry transport down,
//! publish transport down) abort the batch, which the delivery transport
//! then redelivers wholesale.

use std::sync::Arc;

use serde_json::Value;
use tokio::task::JoinSet;
use viewsync_store::{MessagePublisher, PublishError, RetryTransport};
use viewsync_types::{EnrichedRecord, Failure, SourceRecord, StatusChangeEvent};

use crate::enrich::Enricher;
use crate::errors::EngineError;
use crate::reconciler::Reconciler;
use crate::retry::{divert_storable, divert_to_retry};
use crate::sink::ErrorSink;

/// Per-batch outcome counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
}

/// Drives status change event batches through the reconciler.
pub struct ViewBatchDriver {
    reconciler: Reconciler,
    retry: Arc<dyn RetryTransport>,
    sink: ErrorSink,
}

impl ViewBatchDriver {
    #[must_use]
    pub fn new(reconciler: Reconciler, retry: Arc<dyn RetryTransport>, sink: ErrorSink) -> Self {
        Self {
            reconciler,
            retry,
            sink,
        }
    }

    /// Process one batch of raw status change events.
    ///
    /// Each item decodes and reconciles independently; reconciliation runs
    /// concurrently across items, then failures are diverted in input
    /// order.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Transport`] only if the retry transport
    /// itself refuses a diverted item.
    pub async fn run(&self, batch: Vec<Value>) -> Result<BatchSummary, EngineError> {
        let decoded: Vec<Result<StatusChangeEvent, Failure>> = batch
            .iter()
            .map(|raw| {
                serde_json::from_value::<StatusChangeEvent>(raw.clone()).map_err(|err| {
                    Failure::permanent(format!("malformed status change event: {err}"))
                })
            })
            .collect();

        let mut applied: Vec<Option<Result<(), Failure>>> =
            (0..batch.len()).map(|_| None).collect();
        let mut tasks = JoinSet::new();
        for (index, item) in decoded.iter().enumerate() {
            if let Ok(event) = item {
                let reconciler = self.reconciler.clone();
                let event = event.clone();
                tasks.spawn(async move {
                    (index, reconciler.apply(&event).await.map(|_| ()))
                });
            }
        }
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => applied[index] = Some(result),
                Err(err) => {
                    tracing::error!(error = %err, "reconciliation task aborted");
                }
            }
        }

        let mut summary = BatchSummary::default();
        for ((raw, item), slot) in batch.into_iter().zip(decoded).zip(applied) {
            let failure = match (item, slot) {
                (Err(failure), _) => failure,
                (Ok(_), Some(Ok(()))) => {
                    summary.succeeded += 1;
                    continue;
                }
                (Ok(_), Some(Err(failure))) => failure,
                (Ok(_), None) => Failure::transient("reconciliation task aborted"),
            };
            divert_to_retry(self.retry.as_ref(), &self.sink, raw, &failure).await?;
            summary.failed += 1;
        }
        Ok(summary)
    }
}

/// Drives source record batches through enrichment and publication.
pub struct PublishBatchDriver {
    enricher: Enricher,
    publisher: Arc<dyn MessagePublisher>,
    retry: Arc<dyn RetryTransport>,
    sink: ErrorSink,
}

impl PublishBatchDriver {
    #[must_use]
    pub fn new(
        enricher: Enricher,
        publisher: Arc<dyn MessagePublisher>,
        retry: Arc<dyn RetryTransport>,
        sink: ErrorSink,
    ) -> Self {
        Self {
            enricher,
            publisher,
            retry,
            sink,
        }
    }

    /// Process one batch of raw source records.
    ///
    /// Pending records are skipped without counting. Enrichment runs under
    /// the chunk policy; enrichment failures divert individually. The
    /// enriched records publish as one batch.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Transport`] if the retry transport refuses a
    /// diverted item, or [`EngineError::Redeliver`] if the publish
    /// transport is unreachable (the whole batch must be redelivered).
    pub async fn run(&self, batch: Vec<Value>) -> Result<BatchSummary, EngineError> {
        let mut summary = BatchSummary::default();
        let mut records = Vec::with_capacity(batch.len());
        for raw in batch {
            match serde_json::from_value::<SourceRecord>(raw.clone()) {
                Ok(record) if record.pending => {
                    tracing::debug!(entity = %record.id, "skipping pending record");
                }
                Ok(record) => records.push(record),
                Err(err) => {
                    let failure =
                        Failure::permanent(format!("malformed source record: {err}"));
                    divert_to_retry(self.retry.as_ref(), &self.sink, raw, &failure).await?;
                    summary.failed += 1;
                }
            }
        }

        let mut ready: Vec<EnrichedRecord> = Vec::with_capacity(records.len());
        for result in self.enricher.enrich_batch(records).await {
            match result {
                Ok(enriched) => ready.push(enriched),
                Err(storable) => {
                    divert_storable(self.retry.as_ref(), &self.sink, storable).await?;
                    summary.failed += 1;
                }
            }
        }

        if ready.is_empty() {
            return Ok(summary);
        }
        match self.publisher.publish(&ready).await {
            Ok(()) => {
                summary.succeeded += ready.len();
                Ok(summary)
            }
            Err(PublishError::Unreachable(reason)) => Err(EngineError::Redeliver(
                Failure::transient(format!("publish transport unreachable: {reason}")),
            )),
            Err(PublishError::Partial(indices)) => {
                for (index, enriched) in ready.iter().enumerate() {
                    if indices.contains(&index) {
                        let failure = Failure::transient("publish rejected record")
                            .with_entity(enriched.record.id.clone());
                        let body = serde_json::to_value(&enriched.record)
                            .unwrap_or(Value::Null);
                        divert_to_retry(self.retry.as_ref(), &self.sink, body, &failure).await?;
                        summary.failed += 1;
                    } else {
                        summary.succeeded += 1;
                    }
                }
                Ok(summary)
            }
        }
    }
}
