//! Content enrichment.
//!
//! Pairs source records with their content payloads ahead of publication.
//! Batches are processed in fixed-size chunks: fetches within a chunk run
//! concurrently, chunks run strictly sequentially, so peak content-store
//! concurrency never exceeds the chunk size. Output order equals input
//! order.

use std::sync::Arc;

use tokio::task::JoinSet;
use tokio::time::timeout;
use viewsync_store::ContentStore;
use viewsync_types::{EnrichedRecord, Failure, SourceRecord, StorableError};

use crate::config::EngineConfig;

/// Fetches content for source records under the chunk policy.
#[derive(Clone)]
pub struct Enricher {
    contents: Arc<dyn ContentStore>,
    config: EngineConfig,
}

impl Enricher {
    #[must_use]
    pub fn new(contents: Arc<dyn ContentStore>, config: EngineConfig) -> Self {
        Self { contents, config }
    }

    /// Enrich one record.
    ///
    /// Pending records pass through without a content lookup. A missing
    /// payload is Transient here: the record's metadata has not been
    /// confirmed yet, so absence is read as eventual-consistency lag.
    ///
    /// # Errors
    ///
    /// Returns a Transient [`Failure`] on store errors, timeouts, and
    /// missing payloads.
    pub async fn enrich_record(&self, record: SourceRecord) -> Result<EnrichedRecord, Failure> {
        if record.pending {
            return Ok(EnrichedRecord {
                record,
                content: None,
            });
        }

        let fetch = self.contents.get_content(&record.content_ref);
        let content = match timeout(self.config.op_timeout(), fetch).await {
            Err(_) => {
                return Err(Failure::transient("content fetch deadline exceeded")
                    .with_entity(record.id.clone()));
            }
            Ok(Err(err)) => {
                return Err(err
                    .to_failure("cannot read content")
                    .with_entity(record.id.clone()));
            }
            Ok(Ok(None)) => {
                return Err(Failure::transient("content not yet available")
                    .with_entity(record.id.clone()));
            }
            Ok(Ok(Some(content))) => content,
        };

        Ok(EnrichedRecord {
            record,
            content: Some(content),
        })
    }

    /// Enrich a batch under the chunk policy.
    ///
    /// Chunk `i + 1` starts only after every fetch in chunk `i` resolved.
    /// Each failure is returned positionally as a [`StorableError`]
    /// carrying the record serialized verbatim; one record failing never
    /// affects its neighbors.
    pub async fn enrich_batch(
        &self,
        records: Vec<SourceRecord>,
    ) -> Vec<Result<EnrichedRecord, StorableError>> {
        let bodies: Vec<serde_json::Value> = records
            .iter()
            .map(|record| serde_json::to_value(record).unwrap_or(serde_json::Value::Null))
            .collect();

        let mut results: Vec<Option<Result<EnrichedRecord, Failure>>> =
            (0..records.len()).map(|_| None).collect();

        let chunk_size = self.config.content_chunk_size.max(1);
        for (chunk_index, chunk) in records.chunks(chunk_size).enumerate() {
            let base = chunk_index * chunk_size;
            let mut tasks = JoinSet::new();
            for (offset, record) in chunk.iter().cloned().enumerate() {
                let enricher = self.clone();
                tasks.spawn(async move { (base + offset, enricher.enrich_record(record).await) });
            }
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok((index, result)) => results[index] = Some(result),
                    Err(err) => {
                        tracing::error!(error = %err, "enrichment task aborted");
                    }
                }
            }
        }

        results
            .into_iter()
            .zip(bodies)
            .map(|(slot, body)| match slot {
                Some(Ok(enriched)) => Ok(enriched),
                Some(Err(failure)) => Err(StorableError::from_failure(body, &failure)),
                None => Err(StorableError::from_failure(
                    body,
                    &Failure::transient("enrichment task aborted"),
                )),
            })
            .collect()
    }
}
