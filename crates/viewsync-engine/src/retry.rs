//! Retry envelope protocol and failure handlers.
//!
//! A failed input gets exactly one application-level retry. The first
//! failure diverts the input to the retry transport inside a
//! [`RetryEnvelope`] whose `retriable` flag is the failure classification.
//! The failure handlers consume those envelopes: non-retriable ones are
//! dropped terminally without an attempt; retriable ones get one more
//! attempt, after which a Transient failure is re-raised for transport
//! redelivery and a Permanent one is dropped terminally.

use std::sync::Arc;

use serde_json::Value;
use viewsync_store::{MessagePublisher, PublishError, RetryTransport};
use viewsync_types::{Failure, RetryEnvelope, SourceRecord, StatusChangeEvent, StorableError};

use crate::enrich::Enricher;
use crate::errors::EngineError;
use crate::reconciler::Reconciler;
use crate::sink::ErrorSink;

/// Terminal result of handling one envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome {
    /// The retried attempt succeeded.
    Recovered,
    /// The input was dropped terminally, with the failure that ended it.
    Dropped(Failure),
}

/// Divert a failed input to the retry transport and record it.
///
/// # Errors
///
/// Returns [`EngineError::Transport`] if the transport refuses the send;
/// that is a batch-level infrastructure failure, not an item failure.
pub async fn divert_to_retry(
    transport: &dyn RetryTransport,
    sink: &ErrorSink,
    body: Value,
    failure: &Failure,
) -> Result<(), EngineError> {
    divert_storable(transport, sink, StorableError::from_failure(body, failure)).await
}

/// [`divert_to_retry`] for an already-built [`StorableError`].
///
/// # Errors
///
/// Returns [`EngineError::Transport`] if the transport refuses the send.
pub async fn divert_storable(
    transport: &dyn RetryTransport,
    sink: &ErrorSink,
    error: StorableError,
) -> Result<(), EngineError> {
    let envelope = RetryEnvelope {
        body: error.body.clone(),
        retriable: error.retriable,
        message: error.message.clone(),
    };
    transport.send(&envelope).await?;
    tracing::warn!(
        reason = %error.message,
        retriable = error.retriable,
        "input diverted to retry"
    );
    sink.report(&error).await;
    Ok(())
}

/// Decode an envelope, or report the malformed input terminally.
async fn decode_envelope(sink: &ErrorSink, raw: Value) -> Result<RetryEnvelope, RetryOutcome> {
    match serde_json::from_value::<RetryEnvelope>(raw.clone()) {
        Ok(envelope) => Ok(envelope),
        Err(err) => {
            let failure = Failure::permanent(format!("malformed retry envelope: {err}"));
            sink.report(&StorableError::from_failure(raw, &failure))
                .await;
            Err(RetryOutcome::Dropped(failure))
        }
    }
}

/// Drop an envelope whose retry budget is spent, without an attempt.
async fn drop_spent(sink: &ErrorSink, envelope: RetryEnvelope) -> RetryOutcome {
    let failure = Failure::permanent(format!("retry budget spent: {}", envelope.message));
    sink.report(&StorableError::from_failure(envelope.body, &failure))
        .await;
    RetryOutcome::Dropped(failure)
}

/// Settle a retried attempt's failure: Transient re-raises for transport
/// redelivery, Permanent drops terminally.
async fn settle_retry_failure(
    sink: &ErrorSink,
    body: Value,
    failure: Failure,
) -> Result<RetryOutcome, EngineError> {
    if failure.is_transient() {
        // Retry-failure events may be sampled when the failure is still
        // retriable, since redelivery will surface it again.
        sink.emit(
            "retryfailed",
            serde_json::json!({
                "reason": failure.to_string(),
                "sampled": failure.is_transient(),
            }),
        );
        return Err(EngineError::Redeliver(failure));
    }
    sink.report(&StorableError::from_failure(body, &failure))
        .await;
    Ok(RetryOutcome::Dropped(failure))
}

/// Consumes retry envelopes from the view-update pipeline.
pub struct ViewFailureHandler {
    reconciler: Reconciler,
    sink: ErrorSink,
}

impl ViewFailureHandler {
    #[must_use]
    pub fn new(reconciler: Reconciler, sink: ErrorSink) -> Self {
        Self { reconciler, sink }
    }

    /// Handle one raw envelope.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Redeliver`] when the retried attempt failed
    /// Transient; the caller must surface this to its delivery transport.
    pub async fn handle(&self, raw: Value) -> Result<RetryOutcome, EngineError> {
        let envelope = match decode_envelope(&self.sink, raw).await {
            Ok(envelope) => envelope,
            Err(outcome) => return Ok(outcome),
        };
        if !envelope.retriable {
            return Ok(drop_spent(&self.sink, envelope).await);
        }

        let event = match serde_json::from_value::<StatusChangeEvent>(envelope.body.clone()) {
            Ok(event) => event,
            Err(err) => {
                let failure = Failure::permanent(format!("malformed envelope body: {err}"));
                self.sink
                    .report(&StorableError::from_failure(envelope.body, &failure))
                    .await;
                return Ok(RetryOutcome::Dropped(failure));
            }
        };

        match self.reconciler.apply(&event).await {
            Ok(applied) => {
                tracing::info!(entity = %event.key(), ?applied, "retried view update succeeded");
                Ok(RetryOutcome::Recovered)
            }
            Err(failure) => settle_retry_failure(&self.sink, envelope.body, failure).await,
        }
    }
}

/// Consumes retry envelopes from the publication pipeline.
pub struct PublishFailureHandler {
    enricher: Enricher,
    publisher: Arc<dyn MessagePublisher>,
    sink: ErrorSink,
}

impl PublishFailureHandler {
    #[must_use]
    pub fn new(enricher: Enricher, publisher: Arc<dyn MessagePublisher>, sink: ErrorSink) -> Self {
        Self {
            enricher,
            publisher,
            sink,
        }
    }

    /// Handle one raw envelope: re-enrich the record and publish it again.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Redeliver`] when the retried attempt failed
    /// Transient.
    pub async fn handle(&self, raw: Value) -> Result<RetryOutcome, EngineError> {
        let envelope = match decode_envelope(&self.sink, raw).await {
            Ok(envelope) => envelope,
            Err(outcome) => return Ok(outcome),
        };
        if !envelope.retriable {
            return Ok(drop_spent(&self.sink, envelope).await);
        }

        let record = match serde_json::from_value::<SourceRecord>(envelope.body.clone()) {
            Ok(record) => record,
            Err(err) => {
                let failure = Failure::permanent(format!("malformed envelope body: {err}"));
                self.sink
                    .report(&StorableError::from_failure(envelope.body, &failure))
                    .await;
                return Ok(RetryOutcome::Dropped(failure));
            }
        };
        if record.pending {
            let failure = Failure::permanent("pending record is not publishable")
                .with_entity(record.id.clone());
            self.sink
                .report(&StorableError::from_failure(envelope.body, &failure))
                .await;
            return Ok(RetryOutcome::Dropped(failure));
        }

        let enriched = match self.enricher.enrich_record(record).await {
            Ok(enriched) => enriched,
            Err(failure) => {
                return settle_retry_failure(&self.sink, envelope.body, failure).await;
            }
        };

        match self.publisher.publish(std::slice::from_ref(&enriched)).await {
            Ok(()) => {
                tracing::info!(entity = %enriched.record.id, "retried publish succeeded");
                Ok(RetryOutcome::Recovered)
            }
            Err(PublishError::Unreachable(reason)) => {
                let failure = Failure::transient(format!("publish transport unreachable: {reason}"))
                    .with_entity(enriched.record.id.clone());
                settle_retry_failure(&self.sink, envelope.body, failure).await
            }
            Err(PublishError::Partial(_)) => {
                let failure = Failure::transient("publish rejected record")
                    .with_entity(enriched.record.id.clone());
                settle_retry_failure(&self.sink, envelope.body, failure).await
            }
        }
    }
}
