//! Terminal error sink.
//!
//! Every dropped input leaves two traces: a row in the durable error log
//! and a telemetry event. If the log itself is down, the sink degrades to
//! telemetry-only with a distinct event name so the gap is visible.
//! Reporting never propagates an error.

use std::sync::Arc;

use serde_json::json;
use viewsync_store::{ErrorLog, TelemetrySink};
use viewsync_types::StorableError;

/// Records terminal failures durably and observably.
#[derive(Clone)]
pub struct ErrorSink {
    log: Arc<dyn ErrorLog>,
    telemetry: Arc<dyn TelemetrySink>,
    event_prefix: String,
}

impl ErrorSink {
    #[must_use]
    pub fn new(
        log: Arc<dyn ErrorLog>,
        telemetry: Arc<dyn TelemetrySink>,
        event_prefix: impl Into<String>,
    ) -> Self {
        Self {
            log,
            telemetry,
            event_prefix: event_prefix.into(),
        }
    }

    /// Emit a telemetry event under this sink's prefix.
    pub fn emit(&self, suffix: &str, properties: serde_json::Value) {
        self.telemetry
            .emit(&format!("{}.{suffix}", self.event_prefix), properties);
    }

    /// Record a terminal failure.
    ///
    /// Appends to the error log, then emits `<prefix>.failed`. If the
    /// append fails, emits `<prefix>.failedwithoutstoringerror` carrying
    /// both errors instead. Terminal-failure events carry `sampled:
    /// false` so none of them are thinned out downstream.
    pub async fn report(&self, error: &StorableError) {
        match self.log.append(error).await {
            Ok(()) => {
                self.emit(
                    "failed",
                    json!({
                        "reason": error.message,
                        "retriable": error.retriable,
                        "sampled": false,
                    }),
                );
            }
            Err(store_err) => {
                tracing::error!(
                    error = %store_err,
                    dropped = %error.message,
                    "error log unavailable; failure recorded in telemetry only"
                );
                self.emit(
                    "failedwithoutstoringerror",
                    json!({
                        "reason": error.message,
                        "retriable": error.retriable,
                        "storage_error": store_err.to_string(),
                        "sampled": false,
                    }),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use viewsync_store::memory::{InMemoryErrorLog, RecordingTelemetry};
    use viewsync_types::Failure;

    fn sink() -> (Arc<InMemoryErrorLog>, Arc<RecordingTelemetry>, ErrorSink) {
        let log = Arc::new(InMemoryErrorLog::new());
        let telemetry = Arc::new(RecordingTelemetry::new());
        let sink = ErrorSink::new(
            log.clone(),
            telemetry.clone(),
            "trigger.elt.updatemessageview",
        );
        (log, telemetry, sink)
    }

    #[tokio::test]
    async fn report_logs_then_emits_failed() {
        let (log, telemetry, sink) = sink();
        let error = StorableError::from_failure(
            json!({"id": "MSG-1"}),
            &Failure::permanent("content not found for stored record"),
        );

        sink.report(&error).await;

        assert_eq!(log.entries().len(), 1);
        let events = telemetry.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, "trigger.elt.updatemessageview.failed");
        assert_eq!(events[0].1["retriable"], json!(false));
        assert_eq!(events[0].1["sampled"], json!(false));
    }

    #[tokio::test]
    async fn report_degrades_to_telemetry_when_log_is_down() {
        let (log, telemetry, sink) = sink();
        log.fail_next();
        let error =
            StorableError::from_failure(json!({"id": "MSG-1"}), &Failure::transient("timeout"));

        sink.report(&error).await;

        assert!(log.entries().is_empty());
        let events = telemetry.events();
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0].0,
            "trigger.elt.updatemessageview.failedwithoutstoringerror"
        );
        assert!(events[0].1["storage_error"]
            .as_str()
            .unwrap()
            .contains("injected fault"));
        assert_eq!(events[0].1["sampled"], json!(false));
    }
}
