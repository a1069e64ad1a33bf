//! Retry envelopes and storable errors.
//!
//! A [`RetryEnvelope`] moves a failed input from the main pipeline into the
//! failure-handler pipeline with its remaining retry budget. A
//! [`StorableError`] is the append-only forensic record written to the
//! durable error log; this system never reads it back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::failure::Failure;

/// Name recorded on every storable error row.
pub const STORABLE_ERROR_NAME: &str = "Storable Error";

/// Wrapper granting a failed input exactly one more processing attempt.
///
/// `retriable = true` marks a first Transient failure: one more attempt is
/// authorized. `retriable = false` marks a Permanent failure (or a spent
/// budget): the failure handler must drop without attempting.
///
/// The body stays raw JSON so non-retriable envelopes can carry input that
/// never decoded in the first place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryEnvelope {
    pub body: Value,
    pub retriable: bool,
    pub message: String,
}

impl RetryEnvelope {
    /// Envelope for an input that failed with `failure`.
    #[must_use]
    pub fn from_failure(body: Value, failure: &Failure) -> Self {
        Self {
            body,
            retriable: failure.is_transient(),
            message: failure.to_string(),
        }
    }
}

/// Append-only error log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorableError {
    pub name: String,
    pub message: String,
    pub retriable: bool,
    /// The original input, serialized verbatim.
    pub body: Value,
    pub failed_at: DateTime<Utc>,
}

impl StorableError {
    /// Log entry for an input that failed with `failure`, stamped now.
    #[must_use]
    pub fn from_failure(body: Value, failure: &Failure) -> Self {
        Self {
            name: STORABLE_ERROR_NAME.to_string(),
            message: failure.to_string(),
            retriable: failure.is_transient(),
            body,
            failed_at: Utc::now(),
        }
    }
}
