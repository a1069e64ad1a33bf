//! Engine configuration.
//!
//! Passed explicitly into every component; there are no ambient globals.
//! Deserializable so embedders can load it from their own config source,
//! with defaults matching production behavior.

use std::time::Duration;

use serde::Deserialize;

/// Default number of content fetches per enrichment chunk.
pub const DEFAULT_CONTENT_CHUNK_SIZE: usize = 15;

/// Default per-call deadline for external store operations.
pub const DEFAULT_OP_TIMEOUT_MS: u64 = 5_000;

/// Default telemetry event prefix for the view-update pipeline.
pub const DEFAULT_VIEW_EVENT_PREFIX: &str = "trigger.elt.updatemessageview";

/// Default telemetry event prefix for the publication pipeline.
pub const DEFAULT_PUBLISH_EVENT_PREFIX: &str = "trigger.cqrs.publishmessages";

/// Invalid configuration value.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("content_chunk_size must be at least 1")]
    ZeroChunkSize,

    #[error("op_timeout_ms must be at least 1")]
    ZeroTimeout,
}

/// Tunables for the reconciliation and publication pipelines.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Content fetches per chunk; bounds peak content-store concurrency.
    pub content_chunk_size: usize,
    /// Per-call deadline for external store operations, in milliseconds.
    pub op_timeout_ms: u64,
    /// Telemetry event prefix for the view-update pipeline.
    pub view_event_prefix: String,
    /// Telemetry event prefix for the publication pipeline.
    pub publish_event_prefix: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            content_chunk_size: DEFAULT_CONTENT_CHUNK_SIZE,
            op_timeout_ms: DEFAULT_OP_TIMEOUT_MS,
            view_event_prefix: DEFAULT_VIEW_EVENT_PREFIX.to_string(),
            publish_event_prefix: DEFAULT_PUBLISH_EVENT_PREFIX.to_string(),
        }
    }
}

impl EngineConfig {
    /// Per-call deadline as a [`Duration`].
    #[must_use]
    pub fn op_timeout(&self) -> Duration {
        Duration::from_millis(self.op_timeout_ms)
    }

    /// Reject configurations the pipelines cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for a zero chunk size or zero timeout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.content_chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        if self.op_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::default();
        assert_eq!(config.content_chunk_size, 15);
        assert_eq!(config.op_timeout(), Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn deserialize_fills_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"content_chunk_size": 4}"#).unwrap();
        assert_eq!(config.content_chunk_size, 4);
        assert_eq!(config.op_timeout_ms, DEFAULT_OP_TIMEOUT_MS);
        assert_eq!(config.view_event_prefix, DEFAULT_VIEW_EVENT_PREFIX);
    }

    #[test]
    fn deserialize_rejects_unknown_fields() {
        let result = serde_json::from_str::<EngineConfig>(r#"{"chunk": 4}"#);
        assert!(result.is_err());
    }

    #[test]
    fn validate_rejects_zero_chunk_size() {
        let config = EngineConfig {
            content_chunk_size: 0,
            ..EngineConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroChunkSize));
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let config = EngineConfig {
            op_timeout_ms: 0,
            ..EngineConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroTimeout));
    }
}
