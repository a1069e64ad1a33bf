//! Structured logging setup for embedders and test binaries.

use anyhow::anyhow;
use tracing_subscriber::EnvFilter;

use crate::errors::EngineError;

/// Initialize structured logging with tracing-subscriber.
///
/// Uses the `RUST_LOG` env var if set, otherwise falls back to the
/// provided level.
///
/// # Errors
///
/// Returns [`EngineError::Infrastructure`] if a global subscriber is
/// already installed; callers that tolerate that (test binaries sharing
/// one process) can discard the result.
pub fn init(log_level: &str) -> Result<(), EngineError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .try_init()
        .map_err(|err| {
            EngineError::Infrastructure(anyhow!("cannot install log subscriber: {err}"))
        })
}
