//! Store error types.

use viewsync_types::Failure;

/// Errors produced by store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store could not be reached or refused the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A call exceeded its deadline.
    #[error("store operation timed out: {0}")]
    Timeout(String),

    /// A row already exists where a create was attempted.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Underlying `SQLite` failure.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// File-system I/O failure (e.g. creating the database directory).
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Payload could not be serialized for storage.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Internal mutex was poisoned by a panicked thread.
    #[error("store lock poisoned")]
    LockPoisoned,
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, StoreError>;

impl StoreError {
    /// Classify this error with a context prefix.
    ///
    /// Store unavailability is the default hypothesis for unclassified
    /// storage errors, so everything maps to Transient.
    #[must_use]
    pub fn to_failure(&self, context: &str) -> Failure {
        Failure::transient(format!("{context}: {self}"))
    }
}
