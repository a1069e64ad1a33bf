//! Collaborator store contracts for the viewsync pipeline.
//!
//! Provides the traits the engine consumes ([`ViewStore`], [`SourceStore`],
//! [`ContentStore`], [`ErrorLog`], [`RetryTransport`], [`MessagePublisher`],
//! [`TelemetrySink`]), in-memory implementations for tests and embedders,
//! and a `SQLite`-backed durable error log.

#![warn(clippy::pedantic)]

pub mod error;
pub mod memory;
pub mod sqlite;
pub mod traits;

pub use error::StoreError;
pub use sqlite::SqliteErrorLog;
pub use traits::{
    ContentStore, ErrorLog, MessagePublisher, PatchOutcome, PublishError, RetryTransport,
    SourceStore, TelemetrySink, ViewStore,
};
