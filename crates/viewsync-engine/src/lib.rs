//! Reconciliation and publication pipelines over the viewsync stores.
//!
//! The engine absorbs status change event batches into the denormalized
//! view ([`Reconciler`], [`ViewBatchDriver`]), publishes enriched source
//! records downstream ([`Enricher`], [`PublishBatchDriver`]), and runs the
//! one-retry failure protocol for both ([`ViewFailureHandler`],
//! [`PublishFailureHandler`], [`ErrorSink`]).

#![warn(clippy::pedantic)]

pub mod config;
pub mod driver;
pub mod enrich;
pub mod errors;
pub mod logging;
pub mod reconciler;
pub mod retry;
pub mod sink;

pub use config::{ConfigError, EngineConfig};
pub use driver::{BatchSummary, PublishBatchDriver, ViewBatchDriver};
pub use enrich::Enricher;
pub use errors::EngineError;
pub use reconciler::{Applied, Reconciler};
pub use retry::{divert_to_retry, PublishFailureHandler, RetryOutcome, ViewFailureHandler};
pub use sink::ErrorSink;
