//! Boundary traits for the stores the worker reads from and writes to.
//!
//! The engine and the worker loop are agnostic to the backing technology;
//! anything that can hand out targets and absorb result rows fits here.

use async_trait::async_trait;

use crate::types::{ExtractionResult, ExtractionTarget};

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Hands out work. One pull per batch; the source decides ordering.
#[async_trait]
pub trait TargetSource: Send + Sync {
    /// Up to `limit` targets for this worker's site. An empty vec means no
    /// work is pending.
    async fn next(&self, limit: i64) -> Result<Vec<ExtractionTarget>, BoxError>;
}

/// Absorbs finished rows. Append-only: implementations must never update or
/// delete, so interleaved partial-batch flushes stay safe.
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Append `results` to the named table/stream.
    async fn append(&self, table: &str, results: &[ExtractionResult]) -> Result<(), BoxError>;
}
