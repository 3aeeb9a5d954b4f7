//! # Simple logging handler for debugging and demos.
//!
//! [`LogSink`] emits every event it receives through `tracing` at info level.
//! Registered as a default handler it acts as a catch-all log of unclaimed
//! events; registered as a multi-code handler it logs a chosen subset.
//!
//! Not intended for production use - implement a custom [`Handle`] for
//! structured forwarding or metrics collection.

use async_trait::async_trait;

use crate::error::HandlerError;
use crate::events::EventRecord;
use crate::registry::Handle;

/// Tracing-backed logging handler.
///
/// Enabled via the `logging` feature.
pub struct LogSink;

#[async_trait]
impl Handle for LogSink {
    async fn on_event(&self, event: &EventRecord) -> Result<(), HandlerError> {
        match &event.job {
            Some(job) => tracing::info!(seq = event.seq, code = event.code, job = %job, "event"),
            None => tracing::info!(seq = event.seq, code = event.code, "event"),
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "log-sink"
    }
}
