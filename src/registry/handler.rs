//! # Core handler trait and registration vocabulary.
//!
//! `Handle` is the extension point for plugging event consumers into the
//! notifier. Each registration is driven by a dedicated worker loop fed by a
//! bounded queue owned by the dispatcher — implementations may be slow (I/O,
//! batching, retries) without blocking the publisher or other handlers.
//!
//! ## Contract
//! - A handler observes events in strictly increasing sequence order: its
//!   queue is filled under the dispatcher's serialization point, and a single
//!   worker drains it FIFO.
//! - Each handler **declares** its preferred queue capacity via
//!   [`Handle::queue_capacity`]. If the queue overflows, events for that
//!   handler are **dropped** and reported.

use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::HandlerError;
use crate::events::{EventRecord, JobId};

/// Opaque identifier of a live registration, unique per notifier instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(pub(crate) u64);

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "h{}", self.0)
    }
}

/// Closed classification of handler registrations.
///
/// The matching rule is fixed and exhaustive, so `kind` is a tagged variant
/// rather than an open-ended handler hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    /// Interested in exactly one status code.
    Single,
    /// Interested in an explicit set of status codes.
    Multi,
    /// Interested in any code not claimed by a more specific handler.
    Default,
}

/// Job-scope filter narrowing which events a handler receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobScope {
    /// Receive events for every job, including job-less events.
    Any,
    /// Receive only events originating from this job.
    Job(JobId),
    /// Receive only events that carry no job association.
    Unscoped,
}

impl JobScope {
    /// True if an event with the given job association passes this filter.
    pub fn admits(&self, job: Option<&JobId>) -> bool {
        match self {
            JobScope::Any => true,
            JobScope::Job(scoped) => job == Some(scoped),
            JobScope::Unscoped => job.is_none(),
        }
    }
}

/// Contract for event handlers.
///
/// Called from a handler-dedicated worker task. Implementations should avoid
/// blocking the async runtime (prefer async I/O and cooperative waits).
#[async_trait]
pub trait Handle: Send + Sync + 'static {
    /// Handle a single event.
    ///
    /// Returning an error marks this delivery as failed in the aggregate
    /// report; it never affects other handlers or the replay cache.
    async fn on_event(&self, event: &EventRecord) -> Result<(), HandlerError>;

    /// Human-readable name (for logs/metrics and delivery reports).
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Preferred capacity of this handler's delivery queue.
    ///
    /// On overflow, events for this handler are **dropped** and the drop is
    /// reported.
    fn queue_capacity(&self) -> usize {
        1024
    }
}

/// Shared handle to a registered callback.
pub type HandlerRef = Arc<dyn Handle>;

/// Function-backed handler implementation.
///
/// Wraps a closure that *creates* a new future per delivery; the closure
/// receives an owned clone of the record, so no shared mutable state is
/// required. If shared state is needed, move an `Arc<...>` into the closure
/// explicitly.
///
/// ## Example
/// ```rust
/// use replaybus::{EventRecord, HandlerError, HandlerFn, HandlerRef};
///
/// let h: HandlerRef = HandlerFn::arc("audit", |ev: EventRecord| async move {
///     if ev.code < 0 {
///         return Err(HandlerError::failed("negative status"));
///     }
///     Ok::<_, HandlerError>(())
/// });
///
/// assert_eq!(h.name(), "audit");
/// ```
pub struct HandlerFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> HandlerFn<F> {
    /// Creates a new function-backed handler.
    ///
    /// Prefer [`HandlerFn::arc`] when you immediately need a [`HandlerRef`].
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the handler and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> Handle for HandlerFn<F>
where
    F: Fn(EventRecord) -> Fut + Send + Sync + 'static, // Fn, not FnMut
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    async fn on_event(&self, event: &EventRecord) -> Result<(), HandlerError> {
        (self.f)(event.clone()).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_any_scope_admits_everything() {
        let job = JobId::from("j1");
        assert!(JobScope::Any.admits(Some(&job)));
        assert!(JobScope::Any.admits(None));
    }

    #[test]
    fn test_job_scope_admits_only_its_job() {
        let scope = JobScope::Job(JobId::from("j1"));
        assert!(scope.admits(Some(&JobId::from("j1"))));
        assert!(!scope.admits(Some(&JobId::from("j2"))));
        assert!(!scope.admits(None));
    }

    #[test]
    fn test_unscoped_admits_only_jobless() {
        assert!(JobScope::Unscoped.admits(None));
        assert!(!JobScope::Unscoped.admits(Some(&JobId::from("j1"))));
    }
}
