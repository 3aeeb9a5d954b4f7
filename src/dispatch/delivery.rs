//! # Per-handler sequential delivery.
//!
//! Every registration gets a bounded queue and a dedicated worker task. The
//! dispatcher enqueues matched records under its serialization point, so each
//! worker drains a stream of strictly increasing sequence numbers — the
//! per-handler ordering barrier that makes concurrent submission safe.
//!
//! ## Architecture
//! ```text
//! submit(event)
//!     │
//!     ├──► [queue 1] ──► worker 1 ──► handler1.on_event()
//!     │    (bounded)         └──────► panic → caught, reported
//!     ├──► [queue 2] ──► worker 2 ──► handler2.on_event()
//!     │    (bounded)
//!     └──► [queue N] ──► worker N ──► handlerN.on_event()
//!          (bounded)
//! ```
//!
//! ## Rules
//! - **No cross-handler ordering**: handler A may process event N while B
//!   processes N+5; per-handler order is FIFO.
//! - **Overflow**: the event is dropped for that handler only and reported as
//!   [`HandlerError::Dropped`].
//! - **Isolation**: a slow, failing, or panicking handler does not affect
//!   others and never blocks the publisher.
//!
//! ## Panic handling
//! Worker tasks use `catch_unwind` to isolate panics: the panic is converted
//! into a [`HandlerError::Panicked`] outcome and the worker keeps processing.
//! `AssertUnwindSafe` is used, which can leave shared state inconsistent if a
//! handler panics while holding a lock inside an `Arc<Mutex<T>>`.

use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::HandlerError;
use crate::events::EventRecord;
use crate::registry::{Handle, HandlerId, HandlerRef};

/// How `submit` relates to handler completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Await every matched handler's acknowledgment; the returned report
    /// carries one outcome per matched handler.
    Synchronous,
    /// Return as soon as the event is cached and enqueued; outcomes surface
    /// on the monitoring path only.
    FireAndForget,
}

/// Outcome of one handler's delivery within a single submission.
#[derive(Debug, Clone)]
pub struct DeliveryOutcome {
    /// The registration this outcome belongs to.
    pub handler: HandlerId,
    /// Handler name at registration time.
    pub name: Arc<str>,
    /// `Ok` on acknowledgment, the isolated failure otherwise.
    pub result: Result<(), HandlerError>,
}

/// Aggregate result of one `submit` call.
///
/// Per-handler delivery errors are surfaced here and on the monitoring path,
/// never as a fatal condition — one misbehaving handler cannot prevent
/// delivery to others or keep the event out of the replay cache.
#[derive(Debug)]
pub struct DeliveryReport {
    /// Sequence number assigned to the submitted event.
    pub sequence: u64,
    /// How many handlers matched the event.
    pub matched: usize,
    /// Per-handler outcomes. Complete in [`DeliveryMode::Synchronous`]; in
    /// [`DeliveryMode::FireAndForget`] only enqueue-time drops appear.
    pub outcomes: Vec<DeliveryOutcome>,
}

impl DeliveryReport {
    /// Number of recorded outcomes that are failures.
    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_err()).count()
    }
}

/// One unit of work on a handler's queue.
pub(crate) struct Delivery {
    pub(crate) record: Arc<EventRecord>,
    /// Present in synchronous mode; the worker reports the outcome here.
    pub(crate) ack: Option<oneshot::Sender<Result<(), HandlerError>>>,
}

/// Spawns the sequential worker for one registration.
///
/// The worker exits when the queue sender is dropped or the token is
/// cancelled; a cancellation abandons queued backlog, but an invocation
/// already in flight completes.
pub(crate) fn spawn_worker(
    handler: HandlerRef,
    cancel: CancellationToken,
    capacity: usize,
) -> (mpsc::Sender<Delivery>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<Delivery>(capacity.max(1));

    let worker = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                msg = rx.recv() => match msg {
                    Some(delivery) => {
                        if cancel.is_cancelled() {
                            break;
                        }
                        deliver(handler.as_ref(), delivery).await;
                    }
                    None => break,
                }
            }
        }
    });
    (tx, worker)
}

/// Invokes the callback for one record, isolating failures and panics.
async fn deliver(handler: &dyn Handle, delivery: Delivery) {
    let fut = handler.on_event(&delivery.record);

    let result = match std::panic::AssertUnwindSafe(fut).catch_unwind().await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => {
            tracing::warn!(
                handler = handler.name(),
                seq = delivery.record.seq,
                error = %err,
                "handler failed"
            );
            Err(err)
        }
        Err(panic_err) => {
            let info = {
                let any = &*panic_err;
                if let Some(msg) = any.downcast_ref::<&'static str>() {
                    (*msg).to_string()
                } else if let Some(msg) = any.downcast_ref::<String>() {
                    msg.clone()
                } else {
                    "unknown panic".to_string()
                }
            };
            tracing::warn!(
                handler = handler.name(),
                seq = delivery.record.seq,
                panic = %info,
                "handler panicked"
            );
            Err(HandlerError::Panicked(info))
        }
    };

    if let Some(ack) = delivery.ack {
        let _ = ack.send(result);
    }
}
