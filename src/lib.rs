//! # replaybus
//!
//! **replaybus** is a lightweight event notification registry with bounded
//! replay for Rust.
//!
//! It provides primitives for components of a process-management runtime to
//! publish status events and register interest in a subset of them, with a
//! bounded history so late registrants do not silently miss events. The crate
//! is designed as a building block for higher-level runtime layers.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │   producer   │   │   producer   │   │   producer   │
//!     │ (runtime #1) │   │ (runtime #2) │   │ (runtime #3) │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Notifier (owned context object)                                  │
//! │  - HandlerTable (single / multi / default, insertion-ordered)     │
//! │  - JobIndex (job → interested handler ids)                        │
//! │  - ReplayCache (fixed-capacity ring, oldest-eviction)             │
//! │  - sequence counter (single serialization point)                  │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        │ per-handler      │ per-handler      │ per-handler
//!        ▼ queue            ▼ queue            ▼ queue
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │   worker 1   │   │   worker 2   │   │   worker N   │
//!     │ (FIFO drain) │   │ (FIFO drain) │   │ (FIFO drain) │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//!      h1.on_event()      h2.on_event()      hN.on_event()
//! ```
//!
//! ### Dispatch decision
//! ```text
//! submit(code, job, attrs, mode)
//!   ├─► assign seq, append to ReplayCache      (always, even with 0 matches)
//!   ├─► JobIndex.candidates(job)               (scope narrowing)
//!   ├─► single: code equality                  ┐ specificity
//!   ├─► multi:  code ∈ set                     │ single > multi > default;
//!   ├─► default: only if nothing matched       ┘ registration order per tier
//!   └─► enqueue in order ──► Synchronous: await acks / FireAndForget: return
//! ```
//!
//! ## Guarantees
//! | Property            | Description                                                       |
//! |---------------------|-------------------------------------------------------------------|
//! | **Total order**     | Sequence numbers are strictly increasing; cache order matches.    |
//! | **Per-handler FIFO**| A handler observes monotonically increasing sequence numbers.     |
//! | **Isolation**       | A failing/panicking handler never blocks others or the cache.     |
//! | **Bounded memory**  | The replay cache evicts oldest-first at fixed capacity.           |
//! | **Explicit loss**   | A replay that predates retained history reports `truncated`.      |
//!
//! Delivery is in-process at-least-once; cross-process transport and wire
//! encoding are the embedding system's concern.
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogSink`] handler _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use replaybus::{
//!     Config, DeliveryMode, EventRecord, HandlerError, HandlerFn, JobScope, Notifier,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let hub = Notifier::new(Config::default());
//!
//!     // Register interest in status code 42, for any job.
//!     let audit = HandlerFn::arc("audit", |ev: EventRecord| async move {
//!         println!("[audit] seq={} code={}", ev.seq, ev.code);
//!         Ok::<_, HandlerError>(())
//!     });
//!     let id = hub
//!         .register_single(42, JobScope::Any, audit, Some("demo"))
//!         .await
//!         .unwrap();
//!
//!     let report = hub.submit(42, None, Vec::new(), DeliveryMode::Synchronous).await;
//!     assert_eq!(report.sequence, 1);
//!     assert_eq!(report.matched, 1);
//!
//!     // Anything submitted before a handler existed can still be replayed.
//!     let (records, truncated) = hub.replay_since(0).await;
//!     assert_eq!(records.len(), 1);
//!     assert!(!truncated);
//!
//!     hub.deregister(id).await.unwrap();
//!     hub.shutdown().await;
//! }
//! ```

mod config;
mod dispatch;
mod error;
mod events;
mod registry;

// ---- Public re-exports ----

pub use config::{Config, DEFAULT_CACHE_CAPACITY};
pub use dispatch::{DeliveryMode, DeliveryOutcome, DeliveryReport, Notifier, Replayed};
pub use error::{HandlerError, RegistryError};
pub use events::{Attribute, EventRecord, JobId, ReplayCache, StatusCode};
pub use registry::{Handle, HandlerFn, HandlerId, HandlerKind, HandlerRef, JobScope};

// Optional: expose a simple built-in logging handler (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use registry::LogSink;
