//! # Handler registrations for the replaybus notifier.
//!
//! This module provides the [`Handle`] trait — the contract every event
//! consumer implements — and the registry internals the dispatcher matches
//! against.
//!
//! ## Architecture
//! ```text
//! register(kind, codes, scope, callback, owner)
//!            │
//!            ▼
//!    HandlerTable ── singles / multis / defaults   (insertion-ordered)
//!            │
//!            └── JobIndex ── job → {handler ids}   (kept in lockstep)
//!
//! Matching an event consults the JobIndex first, then the code rules of
//! each tier: single > multi > default.
//! ```

mod handler;
mod job_index;
mod table;

#[cfg(feature = "logging")]
mod log;

pub use handler::{Handle, HandlerFn, HandlerId, HandlerKind, HandlerRef, JobScope};

#[cfg(feature = "logging")]
pub use log::LogSink;

pub(crate) use table::{HandlerTable, Registration, RegistrationParams};
