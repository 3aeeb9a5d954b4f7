//! # Event records and the bounded replay cache.
//!
//! An [`EventRecord`] is the immutable value flowing through the system; the
//! [`ReplayCache`] retains a bounded window of recent records so that
//! late-registering handlers can catch up without unbounded memory growth.

mod cache;
mod record;

pub use cache::ReplayCache;
pub use record::{Attribute, EventRecord, JobId, StatusCode};
