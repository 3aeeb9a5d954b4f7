//! Immutable event records and their building blocks.
//!
//! An [`EventRecord`] describes one status occurrence: an integer status code,
//! an optional originating job, and an ordered list of auxiliary attributes.
//! Records are created by the dispatcher on ingestion — the sequence number is
//! assigned at append time and is strictly increasing per notifier instance —
//! and are destroyed only by replay-cache eviction.

use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

/// Integer status code carried by an event (negative codes are valid).
pub type StatusCode = i32;

/// Opaque, comparable job identifier supplied by the job-lifecycle manager.
///
/// Cheap to clone (`Arc`-backed); compared and hashed by value.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct JobId(Arc<str>);

impl JobId {
    /// Creates a job identifier from any string-like value.
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        JobId::new(id)
    }
}

impl From<String> for JobId {
    fn from(id: String) -> Self {
        JobId::new(id)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One auxiliary key/value pair attached to an event.
///
/// Attribute order is preserved exactly as submitted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attribute {
    /// Attribute key.
    pub key: Arc<str>,
    /// Attribute value.
    pub value: Arc<str>,
}

impl Attribute {
    /// Creates a new attribute pair.
    #[inline]
    pub fn new(key: impl Into<Arc<str>>, value: impl Into<Arc<str>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Immutable record of one status occurrence.
///
/// - `seq`: globally unique, monotonically increasing per notifier instance
///   (first assigned sequence is 1); the replay cache relies on this for
///   "since N" queries
/// - `at`: wall-clock timestamp (for logs)
#[derive(Clone, Debug)]
pub struct EventRecord {
    /// Sequence number assigned by the dispatcher at append time.
    pub seq: u64,
    /// Status code of the occurrence.
    pub code: StatusCode,
    /// Originating job, if the event is job-associated.
    pub job: Option<JobId>,
    /// Ordered auxiliary attributes.
    pub attributes: Vec<Attribute>,
    /// Wall-clock timestamp.
    pub at: SystemTime,
}

impl EventRecord {
    /// Creates a record with the given sequence number and current timestamp.
    ///
    /// Only the dispatcher assigns sequence numbers, so construction stays
    /// crate-internal.
    pub(crate) fn new(
        seq: u64,
        code: StatusCode,
        job: Option<JobId>,
        attributes: Vec<Attribute>,
    ) -> Self {
        Self {
            seq,
            code,
            job,
            attributes,
            at: SystemTime::now(),
        }
    }

    /// Returns the value of the first attribute with the given key, if any.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| &*a.key == key)
            .map(|a| &*a.value)
    }
}
