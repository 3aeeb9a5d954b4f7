//! # Bounded replay cache for event records.
//!
//! [`ReplayCache`] is a fixed-capacity ring buffer: append-only, with
//! oldest-eviction once full. It exists so that a handler registering *after*
//! an event it cares about has fired can still recover recent history.
//!
//! ## Rules
//! - **Append never fails**: capacity is fixed at construction, no growth.
//! - **Order**: records are stored in strictly increasing sequence order;
//!   eviction drops the oldest prefix, never interior entries.
//! - **Truncation is explicit**: a [`since`](ReplayCache::since) request that
//!   predates the oldest retained record returns `truncated = true` — the one
//!   unavoidable data-loss case is flagged, never silent.
//!
//! The cache holds `Arc<EventRecord>` so a replay shares records with any
//! in-flight deliveries instead of cloning them.

use std::collections::VecDeque;
use std::sync::Arc;

use super::record::EventRecord;

/// Fixed-capacity ring buffer of event records.
pub struct ReplayCache {
    slots: VecDeque<Arc<EventRecord>>,
    capacity: usize,
}

impl ReplayCache {
    /// Creates a cache with the given capacity (clamped to a minimum of 1).
    ///
    /// The backing storage is allocated once; appends never reallocate.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Fixed capacity of the cache.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of records currently resident.
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True if no records are resident.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Appends a record, evicting the oldest one when at capacity. O(1).
    pub fn append(&mut self, record: Arc<EventRecord>) {
        if self.slots.len() == self.capacity {
            self.slots.pop_front();
        }
        self.slots.push_back(record);
    }

    /// Returns all cached records with `seq > since`, oldest-first, together
    /// with a truncation flag.
    ///
    /// Each call re-scans current state — this is a snapshot, not a live
    /// cursor. `truncated` is `true` iff records newer than `since` existed
    /// but were already evicted; the caller decides whether the partial
    /// history is acceptable.
    pub fn since(&self, since: u64) -> (Vec<Arc<EventRecord>>, bool) {
        let truncated = self
            .slots
            .front()
            .is_some_and(|oldest| oldest.seq > since.saturating_add(1));
        let records = self
            .slots
            .iter()
            .filter(|r| r.seq > since)
            .cloned()
            .collect();
        (records, truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(seq: u64) -> Arc<EventRecord> {
        Arc::new(EventRecord::new(seq, 0, None, Vec::new()))
    }

    fn seqs(records: &[Arc<EventRecord>]) -> Vec<u64> {
        records.iter().map(|r| r.seq).collect()
    }

    #[test]
    fn test_append_evicts_oldest() {
        let mut cache = ReplayCache::new(3);
        for seq in 1..=5 {
            cache.append(rec(seq));
        }
        assert_eq!(cache.len(), 3);
        let (records, _) = cache.since(0);
        assert_eq!(seqs(&records), vec![3, 4, 5]);
    }

    #[test]
    fn test_since_returns_newer_oldest_first() {
        let mut cache = ReplayCache::new(8);
        for seq in 1..=5 {
            cache.append(rec(seq));
        }
        let (records, truncated) = cache.since(2);
        assert_eq!(seqs(&records), vec![3, 4, 5]);
        assert!(!truncated);
    }

    #[test]
    fn test_since_flags_truncation_after_eviction() {
        let mut cache = ReplayCache::new(2);
        for seq in 1..=5 {
            cache.append(rec(seq));
        }
        // 1..=3 evicted; a since(0) request can no longer be satisfied fully
        let (records, truncated) = cache.since(0);
        assert_eq!(seqs(&records), vec![4, 5]);
        assert!(truncated);
    }

    #[test]
    fn test_since_boundary_is_not_truncated() {
        let mut cache = ReplayCache::new(2);
        for seq in 1..=5 {
            cache.append(rec(seq));
        }
        // oldest retained is 4: asking for "after 3" is exactly satisfiable
        let (records, truncated) = cache.since(3);
        assert_eq!(seqs(&records), vec![4, 5]);
        assert!(!truncated);
    }

    #[test]
    fn test_since_future_sequence_is_empty() {
        let mut cache = ReplayCache::new(4);
        cache.append(rec(1));
        let (records, truncated) = cache.since(9);
        assert!(records.is_empty());
        assert!(!truncated);
    }

    #[test]
    fn test_empty_cache_is_never_truncated() {
        let cache = ReplayCache::new(4);
        let (records, truncated) = cache.since(0);
        assert!(records.is_empty());
        assert!(!truncated);
    }

    #[test]
    fn test_capacity_clamped_to_one() {
        let mut cache = ReplayCache::new(0);
        assert_eq!(cache.capacity(), 1);
        cache.append(rec(1));
        cache.append(rec(2));
        let (records, truncated) = cache.since(0);
        assert_eq!(seqs(&records), vec![2]);
        assert!(truncated);
    }
}
