//! # Notifier configuration.
//!
//! Provides [`Config`], the one-time setup handed to [`Notifier::new`](crate::Notifier::new).
//! The embedding system loads these values from its own parameter machinery;
//! this crate only consumes them.
//!
//! ## Sentinel values
//! - `cache_capacity = 0` → clamped to 1 (the cache never grows, but it also
//!   never disappears; a zero-capacity cache would make every replay truncated)

/// Default replay-cache capacity when the embedding system supplies none.
pub const DEFAULT_CACHE_CAPACITY: usize = 256;

/// Configuration for a [`Notifier`](crate::Notifier) instance.
///
/// ## Field semantics
/// - `cache_capacity`: number of event records retained for replay; when the
///   cache is full, the oldest record is evicted on append. Fixed at
///   construction, no dynamic growth.
#[derive(Clone, Debug)]
pub struct Config {
    /// Capacity of the replay ring buffer (min 1; clamped at construction).
    pub cache_capacity: usize,
}

impl Config {
    /// Returns the cache capacity clamped to a minimum of 1.
    #[inline]
    pub fn cache_capacity_clamped(&self) -> usize {
        self.cache_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration: `cache_capacity = 256`.
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}
