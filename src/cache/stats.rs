//! Cache Statistics Module
//!
//! Hit/miss counters kept by a memoized function and the snapshot it reports.

use serde::Serialize;

// == Stats ==
/// Mutable hit/miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    /// Calls answered from the cache
    pub hits: u64,
    /// Calls that ran the computation
    pub misses: u64,
}

impl Stats {
    // == Constructor ==
    /// Creates counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Record Hit ==
    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    // == Record Miss ==
    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    // == Reset ==
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

// == Cache Info ==
/// Snapshot of a memoized function's cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheInfo {
    /// Number of calls answered from the cache
    pub hits: u64,
    /// Number of calls that ran the computation
    pub misses: u64,
    /// Capacity of the cache, None when the mapping is unbounded
    pub capacity: Option<usize>,
    /// Current size of the cache
    pub current_size: usize,
}

impl CacheInfo {
    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no calls have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
