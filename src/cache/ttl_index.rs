//! TTL Index Module
//!
//! Tracks expiration timestamps in expiration order. Every entry of a
//! cache shares one TTL, so insertion order is expiration order and a
//! sweep only has to look at an expired prefix.

use std::fmt;
use std::hash::Hash;

use lru::LruCache;

// == TTL Index ==
/// Expiration-ordered keys.
///
/// Keys live in one of two lists, each an unbounded [`LruCache`] used
/// purely for its insertion order (least recent = soonest to expire):
/// - `live`: not yet trimmed
/// - `lapsed`: found expired by [`trim`](Self::trim) but still holding
///   data in the backing store until the next [`sweep`](Self::sweep)
///
/// Together the two lists hold exactly the keys of the backing store.
/// Lookups use `peek` so reading an expiration never reorders a list.
pub struct TtlIndex<K: Hash + Eq> {
    live: LruCache<K, u64>,
    lapsed: LruCache<K, u64>,
}

impl<K: Hash + Eq> TtlIndex<K> {
    pub fn new() -> Self {
        Self {
            live: LruCache::unbounded(),
            lapsed: LruCache::unbounded(),
        }
    }

    // == Record ==
    /// Inserts or refreshes a key at the freshest position.
    pub fn record(&mut self, key: K, expires_at: u64) {
        self.lapsed.pop(&key);
        self.live.put(key, expires_at);
    }

    // == Forget ==
    /// Drops a key from the index. Returns whether it was tracked.
    pub fn forget(&mut self, key: &K) -> bool {
        self.live.pop(key).or_else(|| self.lapsed.pop(key)).is_some()
    }

    // == Trim ==
    /// Non-destructive sweep: moves every expired key off the live list
    /// without touching the backing store. Returns how many moved.
    pub fn trim(&mut self, now: u64) -> usize {
        let mut moved = 0;
        while let Some((_, &expires_at)) = self.live.peek_lru() {
            if expires_at > now {
                break;
            }
            if let Some((key, expires_at)) = self.live.pop_lru() {
                self.lapsed.put(key, expires_at);
                moved += 1;
            }
        }
        moved
    }

    // == Sweep ==
    /// Destructive sweep: removes and returns every expired key, oldest
    /// first. The caller owns moving their data out of the backing store.
    pub fn sweep(&mut self, now: u64) -> Vec<K> {
        self.trim(now);
        let mut expired = Vec::with_capacity(self.lapsed.len());
        while let Some((key, _)) = self.lapsed.pop_lru() {
            expired.push(key);
        }
        expired
    }

    /// Counts live keys still unexpired at `now` without mutating anything.
    pub fn unexpired(&self, now: u64) -> usize {
        let expired = self
            .live
            .iter()
            .rev()
            .take_while(|(_, &expires_at)| expires_at <= now)
            .count();
        self.live.len() - expired
    }

    pub fn expires_at(&self, key: &K) -> Option<u64> {
        self.live.peek(key).or_else(|| self.lapsed.peek(key)).copied()
    }

    /// Keys trimmed but not yet swept.
    pub fn lapsed(&self) -> impl Iterator<Item = &K> {
        self.lapsed.iter().rev().map(|(key, _)| key)
    }

    /// Whether `key` is live (recorded and not trimmed).
    pub fn contains(&self, key: &K) -> bool {
        self.live.contains(key)
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn clear(&mut self) {
        self.live.clear();
        self.lapsed.clear();
    }
}

impl<K: Hash + Eq> Default for TtlIndex<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Hash + Eq + fmt::Debug> fmt::Debug for TtlIndex<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TtlIndex")
            .field("live", &self.live.iter().rev().collect::<Vec<_>>())
            .field("lapsed", &self.lapsed.iter().rev().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_with(entries: &[(&'static str, u64)]) -> TtlIndex<&'static str> {
        let mut index = TtlIndex::new();
        for &(key, expires_at) in entries {
            index.record(key, expires_at);
        }
        index
    }

    #[test]
    fn test_sweep_returns_expired_prefix() {
        let mut index = index_with(&[("a", 10), ("b", 20), ("c", 30)]);

        assert_eq!(index.sweep(20), vec!["a", "b"]);
        assert_eq!(index.len(), 1);
        assert!(index.contains(&"c"));
    }

    #[test]
    fn test_sweep_stops_at_first_unexpired_key() {
        // Out-of-order timestamps can appear with a wall clock; the sweep
        // still stops at the first live key.
        let mut index = index_with(&[("a", 10), ("b", 50), ("c", 20)]);

        assert_eq!(index.sweep(30), vec!["a"]);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_sweep_is_idempotent() {
        let mut index = index_with(&[("a", 10), ("b", 20)]);

        assert_eq!(index.sweep(15), vec!["a"]);
        assert!(index.sweep(15).is_empty());
    }

    #[test]
    fn test_expiry_boundary_is_inclusive() {
        let mut index = index_with(&[("a", 10)]);

        assert!(index.sweep(9).is_empty());
        assert_eq!(index.sweep(10), vec!["a"]);
    }

    #[test]
    fn test_record_refreshes_position() {
        let mut index = index_with(&[("a", 10), ("b", 20)]);
        index.record("a", 30);

        assert_eq!(index.sweep(25), vec!["b"]);
        assert_eq!(index.expires_at(&"a"), Some(30));
    }

    #[test]
    fn test_trim_keeps_keys_until_sweep() {
        let mut index = index_with(&[("a", 10), ("b", 20)]);

        assert_eq!(index.trim(15), 1);
        assert_eq!(index.len(), 1);
        assert!(!index.contains(&"a"));
        assert_eq!(index.lapsed().collect::<Vec<_>>(), vec![&"a"]);

        assert_eq!(index.sweep(15), vec!["a"]);
        assert_eq!(index.lapsed().count(), 0);
    }

    #[test]
    fn test_record_revives_lapsed_key() {
        let mut index = index_with(&[("a", 10)]);
        index.trim(10);
        index.record("a", 40);

        assert!(index.contains(&"a"));
        assert!(index.sweep(20).is_empty());
    }

    #[test]
    fn test_forget_from_either_list() {
        let mut index = index_with(&[("a", 10), ("b", 20)]);
        index.trim(10);

        assert!(index.forget(&"a"));
        assert!(index.forget(&"b"));
        assert!(!index.forget(&"b"));
        assert!(index.sweep(100).is_empty());
    }

    #[test]
    fn test_reading_expiration_keeps_order() {
        let mut index = index_with(&[("a", 10), ("b", 20)]);

        // A lookup of the oldest key must not make it the freshest
        assert_eq!(index.expires_at(&"a"), Some(10));
        assert!(index.contains(&"a"));
        assert_eq!(index.sweep(10), vec!["a"]);
    }

    #[test]
    fn test_forget_then_record_moves_to_freshest() {
        let mut index = index_with(&[("a", 10), ("b", 20), ("c", 30)]);
        index.forget(&"a");
        index.record("a", 40);

        assert_eq!(index.sweep(35), vec!["b", "c"]);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_unexpired_is_pure() {
        let index = index_with(&[("a", 10), ("b", 20), ("c", 30)]);

        assert_eq!(index.unexpired(20), 1);
        assert_eq!(index.len(), 3);
    }
}
