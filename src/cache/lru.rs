//! LRU Tracker Module
//!
//! Implements Least Recently Used tracking for cache eviction.

use std::hash::Hash;

use ::lru::LruCache;

// == LRU Tracker ==
/// Tracks access order for LRU eviction strategy.
///
/// Wraps an unbounded [`LruCache`] with `()` values; only the key order
/// is used. Capacity is enforced by the owning store.
#[derive(Debug)]
pub struct LruTracker<K: Hash + Eq> {
    /// Order of keys by access time
    order: LruCache<K, ()>,
}

impl<K: Hash + Eq + Clone> LruTracker<K> {
    // == Constructor ==
    /// Creates a new empty LRU tracker.
    pub fn new() -> Self {
        Self {
            order: LruCache::unbounded(),
        }
    }

    // == Touch ==
    /// Marks a key as recently used, inserting it if new.
    pub fn touch(&mut self, key: &K) {
        self.order.put(key.clone(), ());
    }

    // == Remove ==
    /// Removes a key from the tracker.
    pub fn remove(&mut self, key: &K) {
        self.order.pop(key);
    }

    // == Evict Oldest ==
    /// Returns and removes the least recently used key.
    ///
    /// Returns None if tracker is empty.
    pub fn evict_oldest(&mut self) -> Option<K> {
        self.order.pop_lru().map(|(key, ())| key)
    }

    // == Peek Oldest ==
    /// Returns the least recently used key without removing it.
    pub fn peek_oldest(&self) -> Option<&K> {
        self.order.peek_lru().map(|(key, _)| key)
    }

    /// Keys in eviction order, least recently used first.
    pub fn iter(&self) -> impl Iterator<Item = &K> {
        self.order.iter().rev().map(|(key, _)| key)
    }

    // == Length ==
    /// Returns the number of tracked keys.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    // == Contains ==
    /// Checks if a key is being tracked.
    pub fn contains(&self, key: &K) -> bool {
        self.order.contains(key)
    }

    pub fn clear(&mut self) {
        self.order.clear();
    }
}

impl<K: Hash + Eq + Clone> Default for LruTracker<K> {
    fn default() -> Self {
        Self::new()
    }
}
