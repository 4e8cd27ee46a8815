//! Bounded Store Module
//!
//! Capacity-limited key-value storage with size accounting and LRU eviction.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use tracing::debug;

use crate::cache::LruTracker;
use crate::error::{CacheError, Result};

/// Computes the size a value counts against the store's capacity.
pub type Sizer<V> = Box<dyn Fn(&V) -> usize + Send + Sync>;

struct Slot<V> {
    value: V,
    size: usize,
}

// == Bounded Store ==
/// Key-value storage bounded by a total size.
///
/// By default every value has size 1, so the capacity is an entry count.
/// When an insert would overflow, least recently used entries are evicted
/// and handed back to the caller.
pub struct BoundedStore<K: Hash + Eq + Clone, V> {
    /// Key-value storage
    entries: HashMap<K, Slot<V>>,
    /// LRU access tracker
    lru: LruTracker<K>,
    /// Sum of the sizes of stored values
    current_size: usize,
    /// Maximum total size
    max_size: usize,
    sizer: Sizer<V>,
}

impl<K: Hash + Eq + Clone, V> BoundedStore<K, V> {
    // == Constructor ==
    /// Creates a store holding at most `max_entries` values.
    pub fn new(max_entries: usize) -> Self {
        Self::with_sizer(max_entries, |_| 1)
    }

    /// Creates a store whose values are measured by `sizer`.
    pub fn with_sizer(
        max_size: usize,
        sizer: impl Fn(&V) -> usize + Send + Sync + 'static,
    ) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            current_size: 0,
            max_size,
            sizer: Box::new(sizer),
        }
    }

    // == Insert ==
    /// Stores a value, evicting least recently used entries to make room.
    ///
    /// Returns the evicted pairs. Fails with [`CacheError::TooLarge`] if the
    /// value alone exceeds the capacity; the store is left unchanged then.
    pub fn insert(&mut self, key: K, value: V) -> Result<Vec<(K, V)>> {
        let size = (self.sizer)(&value);
        if size > self.max_size {
            return Err(CacheError::TooLarge {
                size,
                capacity: self.max_size,
            });
        }

        // Overwrite frees the old slot first
        self.remove(&key);

        let mut evicted = Vec::new();
        while self.current_size + size > self.max_size {
            match self.pop_oldest() {
                Some(pair) => evicted.push(pair),
                None => break,
            }
        }
        if !evicted.is_empty() {
            debug!(count = evicted.len(), "evicted entries to make room");
        }

        self.lru.touch(&key);
        self.entries.insert(key, Slot { value, size });
        self.current_size += size;

        Ok(evicted)
    }

    // == Get ==
    /// Looks up a value and marks it as recently used.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let slot = self.entries.get(key)?;
        self.lru.touch(key);
        Some(&slot.value)
    }

    /// Looks up a value without touching the LRU order.
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.entries.get(key).map(|slot| &slot.value)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Size the stored value for `key` counts against capacity.
    pub fn size_of(&self, key: &K) -> Option<usize> {
        self.entries.get(key).map(|slot| slot.size)
    }

    // == Remove ==
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let slot = self.entries.remove(key)?;
        self.lru.remove(key);
        self.current_size -= slot.size;
        Some(slot.value)
    }

    // == Pop Oldest ==
    /// Removes the least recently used entry.
    pub fn pop_oldest(&mut self) -> Option<(K, V)> {
        while let Some(key) = self.lru.evict_oldest() {
            if let Some(slot) = self.entries.remove(&key) {
                self.current_size -= slot.size;
                return Some((key, slot.value));
            }
        }
        None
    }

    /// Iterates in eviction order, least recently used first.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.lru
            .iter()
            .filter_map(|key| self.entries.get(key).map(|slot| (key, &slot.value)))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn current_size(&self) -> usize {
        self.current_size
    }

    pub fn capacity(&self) -> usize {
        self.max_size
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.lru.clear();
        self.current_size = 0;
    }
}

impl<K: Hash + Eq + Clone, V> fmt::Debug for BoundedStore<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedStore")
            .field("len", &self.entries.len())
            .field("current_size", &self.current_size)
            .field("max_size", &self.max_size)
            .finish_non_exhaustive()
    }
}
