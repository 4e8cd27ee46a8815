//! Cache Module
//!
//! Provides a TTL cache that remembers expired values, the bounded store it
//! is built on, and the [`Cache`] mapping contract the memoizer works with.

mod lru;
mod stats;
mod store;
mod ttl;
mod ttl_index;


use std::collections::HashMap;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{CacheError, Result};

// Re-export public types
pub use self::lru::LruTracker;
pub use stats::{CacheInfo, Stats};
pub use store::{BoundedStore, Sizer};
pub use ttl::TtlCache;
pub use ttl_index::TtlIndex;

// == Cache Contract ==
/// The mapping contract a memoized function stores its results in.
///
/// Methods take `&mut self` because lookups may sweep expired entries or
/// update recency.
pub trait Cache {
    type Key;
    type Value: Clone;

    /// Returns a live value or [`CacheError::NotFound`].
    fn get(&mut self, key: &Self::Key) -> Result<Self::Value>;

    /// Stores a value. May fail with [`CacheError::TooLarge`].
    fn set(&mut self, key: Self::Key, value: Self::Value) -> Result<()>;

    fn delete(&mut self, key: &Self::Key) -> Result<Self::Value>;

    fn clear(&mut self);

    /// Number of live entries.
    fn len(&mut self) -> usize;

    fn is_empty(&mut self) -> bool {
        self.len() == 0
    }

    /// Maximum size, or None for an unbounded mapping.
    fn capacity(&self) -> Option<usize>;

    /// Size currently used against the capacity.
    fn current_size(&mut self) -> usize;

    /// Stores `value` only if no live value exists; returns whichever is kept.
    fn set_default(&mut self, key: Self::Key, value: Self::Value) -> Result<Self::Value> {
        match self.get(&key) {
            Ok(existing) => Ok(existing),
            Err(_) => {
                self.set(key, value.clone())?;
                Ok(value)
            }
        }
    }

    /// Returns a value that has expired out of the cache, if one is kept.
    ///
    /// Caches without stale support always answer [`CacheError::NotFound`].
    fn get_possibly_stale(&mut self, _key: &Self::Key) -> Result<Self::Value> {
        Err(CacheError::NotFound)
    }
}

impl<K, V> Cache for BoundedStore<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    type Key = K;
    type Value = V;

    fn get(&mut self, key: &K) -> Result<V> {
        BoundedStore::get(self, key).cloned().ok_or(CacheError::NotFound)
    }

    fn set(&mut self, key: K, value: V) -> Result<()> {
        self.insert(key, value).map(drop)
    }

    fn delete(&mut self, key: &K) -> Result<V> {
        self.remove(key).ok_or(CacheError::NotFound)
    }

    fn clear(&mut self) {
        BoundedStore::clear(self);
    }

    fn len(&mut self) -> usize {
        BoundedStore::len(self)
    }

    fn capacity(&self) -> Option<usize> {
        Some(BoundedStore::capacity(self))
    }

    fn current_size(&mut self) -> usize {
        BoundedStore::current_size(self)
    }
}

/// An unbounded mapping; never evicts, reports no capacity.
impl<K, V> Cache for HashMap<K, V>
where
    K: Hash + Eq,
    V: Clone,
{
    type Key = K;
    type Value = V;

    fn get(&mut self, key: &K) -> Result<V> {
        HashMap::get(self, key).cloned().ok_or(CacheError::NotFound)
    }

    fn set(&mut self, key: K, value: V) -> Result<()> {
        self.insert(key, value);
        Ok(())
    }

    fn delete(&mut self, key: &K) -> Result<V> {
        self.remove(key).ok_or(CacheError::NotFound)
    }

    fn clear(&mut self) {
        HashMap::clear(self);
    }

    fn len(&mut self) -> usize {
        HashMap::len(self)
    }

    fn capacity(&self) -> Option<usize> {
        None
    }

    fn current_size(&mut self) -> usize {
        HashMap::len(self)
    }
}

// == No Cache ==
/// A cache that stores nothing. Every lookup misses.
#[derive(Debug)]
pub struct NoCache<K, V> {
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V> NoCache<K, V> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<K, V> Default for NoCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V: Clone> Cache for NoCache<K, V> {
    type Key = K;
    type Value = V;

    fn get(&mut self, _key: &K) -> Result<V> {
        Err(CacheError::NotFound)
    }

    fn set(&mut self, _key: K, _value: V) -> Result<()> {
        Ok(())
    }

    fn delete(&mut self, _key: &K) -> Result<V> {
        Err(CacheError::NotFound)
    }

    fn clear(&mut self) {}

    fn len(&mut self) -> usize {
        0
    }

    fn capacity(&self) -> Option<usize> {
        Some(0)
    }

    fn current_size(&mut self) -> usize {
        0
    }
}

// == Shared Cache ==
/// A cache shared between owners, e.g. a memoized function and a
/// background sweep task. Every call locks the inner cache.
impl<C: Cache> Cache for Arc<Mutex<C>> {
    type Key = C::Key;
    type Value = C::Value;

    fn get(&mut self, key: &C::Key) -> Result<C::Value> {
        self.lock().get(key)
    }

    fn set(&mut self, key: C::Key, value: C::Value) -> Result<()> {
        self.lock().set(key, value)
    }

    fn delete(&mut self, key: &C::Key) -> Result<C::Value> {
        self.lock().delete(key)
    }

    fn clear(&mut self) {
        self.lock().clear();
    }

    fn len(&mut self) -> usize {
        self.lock().len()
    }

    fn capacity(&self) -> Option<usize> {
        self.lock().capacity()
    }

    fn current_size(&mut self) -> usize {
        self.lock().current_size()
    }

    // Lookup and insert happen under one lock acquisition
    fn set_default(&mut self, key: C::Key, value: C::Value) -> Result<C::Value> {
        self.lock().set_default(key, value)
    }

    fn get_possibly_stale(&mut self, key: &C::Key) -> Result<C::Value> {
        self.lock().get_possibly_stale(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_default_keeps_existing_value() {
        let mut cache: HashMap<&str, u32> = HashMap::new();

        assert_eq!(cache.set_default("k", 1), Ok(1));
        assert_eq!(cache.set_default("k", 2), Ok(1));
        assert_eq!(Cache::get(&mut cache, &"k"), Ok(1));
    }

    #[test]
    fn test_hash_map_has_no_capacity_or_stale_support() {
        let mut cache: HashMap<&str, u32> = HashMap::new();
        Cache::set(&mut cache, "k", 1).unwrap();

        assert_eq!(Cache::capacity(&cache), None);
        assert_eq!(Cache::current_size(&mut cache), 1);
        assert_eq!(cache.get_possibly_stale(&"k"), Err(CacheError::NotFound));
    }

    #[test]
    fn test_bounded_store_as_cache() {
        let mut cache: BoundedStore<&str, u32> = BoundedStore::new(1);
        Cache::set(&mut cache, "a", 1).unwrap();
        Cache::set(&mut cache, "b", 2).unwrap();

        assert_eq!(Cache::get(&mut cache, &"a"), Err(CacheError::NotFound));
        assert_eq!(Cache::get(&mut cache, &"b"), Ok(2));
        assert_eq!(Cache::capacity(&cache), Some(1));
        assert_eq!(Cache::delete(&mut cache, &"b"), Ok(2));
        assert!(Cache::is_empty(&mut cache));
    }

    #[test]
    fn test_no_cache_always_misses() {
        let mut cache: NoCache<u8, u8> = NoCache::new();
        cache.set(1, 1).unwrap();

        assert_eq!(cache.get(&1), Err(CacheError::NotFound));
        assert_eq!(cache.capacity(), Some(0));
        assert_eq!(cache.current_size(), 0);
    }

    #[test]
    fn test_shared_cache_sees_same_entries() {
        let inner: HashMap<&str, u32> = HashMap::new();
        let mut first = Arc::new(Mutex::new(inner));
        let mut second = Arc::clone(&first);

        first.set("k", 7).unwrap();
        assert_eq!(second.get(&"k"), Ok(7));
        assert_eq!(second.len(), 1);
    }
}
