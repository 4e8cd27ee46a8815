//! TTL Cache Module
//!
//! Main cache engine combining the bounded store with TTL expiration and a
//! stale shadow store that remembers the last value of expired keys.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::time::Duration;

use tracing::debug;

use crate::cache::{BoundedStore, Cache, TtlIndex};
use crate::clock::{duration_ms, MonotonicClock, Timer};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};

// == TTL Cache ==
/// Cache whose entries expire a fixed time after they were set.
///
/// Expired values are not dropped: they move to a stale shadow store
/// where [`get_possibly_stale`](Self::get_possibly_stale) can still reach
/// them, until the key is set again. Entries removed by [`delete`](Self::delete)
/// or by capacity eviction are not shadowed.
///
/// Expiration is lazy. Operations that read or write content sweep expired
/// entries into the shadow store first; [`len`](Self::len) and
/// [`current_size`](Self::current_size) only trim the index.
///
/// ```
/// use std::time::Duration;
/// use nye_cache::cache::TtlCache;
/// use nye_cache::clock::ManualClock;
///
/// let clock = ManualClock::new();
/// let mut cache = TtlCache::with_timer(10, Duration::from_secs(2), clock.clone());
///
/// cache.set("rate", 1.25).unwrap();
/// assert_eq!(cache.get(&"rate"), Ok(&1.25));
///
/// clock.advance(Duration::from_secs(2));
/// assert!(cache.get(&"rate").is_err());
/// assert_eq!(cache.get_possibly_stale(&"rate"), Ok(&1.25));
/// ```
pub struct TtlCache<K: Hash + Eq + Clone, V, T = MonotonicClock> {
    /// Live entries
    store: BoundedStore<K, V>,
    /// Expiration order of the store's keys
    index: TtlIndex<K>,
    /// Last value of keys that expired
    stale: HashMap<K, V>,
    ttl: Duration,
    timer: T,
}

impl<K: Hash + Eq + Clone, V> TtlCache<K, V, MonotonicClock> {
    // == Constructor ==
    /// Creates a cache holding at most `max_entries` entries for `ttl` each.
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self::with_timer(max_entries, ttl, MonotonicClock::new())
    }

    /// Creates a cache from a [`CacheConfig`].
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.max_entries, config.ttl_duration())
    }
}

impl<K: Hash + Eq + Clone, V, T: Timer> TtlCache<K, V, T> {
    /// Creates a cache reading time from `timer`.
    pub fn with_timer(max_size: usize, ttl: Duration, timer: T) -> Self {
        Self {
            store: BoundedStore::new(max_size),
            index: TtlIndex::new(),
            stale: HashMap::new(),
            ttl,
            timer,
        }
    }

    /// Measures values with `sizer` instead of counting entries.
    ///
    /// Replaces the backing store, so call it before inserting anything.
    pub fn with_sizer(mut self, sizer: impl Fn(&V) -> usize + Send + Sync + 'static) -> Self {
        self.store = BoundedStore::with_sizer(self.store.capacity(), sizer);
        self.index.clear();
        self
    }

    // == Get ==
    /// Retrieves a live value.
    ///
    /// Fails with [`CacheError::NotFound`] if the key is absent or expired.
    pub fn get(&mut self, key: &K) -> Result<&V> {
        self.expire();
        self.store.get(key).ok_or(CacheError::NotFound)
    }

    // == Set ==
    /// Stores a value that expires `ttl` from now.
    ///
    /// A fresh value supersedes any stale one for the same key. Fails with
    /// [`CacheError::TooLarge`] when the value cannot fit even in an empty
    /// cache; the previous entry is kept in that case.
    pub fn set(&mut self, key: K, value: V) -> Result<()> {
        let now = self.timer.now();
        self.expire_at(now);

        let evicted = self.store.insert(key.clone(), value)?;
        for (evicted_key, _) in &evicted {
            self.index.forget(evicted_key);
        }

        self.index
            .record(key.clone(), now.saturating_add(duration_ms(self.ttl)));
        self.stale.remove(&key);
        Ok(())
    }

    // == Delete ==
    /// Removes a live entry. The value is not kept as stale.
    pub fn delete(&mut self, key: &K) -> Result<V> {
        self.expire();
        let value = self.store.remove(key).ok_or(CacheError::NotFound)?;
        self.index.forget(key);
        Ok(value)
    }

    // == Get Possibly Stale ==
    /// Retrieves the value a key held when it expired.
    ///
    /// Only the shadow store is consulted: a key that is still live, was
    /// deleted, or was never set fails with [`CacheError::NotFound`].
    pub fn get_possibly_stale(&mut self, key: &K) -> Result<&V> {
        self.expire();
        self.stale.get(key).ok_or(CacheError::NotFound)
    }

    // == Pop Oldest ==
    /// Removes and returns the live entry first in eviction order.
    pub fn pop_oldest(&mut self) -> Result<(K, V)> {
        self.expire();
        let (key, value) = self.store.pop_oldest().ok_or(CacheError::Empty)?;
        self.index.forget(&key);
        Ok((key, value))
    }

    // == Expire ==
    /// Moves every expired entry into the shadow store.
    ///
    /// Returns the expired keys, oldest first.
    pub fn expire(&mut self) -> Vec<K> {
        let now = self.timer.now();
        self.expire_at(now)
    }

    fn expire_at(&mut self, now: u64) -> Vec<K> {
        let expired = self.index.sweep(now);
        for key in &expired {
            if let Some(value) = self.store.remove(key) {
                self.stale.insert(key.clone(), value);
            }
        }
        if !expired.is_empty() {
            debug!(count = expired.len(), "moved expired entries to stale store");
        }
        expired
    }

    // == Length ==
    /// Number of live entries.
    ///
    /// Trims the index without moving data, so nothing is shadowed here.
    pub fn len(&mut self) -> usize {
        let now = self.timer.now();
        self.index.trim(now);
        self.index.len()
    }

    pub fn is_empty(&mut self) -> bool {
        self.len() == 0
    }

    // == Current Size ==
    /// Summed size of live entries.
    pub fn current_size(&mut self) -> usize {
        let now = self.timer.now();
        self.index.trim(now);
        let lapsed: usize = self
            .index
            .lapsed()
            .filter_map(|key| self.store.size_of(key))
            .sum();
        self.store.current_size() - lapsed
    }

    // == Clear ==
    /// Drops every live entry. Expired entries are shadowed first and the
    /// shadow store itself is kept.
    pub fn clear(&mut self) {
        self.expire();
        self.store.clear();
        self.index.clear();
    }

    /// Drops every stale value.
    pub fn clear_stale(&mut self) {
        self.stale.clear();
    }

    /// Number of keys holding a stale value.
    pub fn stale_len(&self) -> usize {
        self.stale.len()
    }

    pub fn capacity(&self) -> usize {
        self.store.capacity()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }
}

impl<K: Hash + Eq + Clone, V, T: Timer> fmt::Debug for TtlCache<K, V, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TtlCache")
            .field("ttl", &self.ttl)
            .field("capacity", &self.store.capacity())
            .field("live", &self.index.unexpired(self.timer.now()))
            .field("stale", &self.stale.len())
            .finish_non_exhaustive()
    }
}

impl<K, V, T> Cache for TtlCache<K, V, T>
where
    K: Hash + Eq + Clone,
    V: Clone,
    T: Timer,
{
    type Key = K;
    type Value = V;

    fn get(&mut self, key: &K) -> Result<V> {
        TtlCache::get(self, key).cloned()
    }

    fn set(&mut self, key: K, value: V) -> Result<()> {
        TtlCache::set(self, key, value)
    }

    fn delete(&mut self, key: &K) -> Result<V> {
        TtlCache::delete(self, key)
    }

    fn clear(&mut self) {
        TtlCache::clear(self);
    }

    fn len(&mut self) -> usize {
        TtlCache::len(self)
    }

    fn capacity(&self) -> Option<usize> {
        Some(TtlCache::capacity(self))
    }

    fn current_size(&mut self) -> usize {
        TtlCache::current_size(self)
    }

    fn get_possibly_stale(&mut self, key: &K) -> Result<V> {
        TtlCache::get_possibly_stale(self, key).cloned()
    }
}
