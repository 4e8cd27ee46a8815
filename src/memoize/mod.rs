//! Memoize Module
//!
//! Wraps a fallible computation with a cache. Successful results are
//! remembered; when the computation fails with a matching error, the last
//! value that expired out of the cache is served instead.

pub mod keys;

use std::fmt;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::cache::{Cache, CacheInfo, NoCache, Stats};

/// Derives a cache key from call arguments.
pub type KeyFn<A, K> = Box<dyn Fn(&A) -> K + Send + Sync>;

/// Decides whether an error may be answered with a stale value.
pub type ErrorMatcher<E> = Box<dyn Fn(&E) -> bool + Send + Sync>;

fn match_any<E>(_err: &E) -> bool {
    true
}

// == Memo State ==
/// Cache and counters, guarded together.
struct MemoState<C> {
    cache: C,
    stats: Stats,
}

impl<C: Cache> MemoState<C> {
    /// Looks the key up and counts the outcome.
    fn lookup(&mut self, key: &C::Key) -> Option<C::Value> {
        match self.cache.get(key) {
            Ok(value) => {
                self.stats.record_hit();
                Some(value)
            }
            Err(_) => {
                self.stats.record_miss();
                None
            }
        }
    }
}

// == Memoized ==
/// A memoized computation.
///
/// Calls with equal keys are answered from the cache while the cached
/// value lives. When the computation fails with an error accepted by
/// [`fallback_on`](Self::fallback_on), the cache's stale value for the key
/// is returned instead; otherwise the error is returned untouched.
///
/// [`call`](Self::call) takes `&self` and may be used from many threads:
/// cache access and counters are serialized by a mutex that is never held
/// while the computation runs. [`call_mut`](Self::call_mut) is the
/// unsynchronized variant for an exclusively owned wrapper.
///
/// ```
/// use std::time::Duration;
/// use nye_cache::cache::TtlCache;
/// use nye_cache::clock::ManualClock;
/// use nye_cache::memoize::Memoized;
///
/// let clock = ManualClock::new();
/// let cache: TtlCache<(u32, u32), u32, ManualClock> =
///     TtlCache::with_timer(64, Duration::from_secs(2), clock.clone());
/// let rate = Memoized::new(
///     |&(from, to): &(u32, u32)| {
///         if from == 0 { Err("upstream down") } else { Ok(from * to) }
///     },
///     cache,
/// );
///
/// assert_eq!(rate.call(&(3, 4)), Ok(12));
/// assert_eq!(rate.call(&(0, 1)), Err("upstream down"));
/// ```
pub struct Memoized<A, C: Cache, E, F> {
    func: F,
    key_fn: KeyFn<A, C::Key>,
    fallback: ErrorMatcher<E>,
    state: Mutex<MemoState<C>>,
    info: bool,
    name: &'static str,
}

impl<A, V, E, F> Memoized<A, NoCache<A, V>, E, F>
where
    A: Clone + 'static,
    V: Clone,
    E: 'static,
    F: Fn(&A) -> Result<V, E>,
{
    /// Wraps `func` without a cache: every call runs it and counts a miss.
    pub fn passthrough(func: F) -> Self {
        Self::new(func, NoCache::new())
    }
}

impl<A, C, E, F> Memoized<A, C, E, F>
where
    A: 'static,
    C: Cache,
    C::Key: 'static,
    E: 'static,
    F: Fn(&A) -> Result<C::Value, E>,
{
    // == Constructor ==
    /// Wraps `func`, keying the cache by the arguments themselves.
    ///
    /// Every error is eligible for the stale fallback until narrowed with
    /// [`fallback_on`](Self::fallback_on).
    pub fn new(func: F, cache: C) -> Self
    where
        A: Clone + Into<C::Key>,
    {
        Self {
            func,
            key_fn: Box::new(keys::args_key::<A, C::Key>),
            fallback: Box::new(match_any::<E>),
            state: Mutex::new(MemoState {
                cache,
                stats: Stats::new(),
            }),
            info: false,
            name: "memoized",
        }
    }

    /// Replaces the key function.
    pub fn with_key(mut self, key_fn: impl Fn(&A) -> C::Key + Send + Sync + 'static) -> Self {
        self.key_fn = Box::new(key_fn);
        self
    }

    /// Restricts the stale fallback to errors accepted by `matcher`.
    pub fn fallback_on(mut self, matcher: impl Fn(&E) -> bool + Send + Sync + 'static) -> Self {
        self.fallback = Box::new(matcher);
        self
    }

    /// Enables [`cache_info`](Self::cache_info).
    pub fn with_info(mut self) -> Self {
        self.info = true;
        self
    }

    /// Name used in log events.
    pub fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }
}

impl<A, C, E, F> Memoized<A, C, E, F>
where
    C: Cache,
    F: Fn(&A) -> Result<C::Value, E>,
{
    // == Call ==
    /// Runs the memoized computation, safe for concurrent callers.
    ///
    /// If two callers miss on the same key at once, the first result stored
    /// stays cached; each caller still gets the value it computed.
    pub fn call(&self, args: &A) -> Result<C::Value, E> {
        let key = (self.key_fn)(args);
        if let Some(value) = self.state.lock().lookup(&key) {
            return Ok(value);
        }

        match (self.func)(args) {
            Ok(value) => {
                // In case of a race, keep the item already in the cache
                if let Err(err) = self.state.lock().cache.set_default(key, value.clone()) {
                    debug!(function = self.name, %err, "result not cached");
                }
                Ok(value)
            }
            Err(err) => recover(self.name, &*self.fallback, err, || {
                self.state.lock().cache.get_possibly_stale(&key)
            }),
        }
    }

    // == Call Mut ==
    /// Runs the memoized computation through an exclusive borrow.
    pub fn call_mut(&mut self, args: &A) -> Result<C::Value, E> {
        let key = (self.key_fn)(args);
        let state = self.state.get_mut();
        if let Some(value) = state.lookup(&key) {
            return Ok(value);
        }

        match (self.func)(args) {
            Ok(value) => {
                if let Err(err) = state.cache.set(key, value.clone()) {
                    debug!(function = self.name, %err, "result not cached");
                }
                Ok(value)
            }
            Err(err) => recover(self.name, &*self.fallback, err, || {
                state.cache.get_possibly_stale(&key)
            }),
        }
    }

    // == Cache Info ==
    /// Hit/miss counters and cache size, if enabled with
    /// [`with_info`](Self::with_info).
    pub fn cache_info(&self) -> Option<CacheInfo> {
        if !self.info {
            return None;
        }
        let mut state = self.state.lock();
        Some(CacheInfo {
            hits: state.stats.hits,
            misses: state.stats.misses,
            capacity: state.cache.capacity(),
            current_size: state.cache.current_size(),
        })
    }

    // == Cache Clear ==
    /// Empties the cache and zeroes the counters.
    pub fn cache_clear(&self) {
        let mut state = self.state.lock();
        state.cache.clear();
        state.stats.reset();
    }

    /// The key a call with `args` would use.
    pub fn cache_key(&self, args: &A) -> C::Key {
        (self.key_fn)(args)
    }

    /// Runs `f` with the cache locked.
    ///
    /// The lock is not reentrant: `f` must not call back into this wrapper
    /// (`call`, `cache_info`, ...) or it deadlocks. Formatting the wrapper
    /// with `{:?}` is safe and shows the counters as locked.
    pub fn with_cache<R>(&self, f: impl FnOnce(&mut C) -> R) -> R {
        f(&mut self.state.lock().cache)
    }
}

impl<A, C: Cache, E, F> fmt::Debug for Memoized<A, C, E, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("Memoized");
        out.field("name", &self.name).field("info", &self.info);
        // May run inside `with_cache`, where the lock is already held
        match self.state.try_lock() {
            Some(state) => out.field("stats", &state.stats),
            None => out.field("stats", &format_args!("<locked>")),
        };
        out.finish_non_exhaustive()
    }
}

// == Stale Fallback ==
/// Answers a failed computation with a stale value when the error matches.
///
/// The original error is returned unchanged when it does not match or no
/// stale value exists.
fn recover<V, E>(
    name: &'static str,
    matcher: &(dyn Fn(&E) -> bool + Send + Sync),
    err: E,
    stale: impl FnOnce() -> crate::error::Result<V>,
) -> Result<V, E> {
    if !matcher(&err) {
        return Err(err);
    }

    warn!(function = name, "computation failed, trying stale value");
    match stale() {
        Ok(value) => {
            info!(function = name, "serving stale value");
            Ok(value)
        }
        Err(_) => Err(err),
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::collections::HashMap;

    use super::*;
    use crate::cache::BoundedStore;

    #[derive(Debug, PartialEq)]
    enum FetchError {
        Timeout,
        Fatal,
    }

    #[test]
    fn test_call_mut_hits_after_first_miss() {
        let calls = Cell::new(0);
        let mut add = Memoized::new(
            |&(a, b): &(u32, u32)| {
                calls.set(calls.get() + 1);
                Ok::<_, FetchError>(a + b)
            },
            HashMap::<(u32, u32), u32>::new(),
        )
        .with_info();

        assert_eq!(add.call_mut(&(1, 2)), Ok(3));
        assert_eq!(add.call_mut(&(1, 2)), Ok(3));
        assert_eq!(add.call_mut(&(3, 4)), Ok(7));

        let info = add.cache_info().unwrap();
        assert_eq!((info.hits, info.misses), (1, 2));
        assert_eq!(info.capacity, None);
        assert_eq!(info.current_size, 2);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_info_disabled_by_default() {
        let memo = Memoized::new(|&x: &u8| Ok::<_, FetchError>(x), HashMap::<u8, u8>::new());
        memo.call(&1).unwrap();
        assert_eq!(memo.cache_info(), None);
    }

    #[test]
    fn test_errors_are_not_cached() {
        let calls = Cell::new(0);
        let mut memo = Memoized::new(
            |_: &u8| {
                calls.set(calls.get() + 1);
                Err::<u8, _>(FetchError::Fatal)
            },
            HashMap::<u8, u8>::new(),
        );

        assert_eq!(memo.call_mut(&1), Err(FetchError::Fatal));
        assert_eq!(memo.call_mut(&1), Err(FetchError::Fatal));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_cache_without_stale_support_propagates_error() {
        let mut memo = Memoized::new(
            |_: &u8| Err::<u8, _>(FetchError::Timeout),
            HashMap::<u8, u8>::new(),
        );
        assert_eq!(memo.call_mut(&1), Err(FetchError::Timeout));
    }

    #[test]
    fn test_too_large_result_is_returned_uncached() {
        let store: BoundedStore<String, String> = BoundedStore::with_sizer(3, |v: &String| v.len());
        let memo =
            Memoized::new(|s: &String| Ok::<_, FetchError>(s.repeat(2)), store).with_info();

        assert_eq!(memo.call(&"ab".to_string()), Ok("abab".to_string()));
        assert_eq!(memo.call(&"ab".to_string()), Ok("abab".to_string()));
        let info = memo.cache_info().unwrap();
        assert_eq!((info.hits, info.misses, info.current_size), (0, 2, 0));
    }

    #[test]
    fn test_passthrough_counts_every_call_as_miss() {
        let mut memo = Memoized::passthrough(|&x: &u32| Ok::<_, FetchError>(x * 2)).with_info();

        assert_eq!(memo.call_mut(&2), Ok(4));
        assert_eq!(memo.call(&2), Ok(4));

        let info = memo.cache_info().unwrap();
        assert_eq!(info.hits, 0);
        assert_eq!(info.misses, 2);
        assert_eq!(info.capacity, Some(0));
        assert_eq!(info.current_size, 0);
    }

    #[test]
    fn test_cache_clear_resets_counters_and_entries() {
        let memo = Memoized::new(|&x: &u32| Ok::<_, FetchError>(x), HashMap::<u32, u32>::new())
            .with_info();
        memo.call(&1).unwrap();
        memo.call(&1).unwrap();

        memo.cache_clear();

        let info = memo.cache_info().unwrap();
        assert_eq!((info.hits, info.misses, info.current_size), (0, 0, 0));
    }

    #[test]
    fn test_custom_key_function() {
        let cache = HashMap::<String, usize>::new();
        let memo = Memoized::new(|s: &String| Ok::<_, FetchError>(s.len()), cache)
            .with_key(|s: &String| s.to_lowercase());

        assert_eq!(memo.cache_key(&"ABC".to_string()), "abc");
        memo.call(&"abc".to_string()).unwrap();
        assert_eq!(memo.with_cache(|c| c.len()), 1);
        memo.call(&"ABC".to_string()).unwrap();
        assert_eq!(memo.with_cache(|c| c.len()), 1);
    }

    #[test]
    fn test_debug_shows_counters() {
        let memo = Memoized::new(|&x: &u32| Ok::<_, FetchError>(x), HashMap::<u32, u32>::new())
            .named("ident");
        memo.call(&1).unwrap();

        let rendered = format!("{memo:?}");
        assert!(rendered.contains("ident"));
        assert!(rendered.contains("misses: 1"));
    }

    #[test]
    fn test_debug_inside_with_cache_does_not_block() {
        let memo = Memoized::new(|&x: &u32| Ok::<_, FetchError>(x), HashMap::<u32, u32>::new())
            .named("ident");
        memo.call(&1).unwrap();

        let rendered = memo.with_cache(|_| format!("{memo:?}"));
        assert!(rendered.contains("ident"));
        assert!(rendered.contains("<locked>"));

        // Lock released again afterwards
        assert!(format!("{memo:?}").contains("misses: 1"));
    }
}
