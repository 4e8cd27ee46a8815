//! Clock Module
//!
//! Pluggable time sources for expiration bookkeeping. Timestamps are
//! milliseconds; only differences between readings of one timer matter.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

// == Timer ==
/// A source of millisecond timestamps.
pub trait Timer: Send + Sync {
    /// Returns the current timestamp in milliseconds.
    fn now(&self) -> u64;
}

// == Monotonic Clock ==
/// Milliseconds elapsed since the clock was created. The default timer.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer for MonotonicClock {
    fn now(&self) -> u64 {
        duration_ms(self.origin.elapsed())
    }
}

// == Wall Clock ==
/// Unix time in milliseconds. Can jump when the system clock is adjusted.
#[derive(Debug, Clone, Copy, Default)]
pub struct WallClock;

impl Timer for WallClock {
    fn now(&self) -> u64 {
        u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
    }
}

// == Manual Clock ==
/// A clock that only moves when told to.
///
/// Clones share the same time, so a test can keep one handle and give
/// another to the cache.
///
/// ```
/// use std::time::Duration;
/// use nye_cache::clock::{ManualClock, Timer};
///
/// let clock = ManualClock::new();
/// let handle = clock.clone();
/// handle.advance(Duration::from_secs(2));
/// assert_eq!(clock.now(), 2_000);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    millis: Arc<AtomicU64>,
}

impl ManualClock {
    /// Creates a clock reading zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves time forward, saturating at `u64::MAX`.
    pub fn advance(&self, by: Duration) {
        let by = duration_ms(by);
        let _ = self
            .millis
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |now| {
                Some(now.saturating_add(by))
            });
    }

    /// Sets the absolute reading.
    pub fn set(&self, millis: u64) {
        self.millis.store(millis, Ordering::SeqCst);
    }
}

impl Timer for ManualClock {
    fn now(&self) -> u64 {
        self.millis.load(Ordering::SeqCst)
    }
}

// == Utility Functions ==
/// Converts a duration to whole milliseconds, saturating at `u64::MAX`.
pub fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
