//! NYE Cache - a "not yet expired" memoization cache
//!
//! Memoizes fallible computations in a TTL cache. Values that expire are
//! kept aside as stale, and served when the computation later fails.

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod memoize;
pub mod tasks;

pub use cache::{BoundedStore, Cache, CacheInfo, NoCache, TtlCache};
pub use clock::{ManualClock, MonotonicClock, Timer, WallClock};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
pub use memoize::Memoized;
pub use tasks::spawn_sweep_task;
