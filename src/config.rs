//! Configuration Module
//!
//! Loads cache parameters from environment variables.

use std::env;
use std::time::Duration;

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of entries the cache can hold
    pub max_entries: usize,
    /// Time-to-live in seconds applied to every entry
    pub ttl: u64,
    /// Background sweep interval in seconds
    pub sweep_interval: u64,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `NYE_MAX_ENTRIES` - Maximum cache entries (default: 1000)
    /// - `NYE_TTL` - TTL in seconds (default: 300)
    /// - `NYE_SWEEP_INTERVAL` - Background sweep frequency in seconds (default: 1)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_entries: parse_var("NYE_MAX_ENTRIES").unwrap_or(defaults.max_entries),
            ttl: parse_var("NYE_TTL").unwrap_or(defaults.ttl),
            sweep_interval: parse_var("NYE_SWEEP_INTERVAL").unwrap_or(defaults.sweep_interval),
        }
    }

    /// TTL as a [`Duration`].
    pub fn ttl_duration(&self) -> Duration {
        Duration::from_secs(self.ttl)
    }

    /// Sweep interval as a [`Duration`].
    pub fn sweep_interval_duration(&self) -> Duration {
        Duration::from_secs(self.sweep_interval)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            ttl: 300,
            sweep_interval: 1,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}
