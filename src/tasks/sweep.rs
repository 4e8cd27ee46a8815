//! Expiration Sweep Task
//!
//! Background task that periodically moves expired entries into the
//! stale store, so fallback values are captured even when nobody reads
//! the cache.

use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::TtlCache;
use crate::clock::Timer;

/// Spawns a background task that periodically sweeps a shared cache.
///
/// The task runs in an infinite loop, sleeping for `interval` between
/// sweeps. The cache lock is held only for the sweep itself.
///
/// Returns a JoinHandle that can be used to abort the task during shutdown.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(Mutex::new(TtlCache::new(1000, Duration::from_secs(300))));
/// let sweep_handle = spawn_sweep_task(cache.clone(), Duration::from_secs(1));
/// // Later, during shutdown:
/// sweep_handle.abort();
/// ```
pub fn spawn_sweep_task<K, V, T>(
    cache: Arc<Mutex<TtlCache<K, V, T>>>,
    interval: Duration,
) -> JoinHandle<()>
where
    K: Hash + Eq + Clone + Send + 'static,
    V: Send + 'static,
    T: Timer + 'static,
{
    tokio::spawn(async move {
        info!(?interval, "Starting expiration sweep task");

        loop {
            tokio::time::sleep(interval).await;

            let expired = cache.lock().expire().len();

            if expired > 0 {
                info!("Expiration sweep: moved {} entries to stale store", expired);
            } else {
                debug!("Expiration sweep: no expired entries found");
            }
        }
    })
}
