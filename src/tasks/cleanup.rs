//! TTL Cleanup Task
//!
//! Background task that periodically removes expired cache entries, so
//! memory is reclaimed even for keys that are never read again.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::CacheManager;

/// Spawns a background task that periodically sweeps expired cache entries.
///
/// The task runs in an infinite loop, sleeping for the specified interval
/// between sweeps. It acquires a write lock on the cache for each sweep.
/// Lifecycle belongs to the application root: `SyncEngine::init` starts the
/// task and `SyncEngine::dispose` aborts it via the returned handle.
///
/// # Arguments
/// * `cache` - Shared cache to sweep
/// * `cleanup_interval_secs` - Interval in seconds between sweeps
pub fn spawn_cleanup_task<T>(
    cache: Arc<RwLock<CacheManager<T>>>,
    cleanup_interval_secs: u64,
) -> JoinHandle<()>
where
    T: Clone + Send + Sync + 'static,
{
    let interval = Duration::from_secs(cleanup_interval_secs);

    tokio::spawn(async move {
        info!(
            "Starting TTL cleanup task with interval of {} seconds",
            cleanup_interval_secs
        );

        loop {
            // Sleep for the configured interval
            tokio::time::sleep(interval).await;

            // Acquire write lock and cleanup expired entries
            let removed = {
                let mut cache_guard = cache.write().await;
                cache_guard.cleanup_expired()
            };

            // Log cleanup statistics
            if removed > 0 {
                info!("TTL cleanup: removed {} expired entries", removed);
            } else {
                debug!("TTL cleanup: no expired entries found");
            }
        }
    })
}
