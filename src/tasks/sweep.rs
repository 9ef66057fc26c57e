//! Expiry Sweep Task
//!
//! Background task that periodically removes expired entries from every
//! category engine. Expiration stays correct without it; the sweep only
//! returns memory held by entries nobody reads again.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::manager::CacheManager;

/// Spawns a background task that calls [`CacheManager::purge_expired`]
/// every `interval_secs` seconds.
///
/// The returned handle is aborted during graceful shutdown.
///
/// # Example
/// ```ignore
/// let manager = Arc::new(CacheManager::new(CacheConfig::default()));
/// let sweep_handle = spawn_sweep_task(manager.clone(), 30);
/// // Later, during shutdown:
/// sweep_handle.abort();
/// ```
pub fn spawn_sweep_task(manager: Arc<CacheManager>, interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(interval_secs);

    tokio::spawn(async move {
        info!(interval_secs, "Starting expiry sweep task");

        loop {
            tokio::time::sleep(interval).await;

            let removed = manager.purge_expired().await;
            if removed > 0 {
                info!(removed, "Expiry sweep removed entries");
            } else {
                debug!("Expiry sweep: nothing expired");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use crate::manager::{CacheKind, Search};
    use crate::models::SearchResults;

    fn results(query: &str) -> SearchResults {
        SearchResults {
            query: query.to_string(),
            items: Vec::new(),
            total: None,
        }
    }

    #[tokio::test]
    async fn test_sweep_removes_expired_entries() {
        let manager = Arc::new(CacheManager::new(CacheConfig::default()));
        manager
            .set::<Search>("soon", results("soon"), Some(Duration::from_millis(200)))
            .await;

        let handle = spawn_sweep_task(manager.clone(), 1);
        tokio::time::sleep(Duration::from_millis(1500)).await;

        let stats = manager.get_stats().await;
        let search = &stats.categories[&CacheKind::Search];
        assert_eq!(search.size, 0);
        assert_eq!(search.expirations, 1);
        assert_eq!(search.misses, 0);

        handle.abort();
    }

    #[tokio::test]
    async fn test_sweep_preserves_live_entries() {
        let manager = Arc::new(CacheManager::new(CacheConfig::default()));
        manager
            .set::<Search>("live", results("live"), Some(Duration::from_secs(3600)))
            .await;

        let handle = spawn_sweep_task(manager.clone(), 1);
        tokio::time::sleep(Duration::from_millis(1500)).await;

        let value = manager.get::<Search>("live").await;
        assert_eq!(value.map(|r| r.query), Some("live".to_string()));

        handle.abort();
    }

    #[tokio::test]
    async fn test_sweep_task_can_be_aborted() {
        let manager = Arc::new(CacheManager::new(CacheConfig::default()));
        let handle = spawn_sweep_task(manager, 1);

        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
