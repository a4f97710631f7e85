use std::sync::Arc;

use anyhow::Result;
use tokio::sync::{broadcast, RwLock};

use crate::db::PlantStore;
use crate::models::FiberRecord;

/// SnapshotCache owns the in-memory copy of the full record snapshot that
/// the dashboards read, and notifies subscribers when it changes. The path
/// engine does not read the cache directly: every path-generation request
/// refreshes first, and the commit step re-reads the store on its own.
pub struct SnapshotCache {
    store: Arc<dyn PlantStore>,
    snapshot: RwLock<Arc<Vec<FiberRecord>>>,
    changed: broadcast::Sender<usize>,
}

impl SnapshotCache {
    pub fn new(store: Arc<dyn PlantStore>) -> Self {
        let (changed, _) = broadcast::channel(16);
        Self {
            store,
            snapshot: RwLock::new(Arc::new(Vec::new())),
            changed,
        }
    }

    /// Re-read the full snapshot from storage and notify subscribers
    pub async fn refresh(&self) -> Result<Arc<Vec<FiberRecord>>> {
        let records = Arc::new(self.store.all_records().await?);
        *self.snapshot.write().await = records.clone();
        // no receivers is fine
        let _ = self.changed.send(records.len());
        tracing::debug!("snapshot refreshed: {} records", records.len());
        Ok(records)
    }

    /// Current cached snapshot (may be stale until the next refresh)
    pub async fn snapshot(&self) -> Arc<Vec<FiberRecord>> {
        self.snapshot.read().await.clone()
    }

    /// Change notifications carrying the new record count
    pub fn subscribe(&self) -> broadcast::Receiver<usize> {
        self.changed.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::MemoryStore;
    use crate::engine::test_support::record;

    #[tokio::test]
    async fn test_refresh_replaces_snapshot() {
        let store = Arc::new(MemoryStore::seeded(vec![
            record("Alpha", "Beta", "trunk-01", "1"),
            record("Beta", "", "trunk-01", "1"),
        ]));
        let cache = SnapshotCache::new(store.clone());

        assert!(cache.snapshot().await.is_empty());
        cache.refresh().await.unwrap();
        assert_eq!(cache.snapshot().await.len(), 2);

        store
            .create_record(&record("Gamma", "", "spur-07", ""))
            .await
            .unwrap();
        // stale until refreshed
        assert_eq!(cache.snapshot().await.len(), 2);
        cache.refresh().await.unwrap();
        assert_eq!(cache.snapshot().await.len(), 3);
    }

    #[tokio::test]
    async fn test_subscribers_see_refreshes() {
        let store = Arc::new(MemoryStore::seeded(vec![record(
            "Alpha", "Beta", "trunk-01", "1",
        )]));
        let cache = SnapshotCache::new(store);

        let mut rx = cache.subscribe();
        cache.refresh().await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), 1);
    }
}
