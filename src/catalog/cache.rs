use super::CatalogSnapshot;
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use tokio::sync::RwLock;
use tracing::debug;

/// Holds the currently published snapshot. Readers get an `Arc` to a complete
/// snapshot; the lock is only held for the pointer swap or clone.
pub struct CatalogCache {
    current: RwLock<Arc<CatalogSnapshot>>,
    generation: AtomicU64,
}

impl CatalogCache {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(CatalogSnapshot::empty())),
            generation: AtomicU64::new(0),
        }
    }

    pub async fn get(&self) -> Arc<CatalogSnapshot> {
        self.current.read().await.clone()
    }

    pub async fn replace(&self, snapshot: CatalogSnapshot) {
        let count = snapshot.len();
        let snapshot = Arc::new(snapshot);

        let mut current = self.current.write().await;
        *current = snapshot;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        drop(current);

        debug!("Published catalog generation {} ({} images)", generation, count);
    }

    /// Number of snapshots published so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}

impl Default for CatalogCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ImageRecord;

    fn records(prefix: &str, count: usize) -> Vec<ImageRecord> {
        (0..count)
            .map(|i| ImageRecord {
                url: format!("/photos/{}_{}.jpg", prefix, i),
                width: 10,
                height: 10,
                album: None,
                captured_at: None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_initial_snapshot_is_empty() {
        let cache = CatalogCache::new();
        let snapshot = cache.get().await;
        assert!(snapshot.is_empty());
        assert!(snapshot.completed_at().is_none());
        assert_eq!(cache.generation(), 0);
    }

    #[tokio::test]
    async fn test_replace_publishes_new_snapshot() {
        let cache = CatalogCache::new();
        let before = cache.get().await;

        cache.replace(CatalogSnapshot::new(records("new", 3))).await;

        // Readers holding the old snapshot keep seeing it unchanged.
        assert!(before.is_empty());
        assert_eq!(cache.get().await.len(), 3);
        assert_eq!(cache.generation(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_readers_never_see_a_mix() {
        let cache = Arc::new(CatalogCache::new());
        cache.replace(CatalogSnapshot::new(records("old", 50))).await;

        let mut readers = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            readers.push(tokio::spawn(async move {
                for _ in 0..500 {
                    let snapshot = cache.get().await;
                    let old = snapshot.images().iter().filter(|r| r.url.contains("old_")).count();
                    let new = snapshot.images().iter().filter(|r| r.url.contains("new_")).count();
                    assert!(
                        (old == 50 && new == 0) || (old == 0 && new == 80),
                        "torn snapshot: {} old, {} new",
                        old,
                        new
                    );
                    tokio::task::yield_now().await;
                }
            }));
        }

        cache.replace(CatalogSnapshot::new(records("new", 80))).await;

        for reader in readers {
            reader.await.unwrap();
        }
        assert_eq!(cache.get().await.len(), 80);
    }
}
