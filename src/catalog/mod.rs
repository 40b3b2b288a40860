// Catalog module - image metadata cache kept in sync with the photo directory
mod cache;
mod error;
pub mod metadata;
pub mod scanner;
mod types;
pub mod watcher;

pub use cache::CatalogCache;
pub use error::{ExtractionError, ScanError, WatchError};
pub use types::*;
pub use watcher::{CatalogWatcher, ChangeKind, FsChange};

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::{error, info};

pub type SharedCatalog = Arc<Catalog>;

/// The photo root together with the snapshot most recently scanned from it.
pub struct Catalog {
    root: PathBuf,
    cache: CatalogCache,
}

impl Catalog {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            cache: CatalogCache::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn snapshot(&self) -> Arc<CatalogSnapshot> {
        self.cache.get().await
    }

    pub fn generation(&self) -> u64 {
        self.cache.generation()
    }

    /// Rescan the photo root and publish the result. A missing or unreadable
    /// root publishes an empty catalog instead of failing.
    ///
    /// Overlapping calls are not sequenced: whichever scan finishes last is
    /// the one that stays published.
    pub async fn refresh(&self) {
        let root = self.root.clone();
        let result = tokio::task::spawn_blocking(move || scanner::scan(&root))
            .await
            .map_err(ScanError::from)
            .and_then(|scan| scan);

        match result {
            Ok(snapshot) => {
                info!("Catalog refreshed: {} images", snapshot.len());
                self.cache.replace(snapshot).await;
            }
            Err(ScanError::RootMissing(path)) => {
                error!(
                    "The photo directory {:?} does not exist. Create it or update photosDir in the config.",
                    path
                );
                self.cache.replace(CatalogSnapshot::new(Vec::new())).await;
            }
            Err(e) => {
                error!("Error scanning images: {}", e);
                self.cache.replace(CatalogSnapshot::new(Vec::new())).await;
            }
        }
    }
}
