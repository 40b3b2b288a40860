use super::{SharedCatalog, WatchError};
use notify::{
    Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher,
    event::{AccessKind, AccessMode, ModifyKind, RenameMode},
};
use std::path::{Component, Path, PathBuf};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, error, info, warn};

/// Pending changes beyond this are dropped; a rescan is already queued.
const CHANGE_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsChange {
    pub kind: ChangeKind,
    pub path: PathBuf,
}

/// Keeps the filesystem watch alive. Dropping it stops the watch, which closes
/// the change channel and lets the rescan coordinator exit.
pub struct CatalogWatcher {
    _watcher: RecommendedWatcher,
    coordinator: JoinHandle<()>,
}

impl CatalogWatcher {
    /// Watch the catalog root recursively and rescan whenever an image is
    /// added or removed.
    pub fn start(catalog: SharedCatalog) -> Result<Self, WatchError> {
        let root = catalog.root().to_path_buf();
        let canonical_root = root.canonicalize().unwrap_or_else(|_| root.clone());
        let (tx, rx) = mpsc::channel(CHANGE_CHANNEL_CAPACITY);

        let watch_roots = [root.clone(), canonical_root];
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            match res {
                Ok(event) => {
                    for change in classify_event(&watch_roots, event) {
                        match tx.try_send(change) {
                            Ok(()) => {}
                            Err(mpsc::error::TrySendError::Full(change)) => {
                                debug!("Rescan already pending, dropping {:?}", change.path);
                            }
                            Err(mpsc::error::TrySendError::Closed(_)) => return,
                        }
                    }
                }
                Err(e) => error!("Watcher error: {}", e),
            }
        })
        .map_err(WatchError::Create)?;

        watcher
            .watch(&root, RecursiveMode::Recursive)
            .map_err(|source| WatchError::Watch {
                path: root.clone(),
                source,
            })?;

        info!("Watching {:?} for new and removed images", root);

        Ok(Self {
            _watcher: watcher,
            coordinator: spawn_rescan_coordinator(catalog, rx),
        })
    }

    pub fn is_running(&self) -> bool {
        !self.coordinator.is_finished()
    }
}

/// Run rescans one at a time. Changes that pile up while a scan is running are
/// folded into a single follow-up scan.
pub fn spawn_rescan_coordinator(
    catalog: SharedCatalog,
    mut changes: mpsc::Receiver<FsChange>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(change) = changes.recv().await {
            match change.kind {
                ChangeKind::Added => {
                    info!("New image detected: {:?}. Rescanning...", change.path)
                }
                ChangeKind::Removed => {
                    info!("Image removed: {:?}. Rescanning...", change.path)
                }
            }

            let mut coalesced = 0usize;
            while let Ok(extra) = changes.try_recv() {
                debug!("Coalescing change to {:?}", extra.path);
                coalesced += 1;
            }
            if coalesced > 0 {
                debug!("Coalesced {} additional changes into this rescan", coalesced);
            }

            catalog.refresh().await;
        }

        warn!("Change channel closed, rescan coordinator stopping");
    })
}

fn classify_event(roots: &[PathBuf], event: Event) -> Vec<FsChange> {
    let kind = match event.kind {
        EventKind::Create(_) => ChangeKind::Added,
        EventKind::Remove(_) => ChangeKind::Removed,
        // The old name of a rename is gone; the new one (or an unpaired
        // rename) is treated as an arrival.
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => ChangeKind::Removed,
        EventKind::Modify(ModifyKind::Name(_)) => ChangeKind::Added,
        // A copied-in file is only complete once its writer closes it.
        EventKind::Access(AccessKind::Close(AccessMode::Write)) => ChangeKind::Added,
        _ => return Vec::new(),
    };

    event
        .paths
        .into_iter()
        .filter(|path| !is_hidden_path(roots, path))
        .map(|path| FsChange { kind, path })
        .collect()
}

/// True when any component below the watched root starts with a dot.
fn is_hidden_path(roots: &[PathBuf], path: &Path) -> bool {
    let relative = roots
        .iter()
        .find_map(|root| path.strip_prefix(root).ok());

    let is_dot = |component: Component<'_>| match component {
        Component::Normal(name) => name.to_string_lossy().starts_with('.'),
        _ => false,
    };

    match relative {
        Some(relative) => relative.components().any(is_dot),
        None => path.file_name().is_some_and(|name| name.to_string_lossy().starts_with('.')),
    }
}
