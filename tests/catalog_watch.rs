use image::{ImageBuffer, Rgb};
use photoframe::catalog::{Catalog, CatalogWatcher};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn write_image(path: &Path) {
    ImageBuffer::from_fn(16, 16, |_, _| Rgb([200u8, 100, 50]))
        .save(path)
        .unwrap();
}

/// Write a complete image under the root's hidden staging directory, then move
/// it into place so no scan ever sees a half-written file.
fn land_image(root: &Path, relative: &str) {
    let staging = root.join(".staging");
    std::fs::create_dir_all(&staging).unwrap();
    let staged = staging.join(relative.replace('/', "_"));
    write_image(&staged);
    std::fs::rename(&staged, root.join(relative)).unwrap();
}

async fn wait_for_count(catalog: &Catalog, expected: usize) -> bool {
    for _ in 0..100 {
        if catalog.snapshot().await.len() == expected {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_watcher_picks_up_added_and_removed_images() {
    let temp_dir = TempDir::new().unwrap();
    let catalog = Arc::new(Catalog::new(temp_dir.path().to_path_buf()));

    // The album exists before the watch starts so its inner watch is in place
    let album = temp_dir.path().join("Garden");
    std::fs::create_dir(&album).unwrap();

    let watcher = CatalogWatcher::start(catalog.clone()).unwrap();
    assert!(watcher.is_running());
    catalog.refresh().await;
    assert!(catalog.snapshot().await.is_empty());

    land_image(temp_dir.path(), "Garden/rose.jpg");

    assert!(wait_for_count(&catalog, 1).await, "new image was not picked up");
    let snapshot = catalog.snapshot().await;
    assert_eq!(snapshot.images()[0].album.as_deref(), Some("Garden"));

    std::fs::remove_file(album.join("rose.jpg")).unwrap();
    assert!(wait_for_count(&catalog, 0).await, "removed image is still listed");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_burst_of_files_settles_on_complete_catalog() {
    let temp_dir = TempDir::new().unwrap();
    let catalog = Arc::new(Catalog::new(temp_dir.path().to_path_buf()));

    let _watcher = CatalogWatcher::start(catalog.clone()).unwrap();
    catalog.refresh().await;

    for i in 0..10 {
        land_image(temp_dir.path(), &format!("burst_{}.png", i));
    }

    assert!(wait_for_count(&catalog, 10).await, "catalog did not settle");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_changes_during_initial_scan_are_not_lost() {
    let temp_dir = TempDir::new().unwrap();
    for i in 0..20 {
        write_image(&temp_dir.path().join(format!("existing_{}.jpg", i)));
    }
    let catalog = Arc::new(Catalog::new(temp_dir.path().to_path_buf()));

    let _watcher = CatalogWatcher::start(catalog.clone()).unwrap();

    // Land a file while the initial scan may still be walking the directory
    let root = temp_dir.path().to_path_buf();
    let landing = tokio::task::spawn_blocking(move || land_image(&root, "late.jpg"));
    catalog.refresh().await;
    landing.await.unwrap();

    assert!(wait_for_count(&catalog, 21).await, "file landed during the scan was missed");
}

#[tokio::test]
async fn test_watch_fails_for_missing_root() {
    let temp_dir = TempDir::new().unwrap();
    let catalog = Arc::new(Catalog::new(temp_dir.path().join("missing")));

    assert!(CatalogWatcher::start(catalog).is_err());
}
