use super::{CatalogSnapshot, ExtractionError, ImageRecord, ScanError, ScanReport, metadata};
use std::path::{Component, Path};
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

/// Scan `root` and build a complete snapshot. Per-file failures are logged and
/// left out of the snapshot.
pub fn scan(root: &Path) -> Result<CatalogSnapshot, ScanError> {
    scan_report(root).map(|report| report.snapshot)
}

/// Like [`scan`], but also hands back the files that could not be read.
pub fn scan_report(root: &Path) -> Result<ScanReport, ScanError> {
    check_root(root)?;

    info!("Scanning for images in {:?}", root);
    let start_time = std::time::Instant::now();

    let mut images = Vec::new();
    let mut failures = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(true)
        .min_depth(1)
        .into_iter()
        .filter_entry(|e| !is_hidden_dir(e))
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry under {:?}: {}", root, e);
                continue;
            }
        };

        if !entry.file_type().is_file() || !metadata::is_supported_image(entry.path()) {
            continue;
        }

        let Ok(relative_path) = entry.path().strip_prefix(root) else {
            continue;
        };

        // Lossy names would collide on U+FFFD and could never be served back.
        if relative_path.to_str().is_none() {
            warn!("Skipping image with a non UTF-8 path: {:?}", entry.path());
            failures.push((
                entry.path().to_path_buf(),
                ExtractionError::NonUtf8Path(entry.path().to_path_buf()),
            ));
            continue;
        }

        match metadata::extract(entry.path()) {
            Ok(meta) => {
                images.push(ImageRecord {
                    url: photo_url(relative_path),
                    width: meta.width,
                    height: meta.height,
                    album: album_name(relative_path),
                    captured_at: meta.captured_at,
                });

                if images.len() % 100 == 0 {
                    debug!("Processed {} images...", images.len());
                }
            }
            Err(e) => {
                warn!("Could not process image {:?}: {}", entry.path(), e);
                failures.push((entry.path().to_path_buf(), e));
            }
        }
    }

    info!(
        "Found and processed {} images in {:.2}s ({} failed)",
        images.len(),
        start_time.elapsed().as_secs_f64(),
        failures.len()
    );

    Ok(ScanReport {
        snapshot: CatalogSnapshot::new(images),
        failures,
    })
}

fn check_root(root: &Path) -> Result<(), ScanError> {
    match std::fs::read_dir(root) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ScanError::RootMissing(root.to_path_buf()))
        }
        Err(source) => Err(ScanError::RootUnreadable {
            path: root.to_path_buf(),
            source,
        }),
    }
}

/// Dot-directories are pruned with everything under them. Dot-files are kept;
/// in-flight downloads end in `.partial` and never pass the extension check.
fn is_hidden_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.'))
}

/// Server-routable url for a file, `/photos/` plus the percent-encoded
/// relative path segments.
pub fn photo_url(relative_path: &Path) -> String {
    let segments: Vec<String> = relative_path
        .components()
        .filter_map(|component| match component {
            Component::Normal(name) => Some(urlencoding::encode(&name.to_string_lossy()).into_owned()),
            _ => None,
        })
        .collect();

    format!("/photos/{}", segments.join("/"))
}

/// The top-level subdirectory a file lives under, if any.
pub fn album_name(relative_path: &Path) -> Option<String> {
    let mut components = relative_path.components();
    let first = components.next()?;
    // A file directly in the root has a single component.
    components.next()?;

    match first {
        Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
        _ => None,
    }
}
