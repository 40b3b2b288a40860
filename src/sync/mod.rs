//! Landing side of remote photo-library sync.
//!
//! An external tool handles authentication and listing; this module only turns
//! remote items into files under the photo directory. Each item lands under a
//! name derived from its stable remote id, so repeated syncs never download the
//! same item twice.

mod error;

pub use error::SyncError;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info};

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteMediaItem {
    pub id: String,
    pub filename: String,
    pub base_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Landing {
    Downloaded(PathBuf),
    Skipped(PathBuf),
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[async_trait]
pub trait MediaDownloader: Send + Sync {
    async fn download(&self, item: &RemoteMediaItem) -> Result<Vec<u8>, SyncError>;
}

/// Fetches the display-sized rendition of an item over HTTP.
pub struct HttpDownloader {
    client: reqwest::Client,
}

impl HttpDownloader {
    pub fn new() -> Result<Self, SyncError> {
        let client = reqwest::Client::builder()
            .timeout(DOWNLOAD_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl MediaDownloader for HttpDownloader {
    async fn download(&self, item: &RemoteMediaItem) -> Result<Vec<u8>, SyncError> {
        let url = format!("{}=w1920-h1080", item.base_url);
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::Status(status.as_u16()));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

/// File name an item lands under: its remote id plus the original extension.
pub fn landing_file_name(item: &RemoteMediaItem) -> Result<String, SyncError> {
    let id = item.id.trim();
    if !is_safe_name(id) {
        return Err(SyncError::InvalidItemId(item.id.clone()));
    }

    Ok(match item.filename.rsplit_once('.') {
        Some((_, ext)) if is_safe_name(ext) => format!("{}.{}", id, ext),
        _ => id.to_string(),
    })
}

fn is_safe_name(name: &str) -> bool {
    !name.is_empty() && !name.starts_with('.') && !name.contains(['/', '\\', '\0'])
}

/// Land one item in `album_dir`. An item already on disk is skipped without
/// touching the filesystem.
pub async fn land_item(
    album_dir: &Path,
    item: &RemoteMediaItem,
    downloader: &dyn MediaDownloader,
) -> Result<Landing, SyncError> {
    let file_name = landing_file_name(item)?;
    let target = album_dir.join(&file_name);

    if tokio::fs::try_exists(&target).await? {
        debug!("Already synced, skipping: {:?}", target);
        return Ok(Landing::Skipped(target));
    }

    info!("Downloading: {}", item.filename);
    let bytes = downloader.download(item).await?;

    // Write under a dot-name first so the watcher and scanner ignore the
    // partial file, then move it into place in one step.
    let partial = album_dir.join(format!(".{}.partial", file_name));
    tokio::fs::write(&partial, &bytes).await?;
    if let Err(e) = tokio::fs::rename(&partial, &target).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(e.into());
    }

    Ok(Landing::Downloaded(target))
}

/// Land every item of one album under `photos_dir/<album_title>`.
pub async fn sync_album(
    photos_dir: &Path,
    album_title: &str,
    items: &[RemoteMediaItem],
    downloader: &dyn MediaDownloader,
) -> Result<SyncReport, SyncError> {
    if !is_safe_name(album_title.trim()) {
        return Err(SyncError::InvalidAlbumTitle(album_title.to_string()));
    }

    info!("Syncing album: {}", album_title);
    let album_dir = photos_dir.join(album_title.trim());
    tokio::fs::create_dir_all(&album_dir).await?;

    let mut report = SyncReport::default();
    for item in items {
        match land_item(&album_dir, item, downloader).await {
            Ok(Landing::Downloaded(_)) => report.downloaded += 1,
            Ok(Landing::Skipped(_)) => report.skipped += 1,
            Err(e) => {
                error!("Failed to sync item {} ({}): {}", item.id, item.filename, e);
                report.failed += 1;
            }
        }
    }

    info!(
        "Synced {} photos from {} ({} new, {} already present, {} failed)",
        items.len(),
        album_title,
        report.downloaded,
        report.skipped,
        report.failed
    );
    Ok(report)
}

/// Read a JSON array of remote items, as written by the external sync tool.
pub async fn load_manifest(path: &Path) -> Result<Vec<RemoteMediaItem>, SyncError> {
    let contents = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&contents)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct CountingDownloader {
        calls: AtomicUsize,
    }

    impl CountingDownloader {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl MediaDownloader for CountingDownloader {
        async fn download(&self, item: &RemoteMediaItem) -> Result<Vec<u8>, SyncError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if item.id == "broken" {
                return Err(SyncError::Status(404));
            }
            Ok(format!("bytes of {}", item.id).into_bytes())
        }
    }

    fn item(id: &str, filename: &str) -> RemoteMediaItem {
        RemoteMediaItem {
            id: id.to_string(),
            filename: filename.to_string(),
            base_url: format!("https://photos.example.com/{}", id),
        }
    }

    fn files_in(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_landing_file_name() {
        assert_eq!(landing_file_name(&item("AF1Qip", "IMG_001.JPG")).unwrap(), "AF1Qip.JPG");
        assert_eq!(landing_file_name(&item("abc", "holiday.photo.jpeg")).unwrap(), "abc.jpeg");
        assert_eq!(landing_file_name(&item("abc", "no-extension")).unwrap(), "abc");
        assert!(landing_file_name(&item("../escape", "a.jpg")).is_err());
        assert!(landing_file_name(&item(".hidden", "a.jpg")).is_err());
        assert!(landing_file_name(&item("", "a.jpg")).is_err());
    }

    #[tokio::test]
    async fn test_landing_same_item_twice_writes_once() {
        let temp_dir = TempDir::new().unwrap();
        let downloader = CountingDownloader::new();
        let remote = item("AF1QipN", "IMG_2041.jpg");

        let first = land_item(temp_dir.path(), &remote, &downloader).await.unwrap();
        let second = land_item(temp_dir.path(), &remote, &downloader).await.unwrap();

        let target = temp_dir.path().join("AF1QipN.jpg");
        assert_eq!(first, Landing::Downloaded(target.clone()));
        assert_eq!(second, Landing::Skipped(target.clone()));
        assert_eq!(downloader.calls.load(Ordering::SeqCst), 1);
        assert_eq!(files_in(temp_dir.path()), vec!["AF1QipN.jpg".to_string()]);
        assert_eq!(std::fs::read(&target).unwrap(), b"bytes of AF1QipN");
    }

    #[tokio::test]
    async fn test_existing_file_is_never_overwritten() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("keep.png");
        std::fs::write(&target, b"original").unwrap();

        let downloader = CountingDownloader::new();
        let landing = land_item(temp_dir.path(), &item("keep", "x.png"), &downloader)
            .await
            .unwrap();

        assert_eq!(landing, Landing::Skipped(target.clone()));
        assert_eq!(downloader.calls.load(Ordering::SeqCst), 0);
        assert_eq!(std::fs::read(&target).unwrap(), b"original");
    }

    #[tokio::test]
    async fn test_sync_album_reports_and_isolates_failures() {
        let temp_dir = TempDir::new().unwrap();
        let downloader = CountingDownloader::new();
        let items = vec![item("one", "a.jpg"), item("broken", "b.jpg"), item("two", "c.webp")];

        let report = sync_album(temp_dir.path(), "Family", &items, &downloader)
            .await
            .unwrap();
        assert_eq!(
            report,
            SyncReport {
                downloaded: 2,
                skipped: 0,
                failed: 1
            }
        );
        let album_dir = temp_dir.path().join("Family");
        assert_eq!(files_in(&album_dir), vec!["one.jpg".to_string(), "two.webp".to_string()]);

        let again = sync_album(temp_dir.path(), "Family", &items, &downloader)
            .await
            .unwrap();
        assert_eq!(again.downloaded, 0);
        assert_eq!(again.skipped, 2);
        assert_eq!(again.failed, 1);
    }

    #[tokio::test]
    async fn test_sync_album_rejects_path_like_titles() {
        let temp_dir = TempDir::new().unwrap();
        let downloader = CountingDownloader::new();
        let result = sync_album(temp_dir.path(), "../outside", &[], &downloader).await;
        assert!(matches!(result, Err(SyncError::InvalidAlbumTitle(_))));
    }

    #[tokio::test]
    async fn test_load_manifest() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("items.json");
        std::fs::write(
            &path,
            r#"[{"id": "abc", "filename": "IMG_1.jpg", "baseUrl": "https://lh3.example.com/abc"}]"#,
        )
        .unwrap();

        let items = load_manifest(&path).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "abc");
        assert_eq!(items[0].base_url, "https://lh3.example.com/abc");
    }
}
