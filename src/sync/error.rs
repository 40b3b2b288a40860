use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Download failed: {0}")]
    Download(#[from] reqwest::Error),

    #[error("Download returned status {0}")]
    Status(u16),

    #[error("Invalid remote item id: {0:?}")]
    InvalidItemId(String),

    #[error("Invalid album title: {0:?}")]
    InvalidAlbumTitle(String),

    #[error("Manifest error: {0}")]
    Manifest(#[from] serde_json::Error),
}
