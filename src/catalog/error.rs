use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Photo directory does not exist: {0}")]
    RootMissing(PathBuf),

    #[error("Photo directory is not readable: {path}: {source}")]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Scan task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),
}

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Path is not valid UTF-8 and cannot be served: {0:?}")]
    NonUtf8Path(PathBuf),
}

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("Failed to create watcher: {0}")]
    Create(#[source] notify::Error),

    #[error("Failed to watch {path}: {source}")]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}
