use super::ExtractionError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

/// One displayable image. Identity is `url`, unique within a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    pub url: String,
    pub width: u32,
    pub height: u32,
    pub album: Option<String>,
    pub captured_at: Option<DateTime<Utc>>,
}

/// A fully built catalog. Never mutated after it is published.
#[derive(Debug, Default)]
pub struct CatalogSnapshot {
    images: Vec<ImageRecord>,
    completed_at: Option<DateTime<Utc>>,
}

impl CatalogSnapshot {
    pub fn new(images: Vec<ImageRecord>) -> Self {
        Self {
            images,
            completed_at: Some(Utc::now()),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn images(&self) -> &[ImageRecord] {
        &self.images
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// When the scan that produced this snapshot finished. `None` for the
    /// placeholder published before the first scan.
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }
}

/// What the extractor reads from a single file.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageMetadata {
    pub width: u32,
    pub height: u32,
    pub captured_at: Option<DateTime<Utc>>,
}

/// Result of a scan: the snapshot plus every file that had to be left out.
#[derive(Debug)]
pub struct ScanReport {
    pub snapshot: CatalogSnapshot,
    pub failures: Vec<(PathBuf, ExtractionError)>,
}
