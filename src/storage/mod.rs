//! Segment storage
//!
//! Resolves the directory segments are written to and names the files inside
//! it. There is no index file: a session's output is discovered by listing
//! the directory.

mod segments;

pub use segments::{list_segments, SegmentFile, SegmentNamer, SEGMENT_PREFIX};

use crate::recorder::error::{RecordingError, RecordingResult};
use std::fs;
use std::path::PathBuf;

/// Provides a writable output directory
pub trait OutputStorage: Send + Sync {
    /// Ensure the output directory exists and return it
    fn prepare(&self) -> RecordingResult<PathBuf>;
}

/// Writes segments into one fixed directory, creating it on demand
#[derive(Debug, Clone)]
pub struct DirectoryStorage {
    dir: PathBuf,
}

impl DirectoryStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl OutputStorage for DirectoryStorage {
    fn prepare(&self) -> RecordingResult<PathBuf> {
        if !self.dir.is_dir() {
            fs::create_dir_all(&self.dir).map_err(|e| {
                RecordingError::Storage(format!(
                    "Failed to create output directory {:?}: {}",
                    self.dir, e
                ))
            })?;
            tracing::info!("Created output directory {:?}", self.dir);
        }
        Ok(self.dir.clone())
    }
}
