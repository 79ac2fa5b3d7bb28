//! Segment file naming and discovery
//!
//! Files are named `audio-<unix millis>.<ext>`.

use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};

/// Filename prefix shared by every segment
pub const SEGMENT_PREFIX: &str = "audio-";

/// Hands out timestamp-based segment paths that never repeat within a process
#[derive(Debug, Default)]
pub struct SegmentNamer {
    last_stamp_ms: AtomicI64,
}

impl SegmentNamer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next path in `dir` with the given extension
    pub fn next_path(&self, dir: &Path, extension: &str) -> PathBuf {
        let stamp = self.next_stamp(Utc::now().timestamp_millis());
        dir.join(format!("{}{}.{}", SEGMENT_PREFIX, stamp, extension))
    }

    /// Strictly increasing stamp: the wall clock, or last + 1 when the clock
    /// hasn't moved (or went backwards)
    fn next_stamp(&self, now_ms: i64) -> i64 {
        let previous = self
            .last_stamp_ms
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now_ms.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        now_ms.max(previous + 1)
    }
}

/// A segment file found on disk
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentFile {
    pub path: PathBuf,
    /// Capture timestamp taken from the filename
    pub timestamp_ms: i64,
    pub size_bytes: u64,
}

/// Parse `audio-<millis>.<ext>`
fn parse_stamp(file_name: &str) -> Option<i64> {
    let rest = file_name.strip_prefix(SEGMENT_PREFIX)?;
    let (stamp, extension) = rest.split_once('.')?;
    if extension.is_empty() {
        return None;
    }
    stamp.parse().ok()
}

/// List the segment files in `dir`, oldest first
///
/// A missing directory simply has no segments.
pub fn list_segments(dir: &Path) -> std::io::Result<Vec<SegmentFile>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut segments: Vec<SegmentFile> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .filter_map(|entry| {
            let name = entry.file_name();
            let timestamp_ms = parse_stamp(name.to_str()?)?;
            let metadata = entry.metadata().ok()?;
            if !metadata.is_file() {
                return None;
            }
            Some(SegmentFile {
                path: entry.path(),
                timestamp_ms,
                size_bytes: metadata.len(),
            })
        })
        .collect();

    segments.sort_by_key(|s| s.timestamp_ms);
    Ok(segments)
}
