//! Storage models.

use std::path::PathBuf;
use time::UtcDateTime;

/// File metadata returned by storage backends.
///
/// This is the "file stat" the cache policy works from: the last-modified
/// timestamp decides whether an artifact (or quarantine marker) has outlived
/// its TTL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Relative path from storage root
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Last modified timestamp
    pub modified: UtcDateTime,
}
impl FileInfo {
    pub fn new(path: impl Into<PathBuf>, size: u64, modified: UtcDateTime) -> Self {
        Self {
            path: path.into(),
            size,
            modified,
        }
    }
}
