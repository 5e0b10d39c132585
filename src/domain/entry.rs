//! File and directory records

use serde::{Deserialize, Serialize};

use crate::shared::paths;

/// Metadata record exchanged with the remote adapter and with callers.
///
/// `is_deleted` is only meaningful inside change streams; persisted
/// entries never carry it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatModel {
    pub path: String,
    pub basename: String,
    pub is_dir: bool,
    #[serde(default)]
    pub is_deleted: bool,
    /// Modification time, integer milliseconds since epoch; 0 if unknown
    pub mtime_ms: i64,
    /// Size in bytes; 0 for directories
    pub size: i64,
}

impl StatModel {
    pub fn new(path: &str, is_dir: bool, mtime_ms: i64, size: i64) -> Self {
        let path = paths::normalize_path(path);
        Self {
            basename: paths::basename(&path).to_string(),
            path,
            is_dir,
            is_deleted: false,
            mtime_ms,
            size: if is_dir { 0 } else { size },
        }
    }
}

/// One known remote path, as persisted in the file index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Absolute remote path, normalized
    pub path: String,
    /// Final path segment
    pub basename: String,
    pub is_dir: bool,
    /// Modification time, integer milliseconds since epoch; 0 if unknown
    pub mtime: i64,
    /// Size in bytes; 0 for directories
    pub size: i64,
    pub etag: Option<String>,
    pub content_hash: Option<String>,
    /// When this record was last written from remote truth (ms since epoch)
    pub last_synced: i64,
    /// Path of the containing directory
    pub parent_path: String,
}

impl FileEntry {
    /// Build an index record from a remote stat, stamped with the write time.
    pub fn from_stat(stat: &StatModel, last_synced: i64) -> Self {
        Self {
            path: stat.path.clone(),
            basename: stat.basename.clone(),
            is_dir: stat.is_dir,
            mtime: stat.mtime_ms,
            size: stat.size,
            etag: None,
            content_hash: None,
            last_synced,
            parent_path: paths::parent_path(&stat.path),
        }
    }

    pub fn to_stat(&self) -> StatModel {
        StatModel {
            path: self.path.clone(),
            basename: self.basename.clone(),
            is_dir: self.is_dir,
            is_deleted: false,
            mtime_ms: self.mtime,
            size: self.size,
        }
    }
}

/// Cached modification time for one known directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirMtimeEntry {
    pub path: String,
    pub mtime: i64,
    /// When the remote was last consulted for this directory (ms since epoch)
    pub last_checked: i64,
    /// Advisory child count; may be stale and is not relied upon
    pub child_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stat_normalizes_path_and_zeroes_dir_size() {
        let stat = StatModel::new("base/sub/", true, 100, 4096);
        assert_eq!(stat.path, "/base/sub");
        assert_eq!(stat.basename, "sub");
        assert_eq!(stat.size, 0);
    }

    #[test]
    fn entry_derives_parent_from_path() {
        let stat = StatModel::new("/base/a.txt", false, 100, 10);
        let entry = FileEntry::from_stat(&stat, 12345);
        assert_eq!(entry.parent_path, "/base");
        assert_eq!(entry.last_synced, 12345);
        assert_eq!(entry.to_stat().mtime_ms, 100);
    }
}
