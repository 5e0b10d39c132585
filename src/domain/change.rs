//! Change records produced by the delta detector

use serde::{Deserialize, Serialize};

use super::entry::{FileEntry, StatModel};

/// What happened to one remote path since the last observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
}

/// One detected change. The change list is a set: no ordering is defined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub kind: ChangeKind,
    pub stat: StatModel,
}

impl FileChange {
    pub fn added(stat: StatModel) -> Self {
        Self {
            kind: ChangeKind::Added,
            stat,
        }
    }

    pub fn modified(stat: StatModel) -> Self {
        Self {
            kind: ChangeKind::Modified,
            stat,
        }
    }

    /// A deletion carries the last known metadata of the vanished path.
    pub fn deleted(entry: &FileEntry) -> Self {
        let mut stat = entry.to_stat();
        stat.is_deleted = true;
        Self {
            kind: ChangeKind::Deleted,
            stat,
        }
    }

    pub fn path(&self) -> &str {
        &self.stat.path
    }
}

/// Outcome of one detection pass. Non-destructive with respect to the index.
#[derive(Debug, Default)]
pub struct DeltaDetectionResult {
    pub changes: Vec<FileChange>,
    /// The cache cannot answer the question; a full scan is required
    pub need_full_scan: bool,
    /// Number of directories stat'd during the pass
    pub scanned_dirs: usize,
    /// Directories whose mtime moved (or which vanished)
    pub changed_dirs: Vec<String>,
    /// Directories whose listing could not be fetched; their diffs were
    /// skipped rather than interpreted as wholesale deletion
    pub failed_dirs: Vec<String>,
}

impl DeltaDetectionResult {
    pub fn full_scan_required() -> Self {
        Self {
            need_full_scan: true,
            ..Self::default()
        }
    }
}

/// Exact counts produced by a completed full scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanSummary {
    pub file_count: u64,
    pub dir_count: u64,
}

/// Index size snapshot exposed to the embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub file_count: u64,
    pub dir_count: u64,
    pub has_index: bool,
}
