//! Hierarchical remote-delta detector
//!
//! Detection leans on one contract: a directory whose remote mtime still
//! equals its cached mtime has had no immediate child added, removed, or
//! renamed since the cache entry was written. Unchanged directories are
//! pruned after a single depth-0 PROPFIND, so detection cost tracks the
//! edit frontier rather than the tree size.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::domain::{
    ChangeKind, DeltaDetectionResult, DirMtimeEntry, FileChange, FileEntry, IndexStats,
    ScanSummary, StatModel,
};
use crate::error::SyncResult;
use crate::infrastructure::index_store::FileIndexStore;
use crate::remote::{Depth, RemoteDirectory};
use crate::shared::{now_ms, paths};

use super::scan::{FullScanner, ProgressFn};

/// A directory found changed during the scan phase, with the depth-1
/// listing captured while discovering its subdirectories. `None` means
/// the directory itself vanished.
struct ChangedDir {
    path: String,
    listing: Option<Vec<StatModel>>,
}

enum DirScan {
    Unchanged,
    Changed {
        dir: ChangedDir,
        subdirs: Vec<String>,
    },
    /// The listing could not be fetched; the diff is skipped so a failed
    /// listing is never mistaken for an emptied directory
    Failed(String),
}

impl DirScan {
    fn deleted(path: &str) -> Self {
        Self::Changed {
            dir: ChangedDir {
                path: path.to_string(),
                listing: None,
            },
            subdirs: Vec::new(),
        }
    }
}

pub struct DeltaDetector {
    store: Arc<FileIndexStore>,
    remote: Arc<dyn RemoteDirectory>,
    base_dir: String,
    concurrency: usize,
}

impl DeltaDetector {
    pub fn new(
        store: Arc<FileIndexStore>,
        remote: Arc<dyn RemoteDirectory>,
        base_dir: &str,
        concurrency: usize,
    ) -> Self {
        Self {
            store,
            remote,
            base_dir: paths::normalize_path(base_dir),
            concurrency: concurrency.max(1),
        }
    }

    /// Detect remote changes since the last index update. Non-destructive
    /// with respect to the index; the change list is a set with no
    /// defined order.
    pub async fn detect_changes(&self) -> SyncResult<DeltaDetectionResult> {
        let cached: HashMap<String, DirMtimeEntry> = self
            .store
            .all_dir_mtimes()
            .await?
            .into_iter()
            .map(|entry| (entry.path.clone(), entry))
            .collect();

        if cached.is_empty() {
            info!("directory mtime cache is empty, full scan required");
            return Ok(DeltaDetectionResult::full_scan_required());
        }
        if self.store.count().await? == 0 {
            warn!("mtime cache present over an empty file index, invalidating cache");
            return Ok(DeltaDetectionResult::full_scan_required());
        }

        // Scan phase: walk down from the root, pruning unchanged
        // directories. Siblings are probed in parallel chunks; descent
        // between depth levels stays sequential.
        let mut scanned_dirs = 0;
        let mut changed: Vec<ChangedDir> = Vec::new();
        let mut failed_dirs: Vec<String> = Vec::new();
        let mut frontier = vec![self.base_dir.clone()];
        while !frontier.is_empty() {
            let mut next = Vec::new();
            for chunk in frontier.chunks(self.concurrency) {
                let outcomes = join_all(chunk.iter().map(|dir| self.probe_dir(dir, &cached))).await;
                for outcome in outcomes {
                    scanned_dirs += 1;
                    match outcome {
                        DirScan::Unchanged => {}
                        DirScan::Changed { dir, subdirs } => {
                            next.extend(subdirs);
                            changed.push(dir);
                        }
                        DirScan::Failed(path) => failed_dirs.push(path),
                    }
                }
            }
            frontier = next;
        }

        // Diff phase: file-level comparison of each changed directory
        // against its cached children.
        let mut seen = HashSet::new();
        let mut changes = Vec::new();
        for dir in &changed {
            match &dir.listing {
                Some(listing) => {
                    self.diff_dir(dir, listing, &mut seen, &mut changes)
                        .await?
                }
                None => self.diff_deleted_dir(&dir.path, &mut seen, &mut changes).await?,
            }
        }

        info!(
            scanned_dirs,
            changed_dirs = changed.len(),
            changes = changes.len(),
            failed_dirs = failed_dirs.len(),
            "delta detection complete"
        );
        Ok(DeltaDetectionResult {
            changes,
            need_full_scan: false,
            scanned_dirs,
            changed_dirs: changed.into_iter().map(|dir| dir.path).collect(),
            failed_dirs,
        })
    }

    /// Clear and rebuild the whole index. Destructive.
    pub async fn full_scan(&self, on_progress: &ProgressFn<'_>) -> SyncResult<ScanSummary> {
        FullScanner::new(self.store.as_ref(), self.remote.as_ref(), self.concurrency)
            .run(&self.base_dir, on_progress)
            .await
    }

    /// Apply detected changes to the file index.
    pub async fn update_file_index(&self, changes: &[FileChange]) -> SyncResult<()> {
        let now = now_ms();
        let mut deleted = Vec::new();
        let mut upserts = Vec::new();
        for change in changes {
            match change.kind {
                ChangeKind::Deleted => deleted.push(change.path().to_string()),
                ChangeKind::Added | ChangeKind::Modified => {
                    upserts.push(FileEntry::from_stat(&change.stat, now))
                }
            }
        }
        self.store.batch_delete(&deleted).await?;
        self.store.batch_set(&upserts).await?;
        info!(
            upserted = upserts.len(),
            deleted = deleted.len(),
            "applied changes to file index"
        );
        Ok(())
    }

    /// Refresh the directory mtime cache around the applied changes so
    /// the next detection pass prunes everywhere the tree is quiet.
    ///
    /// The whole ancestor chain of every changed path is re-stat'd: the
    /// remote advanced those mtimes when it propagated the change, and a
    /// stale ancestor entry would be re-scanned on every later walk.
    pub async fn update_dir_mtime_cache(&self, changes: &[FileChange]) -> SyncResult<()> {
        let mut refresh: BTreeSet<String> = BTreeSet::new();
        for change in changes {
            match change.kind {
                ChangeKind::Deleted => {
                    if change.stat.is_dir {
                        self.store.delete_dir_mtime(change.path()).await?;
                    }
                }
                ChangeKind::Added | ChangeKind::Modified => {
                    if change.stat.is_dir {
                        refresh.insert(change.path().to_string());
                    }
                }
            }
            let mut parent = paths::parent_path(change.path());
            while paths::is_within(&parent, &self.base_dir) {
                if !refresh.insert(parent.clone()) {
                    break;
                }
                if parent == self.base_dir {
                    break;
                }
                parent = paths::parent_path(&parent);
            }
        }
        // A deleted directory must not be re-cached through its
        // children's parent pointers
        for change in changes {
            if change.kind == ChangeKind::Deleted && change.stat.is_dir {
                refresh.remove(change.path());
            }
        }

        let now = now_ms();
        for dir in refresh {
            match self.remote.propfind(&dir, Depth::Zero).await {
                Ok(stats) => match stats.into_iter().next() {
                    Some(stat) => {
                        self.store
                            .set_dir_mtime(&DirMtimeEntry {
                                path: dir.clone(),
                                mtime: stat.mtime_ms,
                                last_checked: now,
                                // Left as a hint; not recomputed here
                                child_count: 0,
                            })
                            .await?;
                    }
                    None => self.store.delete_dir_mtime(&dir).await?,
                },
                Err(err) if err.is_not_found() => self.store.delete_dir_mtime(&dir).await?,
                Err(err) => warn!(dir = %dir, error = %err, "could not refresh directory mtime"),
            }
        }
        Ok(())
    }

    pub async fn stats(&self) -> SyncResult<IndexStats> {
        let (file_count, dir_count) = self.store.counts().await?;
        Ok(IndexStats {
            file_count,
            dir_count,
            has_index: file_count + dir_count > 0,
        })
    }

    async fn probe_dir(&self, path: &str, cached: &HashMap<String, DirMtimeEntry>) -> DirScan {
        let current_mtime = match self.remote.propfind(path, Depth::Zero).await {
            Ok(stats) => match stats.into_iter().next() {
                Some(stat) => Some(stat.mtime_ms),
                None => {
                    debug!(path, "depth-0 stat empty, treating directory as deleted");
                    return DirScan::deleted(path);
                }
            },
            Err(err) if err.is_not_found() => {
                debug!(path, "directory vanished from remote");
                return DirScan::deleted(path);
            }
            Err(err) => {
                // Conservative: an unreachable directory is treated as
                // changed so its listing is re-checked
                warn!(path, error = %err, "depth-0 stat failed, treating directory as changed");
                None
            }
        };

        if let (Some(mtime), Some(entry)) = (current_mtime, cached.get(path)) {
            if entry.mtime == mtime {
                return DirScan::Unchanged;
            }
        }
        debug!(path, "directory changed");

        match self.remote.propfind(path, Depth::One).await {
            Ok(listing) => {
                let subdirs = listing
                    .iter()
                    .filter(|stat| stat.is_dir && stat.path != path)
                    .map(|stat| stat.path.clone())
                    .collect();
                DirScan::Changed {
                    dir: ChangedDir {
                        path: path.to_string(),
                        listing: Some(listing),
                    },
                    subdirs,
                }
            }
            Err(err) if err.is_not_found() => DirScan::deleted(path),
            Err(err) => {
                warn!(path, error = %err, "listing failed, skipping diff for directory");
                DirScan::Failed(path.to_string())
            }
        }
    }

    /// Three-way set comparison of one changed directory against its
    /// cached children.
    async fn diff_dir(
        &self,
        dir: &ChangedDir,
        listing: &[StatModel],
        seen: &mut HashSet<String>,
        changes: &mut Vec<FileChange>,
    ) -> SyncResult<()> {
        let current: HashMap<&str, &StatModel> = listing
            .iter()
            .filter(|stat| stat.path != dir.path)
            .map(|stat| (stat.path.as_str(), stat))
            .collect();
        let cached_children = self.store.children_of(&dir.path).await?;
        let cached: HashMap<&str, &FileEntry> = cached_children
            .iter()
            .map(|entry| (entry.path.as_str(), entry))
            .collect();

        for (path, stat) in &current {
            match cached.get(path) {
                None => {
                    if seen.insert((*path).to_string()) {
                        changes.push(FileChange::added((*stat).clone()));
                    }
                }
                Some(entry) => {
                    if is_modified(entry, stat) && seen.insert((*path).to_string()) {
                        changes.push(FileChange::modified((*stat).clone()));
                    }
                }
            }
        }

        for entry in &cached_children {
            if current.contains_key(entry.path.as_str()) {
                continue;
            }
            if entry.is_dir {
                // The subtree goes with its directory
                for descendant in self.store.get_by_prefix(&entry.path).await? {
                    if seen.insert(descendant.path.clone()) {
                        changes.push(FileChange::deleted(&descendant));
                    }
                }
            } else if seen.insert(entry.path.clone()) {
                changes.push(FileChange::deleted(entry));
            }
        }
        Ok(())
    }

    /// The changed directory itself vanished: everything indexed under it
    /// is gone.
    async fn diff_deleted_dir(
        &self,
        path: &str,
        seen: &mut HashSet<String>,
        changes: &mut Vec<FileChange>,
    ) -> SyncResult<()> {
        let snapshot = self.store.get_by_prefix(path).await?;
        let mut found_self = false;
        for entry in &snapshot {
            if entry.path == path {
                found_self = true;
            }
            if seen.insert(entry.path.clone()) {
                changes.push(FileChange::deleted(entry));
            }
        }
        if !found_self && seen.insert(path.to_string()) {
            // Known only to the mtime cache; still report the deletion so
            // the cache entry is dropped on apply
            let mut stat = StatModel::new(path, true, 0, 0);
            stat.is_deleted = true;
            changes.push(FileChange {
                kind: ChangeKind::Deleted,
                stat,
            });
        }
        Ok(())
    }
}

/// Modification test for the file-level diff. Directory mtimes are
/// deliberately ignored: a directory's mtime moves on child changes that
/// the child-level comparisons pick up on their own.
fn is_modified(entry: &FileEntry, stat: &StatModel) -> bool {
    if entry.is_dir != stat.is_dir {
        return true;
    }
    if stat.is_dir {
        return false;
    }
    entry.mtime != stat.mtime_ms || entry.size != stat.size
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path: &str, is_dir: bool, mtime: i64, size: i64) -> FileEntry {
        FileEntry::from_stat(&StatModel::new(path, is_dir, mtime, size), 0)
    }

    #[test]
    fn file_modification_compares_mtime_and_size() {
        let cached = entry("/base/a.txt", false, 100, 10);
        assert!(!is_modified(&cached, &StatModel::new("/base/a.txt", false, 100, 10)));
        assert!(is_modified(&cached, &StatModel::new("/base/a.txt", false, 200, 10)));
        assert!(is_modified(&cached, &StatModel::new("/base/a.txt", false, 100, 20)));
    }

    #[test]
    fn directory_mtime_alone_is_not_a_modification() {
        let cached = entry("/base/sub", true, 100, 0);
        assert!(!is_modified(&cached, &StatModel::new("/base/sub", true, 999, 0)));
    }

    #[test]
    fn kind_flip_is_a_modification() {
        let cached = entry("/base/x", false, 100, 10);
        assert!(is_modified(&cached, &StatModel::new("/base/x", true, 100, 0)));
    }
}
