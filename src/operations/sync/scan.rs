//! Full-scan engine
//!
//! Clears and rebuilds the index from a recursive remote enumeration.
//! Sibling directories are fanned out in chunks of the configured
//! concurrency; each visited directory batch-writes its immediate
//! children and records its own mtime, so the index is populated
//! streaming rather than held in memory.

use std::sync::atomic::{AtomicU64, Ordering};

use futures::future::{join_all, BoxFuture, FutureExt};
use tracing::{debug, info};

use crate::domain::{DirMtimeEntry, FileEntry, ScanSummary, StatModel};
use crate::error::{SyncError, SyncResult};
use crate::infrastructure::index_store::FileIndexStore;
use crate::remote::{Depth, RemoteDirectory, RemoteError};
use crate::shared::now_ms;

/// Invoked once per visited directory with `(entries_seen, current_path)`.
pub type ProgressFn<'a> = dyn Fn(u64, &str) + Send + Sync + 'a;

#[derive(Default)]
struct Counters {
    entries_seen: AtomicU64,
    files: AtomicU64,
    dirs: AtomicU64,
}

pub(crate) struct FullScanner<'a> {
    store: &'a FileIndexStore,
    remote: &'a dyn RemoteDirectory,
    concurrency: usize,
}

impl<'a> FullScanner<'a> {
    pub fn new(store: &'a FileIndexStore, remote: &'a dyn RemoteDirectory, concurrency: usize) -> Self {
        Self {
            store,
            remote,
            concurrency: concurrency.max(1),
        }
    }

    /// Transport errors abort the scan and propagate; the caller keeps
    /// the progress record so a later invocation can show where the scan
    /// stopped.
    pub async fn run(&self, base_dir: &str, on_progress: &ProgressFn<'_>) -> SyncResult<ScanSummary> {
        self.store.clear().await?;
        self.store.clear_dir_mtimes().await?;
        info!(base_dir, "starting full scan");

        let root = self
            .remote
            .propfind(base_dir, Depth::Zero)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| SyncError::Remote(RemoteError::NotFound(base_dir.to_string())))?;
        self.store.set(&FileEntry::from_stat(&root, now_ms())).await?;

        let counters = Counters::default();
        if root.is_dir {
            counters.dirs.fetch_add(1, Ordering::SeqCst);
            self.scan_dir(base_dir.to_string(), &counters, on_progress)
                .await?;
        } else {
            counters.files.fetch_add(1, Ordering::SeqCst);
        }

        let summary = ScanSummary {
            file_count: counters.files.load(Ordering::SeqCst),
            dir_count: counters.dirs.load(Ordering::SeqCst),
        };
        info!(
            files = summary.file_count,
            dirs = summary.dir_count,
            "full scan complete"
        );
        Ok(summary)
    }

    fn scan_dir<'s>(
        &'s self,
        path: String,
        counters: &'s Counters,
        on_progress: &'s ProgressFn<'s>,
    ) -> BoxFuture<'s, SyncResult<()>> {
        async move {
            let listing = self.remote.propfind(&path, Depth::One).await?;
            let now = now_ms();

            let mut dir_mtime = 0;
            let mut children: Vec<StatModel> = Vec::new();
            for stat in listing {
                if stat.path == path {
                    dir_mtime = stat.mtime_ms;
                } else {
                    children.push(stat);
                }
            }

            let mut subdirs = Vec::new();
            let mut entries = Vec::with_capacity(children.len());
            for stat in &children {
                if stat.is_dir {
                    subdirs.push(stat.path.clone());
                    counters.dirs.fetch_add(1, Ordering::SeqCst);
                } else {
                    counters.files.fetch_add(1, Ordering::SeqCst);
                }
                entries.push(FileEntry::from_stat(stat, now));
            }

            self.store.batch_set(&entries).await?;
            self.store
                .set_dir_mtime(&DirMtimeEntry {
                    path: path.clone(),
                    mtime: dir_mtime,
                    last_checked: now,
                    child_count: children.len() as i64,
                })
                .await?;

            let seen = counters
                .entries_seen
                .fetch_add(children.len() as u64, Ordering::SeqCst)
                + children.len() as u64;
            on_progress(seen, &path);
            debug!(path, children = children.len(), "scanned directory");

            for chunk in subdirs.chunks(self.concurrency) {
                let results = join_all(
                    chunk
                        .iter()
                        .map(|sub| self.scan_dir(sub.clone(), counters, on_progress)),
                )
                .await;
                for result in results {
                    result?;
                }
            }
            Ok(())
        }
        .boxed()
    }
}
