//! Sync driver
//!
//! `walk()` is the sole main entry: it decides between the full-scan and
//! incremental paths, applies detected changes to the index, and returns
//! the filtered listing. At most one `walk()` per namespace may run at a
//! time; callers serialize externally.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub mod detector;
pub mod filter;
pub mod listing;
pub mod scan;


pub use detector::DeltaDetector;
pub use filter::{AcceptAll, GlobPatternFilter, PathFilter};
pub use scan::ProgressFn;

use crate::config::SyncSettings;
use crate::domain::{IndexStats, ScanSummary, StatModel, SyncPhase, SyncProgress};
use crate::error::SyncResult;
use crate::infrastructure::database::Database;
use crate::infrastructure::index_store::FileIndexStore;
use crate::remote::RemoteDirectory;

use listing::build_listing;

/// Persist scan progress every this many indexed entries.
const PROGRESS_WRITE_INTERVAL: u64 = 500;

pub struct SyncDriver {
    store: Arc<FileIndexStore>,
    detector: DeltaDetector,
    settings: SyncSettings,
    filter: Arc<dyn PathFilter>,
}

impl SyncDriver {
    pub fn new(
        db: &Database,
        remote: Arc<dyn RemoteDirectory>,
        settings: SyncSettings,
        filter: Arc<dyn PathFilter>,
    ) -> Self {
        let store = Arc::new(FileIndexStore::new(db, settings.db_key()));
        let detector = DeltaDetector::new(
            store.clone(),
            remote,
            &settings.remote_base_dir,
            settings.concurrency,
        );
        Self {
            store,
            detector,
            settings,
            filter,
        }
    }

    /// Access to the underlying store (primarily for testing and
    /// embedding diagnostics).
    pub fn store(&self) -> &Arc<FileIndexStore> {
        &self.store
    }

    /// Synchronize the index with the remote and return the filtered
    /// listing of relative paths.
    ///
    /// A quiet walk writes nothing: the progress record only exists while
    /// there is real work in flight, so `walk(); walk();` performs no
    /// store writes beyond the dir-mtime refreshes of the first call.
    pub async fn walk(&self) -> SyncResult<Vec<StatModel>> {
        let stale_record = self.store.progress().await?;
        if let Some(previous) = &stale_record {
            if previous.phase != SyncPhase::Syncing {
                info!(
                    session = %previous.session_id,
                    phase = previous.phase.as_str(),
                    processed = previous.processed_count,
                    "found prior sync progress record, starting over"
                );
            }
        }

        if self.store.count().await? == 0 {
            debug!("index is empty, bootstrapping with a full scan");
            self.run_full_scan().await?;
            return self.finish_listing(true).await;
        }

        let detection = self.detector.detect_changes().await?;

        if detection.need_full_scan {
            self.run_full_scan().await?;
            return self.finish_listing(true).await;
        }
        if detection.changes.is_empty() {
            debug!(
                scanned_dirs = detection.scanned_dirs,
                "no remote changes detected"
            );
            // Only a leftover record from an aborted session needs
            // cleaning up here
            return self.finish_listing(stale_record.is_some()).await;
        }

        let mut progress = SyncProgress::begin(SyncPhase::Updating);
        progress.total_count = detection.changes.len() as u64;
        progress.pending = detection.changed_dirs.clone();
        progress.failed = detection.failed_dirs.clone();
        self.store.set_progress(&progress).await?;

        self.detector.update_file_index(&detection.changes).await?;
        self.detector
            .update_dir_mtime_cache(&detection.changes)
            .await?;

        progress.processed_count = detection.changes.len() as u64;
        progress.completed = std::mem::take(&mut progress.pending);
        self.store.set_progress(&progress).await?;

        self.finish_listing(true).await
    }

    /// Drop all persisted state for this namespace.
    pub async fn clear_index(&self) -> SyncResult<()> {
        self.store.clear().await?;
        self.store.clear_dir_mtimes().await?;
        self.store.clear_progress().await?;
        info!("index cleared");
        Ok(())
    }

    /// `clear_index` followed by a full scan. Always safe and idempotent.
    pub async fn rebuild_index(&self) -> SyncResult<ScanSummary> {
        self.clear_index().await?;
        let summary = self.run_full_scan().await?;
        self.store.clear_progress().await?;
        Ok(summary)
    }

    pub async fn get_index_stats(&self) -> SyncResult<IndexStats> {
        self.detector.stats().await
    }

    /// Run a full scan while persisting a throttled progress record. On
    /// failure the record is left behind with the last reported position.
    async fn run_full_scan(&self) -> SyncResult<ScanSummary> {
        let mut progress = SyncProgress::begin(SyncPhase::Scanning);
        self.store.set_progress(&progress).await?;

        let (tx, mut rx) = mpsc::unbounded_channel::<(u64, String)>();
        let store = self.store.clone();
        let writer = tokio::spawn(async move {
            let mut last_persisted = 0u64;
            while let Some((seen, path)) = rx.recv().await {
                progress.processed_count = seen;
                progress.current_path = path;
                if seen.saturating_sub(last_persisted) >= PROGRESS_WRITE_INTERVAL {
                    last_persisted = seen;
                    if let Err(err) = store.set_progress(&progress).await {
                        warn!(error = %err, "failed to persist scan progress");
                    }
                }
            }
            if let Err(err) = store.set_progress(&progress).await {
                warn!(error = %err, "failed to persist final scan progress");
            }
        });

        let on_progress = move |seen: u64, path: &str| {
            let _ = tx.send((seen, path.to_string()));
        };
        let result = self.detector.full_scan(&on_progress).await;
        drop(on_progress);
        let _ = writer.await;
        result
    }

    async fn finish_listing(&self, clear_record: bool) -> SyncResult<Vec<StatModel>> {
        let listing = build_listing(
            &self.store,
            &self.settings.remote_base_dir,
            self.filter.as_ref(),
        )
        .await?;
        if clear_record {
            self.store.clear_progress().await?;
        }
        Ok(listing)
    }
}
