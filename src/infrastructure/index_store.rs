//! Persistent file-index store
//!
//! Three logically distinct maps backed by one SQLite database: the file
//! index (path → entry), the directory mtime cache, and the sync-progress
//! record. Every operation is scoped to the namespace fixed at
//! construction, so independent trees coexist in a single database file.
//!
//! Each individual row write is durable before the call returns. Batches
//! are chunked at [`BATCH_CHUNK`] rows and are not cross-row
//! transactional: partial progress on crash is acceptable and is repaired
//! by the next full scan. `get_by_prefix` is a streaming scan over the
//! namespace; the hot path of file-level diffing goes through
//! `get_by_parent`, which is served by a secondary index.

use futures::TryStreamExt;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect,
};
use tracing::debug;

use super::database::entities::{dir_mtime, file_entry, sync_progress};
use super::database::Database;
use crate::domain::{DirMtimeEntry, FileEntry, SyncPhase, SyncProgress};
use crate::error::{SyncError, SyncResult};

/// Maximum rows per batched insert/delete statement.
pub const BATCH_CHUNK: usize = 1000;

pub struct FileIndexStore {
    conn: DatabaseConnection,
    namespace: String,
}

impl FileIndexStore {
    pub fn new(db: &Database, namespace: impl Into<String>) -> Self {
        Self {
            conn: db.conn().clone(),
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    // ---- file index ----

    pub async fn get(&self, path: &str) -> SyncResult<Option<FileEntry>> {
        let found = file_entry::Entity::find_by_id((self.namespace.clone(), path.to_string()))
            .one(&self.conn)
            .await?;
        Ok(found.map(FileEntry::from))
    }

    pub async fn set(&self, entry: &FileEntry) -> SyncResult<()> {
        file_entry::Entity::insert(self.file_active(entry))
            .on_conflict(file_upsert())
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    pub async fn delete(&self, path: &str) -> SyncResult<()> {
        file_entry::Entity::delete_by_id((self.namespace.clone(), path.to_string()))
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    pub async fn batch_set(&self, entries: &[FileEntry]) -> SyncResult<()> {
        for chunk in entries.chunks(BATCH_CHUNK) {
            file_entry::Entity::insert_many(chunk.iter().map(|e| self.file_active(e)))
                .on_conflict(file_upsert())
                .on_empty_do_nothing()
                .exec(&self.conn)
                .await?;
        }
        debug!(count = entries.len(), "batch-set file entries");
        Ok(())
    }

    pub async fn batch_delete(&self, paths: &[String]) -> SyncResult<()> {
        for chunk in paths.chunks(BATCH_CHUNK) {
            file_entry::Entity::delete_many()
                .filter(file_entry::Column::Namespace.eq(&self.namespace))
                .filter(file_entry::Column::Path.is_in(chunk.iter().cloned()))
                .exec(&self.conn)
                .await?;
        }
        debug!(count = paths.len(), "batch-deleted file entries");
        Ok(())
    }

    /// Paged listing of the direct children of `parent`, ordered by path.
    pub async fn get_by_parent(
        &self,
        parent: &str,
        offset: u64,
        limit: u64,
    ) -> SyncResult<Vec<FileEntry>> {
        let rows = file_entry::Entity::find()
            .filter(file_entry::Column::Namespace.eq(&self.namespace))
            .filter(file_entry::Column::ParentPath.eq(parent))
            .order_by_asc(file_entry::Column::Path)
            .offset(offset)
            .limit(limit)
            .all(&self.conn)
            .await?;
        Ok(rows.into_iter().map(FileEntry::from).collect())
    }

    /// All direct children of `parent`, paging internally.
    pub async fn children_of(&self, parent: &str) -> SyncResult<Vec<FileEntry>> {
        let mut children = Vec::new();
        let mut offset = 0;
        loop {
            let page = self
                .get_by_parent(parent, offset, BATCH_CHUNK as u64)
                .await?;
            let page_len = page.len();
            children.extend(page);
            if page_len < BATCH_CHUNK {
                return Ok(children);
            }
            offset += page_len as u64;
        }
    }

    /// Entries whose path equals `prefix` or lies underneath it.
    ///
    /// Streaming scan over the namespace; used on deletion of a subtree,
    /// not on the per-sync hot path.
    pub async fn get_by_prefix(&self, prefix: &str) -> SyncResult<Vec<FileEntry>> {
        let descendant_prefix = format!("{prefix}/");
        let mut matches = Vec::new();
        let mut rows = file_entry::Entity::find()
            .filter(file_entry::Column::Namespace.eq(&self.namespace))
            .stream(&self.conn)
            .await?;
        while let Some(model) = rows.try_next().await? {
            if model.path == prefix || model.path.starts_with(&descendant_prefix) {
                matches.push(FileEntry::from(model));
            }
        }
        Ok(matches)
    }

    /// Entries with `mtime > ts_ms`. Table scan; use sparingly.
    pub async fn get_modified_after(&self, ts_ms: i64) -> SyncResult<Vec<FileEntry>> {
        let rows = file_entry::Entity::find()
            .filter(file_entry::Column::Namespace.eq(&self.namespace))
            .filter(file_entry::Column::Mtime.gt(ts_ms))
            .all(&self.conn)
            .await?;
        Ok(rows.into_iter().map(FileEntry::from).collect())
    }

    /// Stream every entry through `visit`; a `false` return short-circuits.
    pub async fn iterate_all<F>(&self, mut visit: F) -> SyncResult<()>
    where
        F: FnMut(FileEntry) -> bool,
    {
        let mut rows = file_entry::Entity::find()
            .filter(file_entry::Column::Namespace.eq(&self.namespace))
            .order_by_asc(file_entry::Column::Path)
            .stream(&self.conn)
            .await?;
        while let Some(model) = rows.try_next().await? {
            if !visit(FileEntry::from(model)) {
                break;
            }
        }
        Ok(())
    }

    pub async fn count(&self) -> SyncResult<u64> {
        let count = file_entry::Entity::find()
            .filter(file_entry::Column::Namespace.eq(&self.namespace))
            .count(&self.conn)
            .await?;
        Ok(count)
    }

    /// File and directory counts, in that order.
    pub async fn counts(&self) -> SyncResult<(u64, u64)> {
        let files = file_entry::Entity::find()
            .filter(file_entry::Column::Namespace.eq(&self.namespace))
            .filter(file_entry::Column::IsDir.eq(false))
            .count(&self.conn)
            .await?;
        let dirs = file_entry::Entity::find()
            .filter(file_entry::Column::Namespace.eq(&self.namespace))
            .filter(file_entry::Column::IsDir.eq(true))
            .count(&self.conn)
            .await?;
        Ok((files, dirs))
    }

    pub async fn all_paths(&self) -> SyncResult<Vec<String>> {
        let paths = file_entry::Entity::find()
            .filter(file_entry::Column::Namespace.eq(&self.namespace))
            .order_by_asc(file_entry::Column::Path)
            .select_only()
            .column(file_entry::Column::Path)
            .into_tuple::<String>()
            .all(&self.conn)
            .await?;
        Ok(paths)
    }

    pub async fn all_dir_paths(&self) -> SyncResult<Vec<String>> {
        let paths = file_entry::Entity::find()
            .filter(file_entry::Column::Namespace.eq(&self.namespace))
            .filter(file_entry::Column::IsDir.eq(true))
            .order_by_asc(file_entry::Column::Path)
            .select_only()
            .column(file_entry::Column::Path)
            .into_tuple::<String>()
            .all(&self.conn)
            .await?;
        Ok(paths)
    }

    pub async fn clear(&self) -> SyncResult<()> {
        file_entry::Entity::delete_many()
            .filter(file_entry::Column::Namespace.eq(&self.namespace))
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    // ---- directory mtime cache ----

    pub async fn dir_mtime(&self, path: &str) -> SyncResult<Option<DirMtimeEntry>> {
        let found = dir_mtime::Entity::find_by_id((self.namespace.clone(), path.to_string()))
            .one(&self.conn)
            .await?;
        Ok(found.map(DirMtimeEntry::from))
    }

    pub async fn set_dir_mtime(&self, entry: &DirMtimeEntry) -> SyncResult<()> {
        let active = dir_mtime::ActiveModel {
            namespace: Set(self.namespace.clone()),
            path: Set(entry.path.clone()),
            mtime: Set(entry.mtime),
            last_checked: Set(entry.last_checked),
            child_count: Set(entry.child_count),
        };
        dir_mtime::Entity::insert(active)
            .on_conflict(
                OnConflict::columns([dir_mtime::Column::Namespace, dir_mtime::Column::Path])
                    .update_columns([
                        dir_mtime::Column::Mtime,
                        dir_mtime::Column::LastChecked,
                        dir_mtime::Column::ChildCount,
                    ])
                    .to_owned(),
            )
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    pub async fn delete_dir_mtime(&self, path: &str) -> SyncResult<()> {
        dir_mtime::Entity::delete_by_id((self.namespace.clone(), path.to_string()))
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    pub async fn all_dir_mtimes(&self) -> SyncResult<Vec<DirMtimeEntry>> {
        let rows = dir_mtime::Entity::find()
            .filter(dir_mtime::Column::Namespace.eq(&self.namespace))
            .all(&self.conn)
            .await?;
        Ok(rows.into_iter().map(DirMtimeEntry::from).collect())
    }

    pub async fn clear_dir_mtimes(&self) -> SyncResult<()> {
        dir_mtime::Entity::delete_many()
            .filter(dir_mtime::Column::Namespace.eq(&self.namespace))
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    // ---- sync progress ----

    pub async fn progress(&self) -> SyncResult<Option<SyncProgress>> {
        let Some(model) = sync_progress::Entity::find_by_id(self.namespace.clone())
            .one(&self.conn)
            .await?
        else {
            return Ok(None);
        };
        let phase = SyncPhase::parse(&model.phase)
            .ok_or_else(|| SyncError::corrupt(format!("unknown sync phase {:?}", model.phase)))?;
        Ok(Some(SyncProgress {
            session_id: model.session_id,
            start_time_ms: model.start_time_ms,
            phase,
            processed_count: model.processed_count.max(0) as u64,
            total_count: model.total_count.max(0) as u64,
            current_path: model.current_path,
            pending: decode_path_list(model.pending)?,
            completed: decode_path_list(model.completed)?,
            failed: decode_path_list(model.failed)?,
        }))
    }

    pub async fn set_progress(&self, progress: &SyncProgress) -> SyncResult<()> {
        let active = sync_progress::ActiveModel {
            namespace: Set(self.namespace.clone()),
            session_id: Set(progress.session_id.clone()),
            start_time_ms: Set(progress.start_time_ms),
            phase: Set(progress.phase.as_str().to_string()),
            processed_count: Set(progress.processed_count as i64),
            total_count: Set(progress.total_count as i64),
            current_path: Set(progress.current_path.clone()),
            pending: Set(encode_path_list(&progress.pending)),
            completed: Set(encode_path_list(&progress.completed)),
            failed: Set(encode_path_list(&progress.failed)),
        };
        sync_progress::Entity::insert(active)
            .on_conflict(
                OnConflict::column(sync_progress::Column::Namespace)
                    .update_columns([
                        sync_progress::Column::SessionId,
                        sync_progress::Column::StartTimeMs,
                        sync_progress::Column::Phase,
                        sync_progress::Column::ProcessedCount,
                        sync_progress::Column::TotalCount,
                        sync_progress::Column::CurrentPath,
                        sync_progress::Column::Pending,
                        sync_progress::Column::Completed,
                        sync_progress::Column::Failed,
                    ])
                    .to_owned(),
            )
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    pub async fn clear_progress(&self) -> SyncResult<()> {
        sync_progress::Entity::delete_by_id(self.namespace.clone())
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    // ---- helpers ----

    fn file_active(&self, entry: &FileEntry) -> file_entry::ActiveModel {
        file_entry::ActiveModel {
            namespace: Set(self.namespace.clone()),
            path: Set(entry.path.clone()),
            basename: Set(entry.basename.clone()),
            is_dir: Set(entry.is_dir),
            mtime: Set(entry.mtime),
            size: Set(entry.size),
            etag: Set(entry.etag.clone()),
            content_hash: Set(entry.content_hash.clone()),
            last_synced: Set(entry.last_synced),
            parent_path: Set(entry.parent_path.clone()),
        }
    }
}

fn file_upsert() -> OnConflict {
    OnConflict::columns([file_entry::Column::Namespace, file_entry::Column::Path])
        .update_columns([
            file_entry::Column::Basename,
            file_entry::Column::IsDir,
            file_entry::Column::Mtime,
            file_entry::Column::Size,
            file_entry::Column::Etag,
            file_entry::Column::ContentHash,
            file_entry::Column::LastSynced,
            file_entry::Column::ParentPath,
        ])
        .to_owned()
}

fn encode_path_list(paths: &[String]) -> serde_json::Value {
    serde_json::Value::Array(
        paths
            .iter()
            .map(|p| serde_json::Value::String(p.clone()))
            .collect(),
    )
}

fn decode_path_list(value: serde_json::Value) -> SyncResult<Vec<String>> {
    serde_json::from_value(value).map_err(SyncError::corrupt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{StatModel, SyncPhase};
    use crate::shared::now_ms;
    use pretty_assertions::assert_eq;

    async fn store() -> FileIndexStore {
        let db = Database::in_memory().await.unwrap();
        db.migrate().await.unwrap();
        FileIndexStore::new(&db, "vault@/base")
    }

    fn file(path: &str, mtime: i64, size: i64) -> FileEntry {
        FileEntry::from_stat(&StatModel::new(path, false, mtime, size), now_ms())
    }

    fn dir(path: &str, mtime: i64) -> FileEntry {
        FileEntry::from_stat(&StatModel::new(path, true, mtime, 0), now_ms())
    }

    #[tokio::test]
    async fn set_get_delete_roundtrip() {
        let store = store().await;
        let entry = file("/base/a.txt", 100, 10);
        store.set(&entry).await.unwrap();
        assert_eq!(store.get("/base/a.txt").await.unwrap(), Some(entry.clone()));

        // Upsert replaces in place
        let newer = file("/base/a.txt", 200, 20);
        store.set(&newer).await.unwrap();
        assert_eq!(store.get("/base/a.txt").await.unwrap(), Some(newer));
        assert_eq!(store.count().await.unwrap(), 1);

        store.delete("/base/a.txt").await.unwrap();
        assert_eq!(store.get("/base/a.txt").await.unwrap(), None);
    }

    #[tokio::test]
    async fn batch_set_handles_empty_and_large_batches() {
        let store = store().await;
        store.batch_set(&[]).await.unwrap();

        let entries: Vec<FileEntry> = (0..2500)
            .map(|i| file(&format!("/base/f{i:04}.txt"), i, 1))
            .collect();
        store.batch_set(&entries).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 2500);

        let paths: Vec<String> = entries.iter().map(|e| e.path.clone()).collect();
        store.batch_delete(&paths).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn get_by_parent_pages_direct_children_only() {
        let store = store().await;
        store.set(&dir("/base/sub", 50)).await.unwrap();
        store.set(&file("/base/a.txt", 100, 1)).await.unwrap();
        store.set(&file("/base/b.txt", 100, 1)).await.unwrap();
        store.set(&file("/base/sub/c.txt", 100, 1)).await.unwrap();

        let children = store.get_by_parent("/base", 0, 10).await.unwrap();
        let paths: Vec<&str> = children.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["/base/a.txt", "/base/b.txt", "/base/sub"]);

        let page = store.get_by_parent("/base", 1, 1).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].path, "/base/b.txt");

        let all = store.children_of("/base").await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn get_by_prefix_respects_segment_boundaries() {
        let store = store().await;
        store.set(&dir("/base/sub", 50)).await.unwrap();
        store.set(&file("/base/sub/x.txt", 100, 1)).await.unwrap();
        store.set(&file("/base/subsidiary", 100, 1)).await.unwrap();

        let matched = store.get_by_prefix("/base/sub").await.unwrap();
        let mut paths: Vec<&str> = matched.iter().map(|e| e.path.as_str()).collect();
        paths.sort();
        assert_eq!(paths, vec!["/base/sub", "/base/sub/x.txt"]);
    }

    #[tokio::test]
    async fn get_modified_after_filters_by_mtime() {
        let store = store().await;
        store.set(&file("/base/old.txt", 100, 1)).await.unwrap();
        store.set(&file("/base/new.txt", 300, 1)).await.unwrap();

        let recent = store.get_modified_after(200).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].path, "/base/new.txt");
    }

    #[tokio::test]
    async fn iterate_all_short_circuits() {
        let store = store().await;
        for i in 0..10 {
            store.set(&file(&format!("/base/f{i}.txt"), i, 1)).await.unwrap();
        }
        let mut visited = 0;
        store
            .iterate_all(|_| {
                visited += 1;
                visited < 3
            })
            .await
            .unwrap();
        assert_eq!(visited, 3);
    }

    #[tokio::test]
    async fn counts_split_files_and_dirs() {
        let store = store().await;
        store.set(&dir("/base", 10)).await.unwrap();
        store.set(&dir("/base/sub", 10)).await.unwrap();
        store.set(&file("/base/a.txt", 100, 1)).await.unwrap();

        assert_eq!(store.counts().await.unwrap(), (1, 2));
        assert_eq!(
            store.all_dir_paths().await.unwrap(),
            vec!["/base".to_string(), "/base/sub".to_string()]
        );
        assert_eq!(store.all_paths().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn namespaces_are_isolated() {
        let db = Database::in_memory().await.unwrap();
        db.migrate().await.unwrap();
        let first = FileIndexStore::new(&db, "vault@/a");
        let second = FileIndexStore::new(&db, "vault@/b");

        first.set(&file("/a/x.txt", 100, 1)).await.unwrap();
        assert_eq!(first.count().await.unwrap(), 1);
        assert_eq!(second.count().await.unwrap(), 0);

        second.clear().await.unwrap();
        assert_eq!(first.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn dir_mtime_cache_roundtrip() {
        let store = store().await;
        let entry = DirMtimeEntry {
            path: "/base".to_string(),
            mtime: 100,
            last_checked: now_ms(),
            child_count: 2,
        };
        store.set_dir_mtime(&entry).await.unwrap();
        assert_eq!(store.dir_mtime("/base").await.unwrap(), Some(entry.clone()));

        let moved = DirMtimeEntry { mtime: 200, ..entry };
        store.set_dir_mtime(&moved).await.unwrap();
        assert_eq!(store.dir_mtime("/base").await.unwrap().unwrap().mtime, 200);

        assert_eq!(store.all_dir_mtimes().await.unwrap().len(), 1);
        store.delete_dir_mtime("/base").await.unwrap();
        assert_eq!(store.dir_mtime("/base").await.unwrap(), None);

        store.set_dir_mtime(&moved).await.unwrap();
        store.clear_dir_mtimes().await.unwrap();
        assert!(store.all_dir_mtimes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn progress_record_roundtrip() {
        let store = store().await;
        assert_eq!(store.progress().await.unwrap(), None);

        let mut progress = SyncProgress::begin(SyncPhase::Scanning);
        progress.pending = vec!["/base/sub".to_string()];
        progress.current_path = "/base".to_string();
        store.set_progress(&progress).await.unwrap();
        assert_eq!(store.progress().await.unwrap(), Some(progress.clone()));

        progress.phase = SyncPhase::Updating;
        progress.completed = std::mem::take(&mut progress.pending);
        store.set_progress(&progress).await.unwrap();
        let loaded = store.progress().await.unwrap().unwrap();
        assert_eq!(loaded.phase, SyncPhase::Updating);
        assert_eq!(loaded.completed, vec!["/base/sub".to_string()]);
        assert!(loaded.pending.is_empty());

        store.clear_progress().await.unwrap();
        assert_eq!(store.progress().await.unwrap(), None);
    }
}
