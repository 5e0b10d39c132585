//! Database infrastructure using SeaORM
//!
//! One SQLite database holds every namespace's index; all tables carry a
//! `namespace` column and callers scope queries through the store layer.

use std::path::Path;
use std::time::Duration;

use sea_orm::{
    ConnectOptions, ConnectionTrait, Database as SeaDatabase, DatabaseConnection, DbErr, Statement,
};
use sea_orm_migration::MigratorTrait;
use tracing::info;

pub mod entities;
pub mod migration;

/// Database wrapper owning the connection pool.
pub struct Database {
    conn: DatabaseConnection,
}

impl Database {
    /// Open (creating if absent) the database at the given path.
    pub async fn open(path: &Path) -> Result<Self, DbErr> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| DbErr::Custom(format!("Failed to create directory: {e}")))?;
        }

        let db_url = format!("sqlite://{}?mode=rwc", path.display());
        let mut opt = ConnectOptions::new(db_url);
        opt.max_connections(10)
            .min_connections(1)
            .connect_timeout(Duration::from_secs(8))
            .sqlx_logging(false);

        let conn = SeaDatabase::connect(opt).await?;
        // Each record write must be durable before the call returns; WAL
        // with synchronous=NORMAL gives that without per-write fsync cost.
        for pragma in [
            "PRAGMA journal_mode=WAL",
            "PRAGMA synchronous=NORMAL",
            "PRAGMA temp_store=MEMORY",
        ] {
            let _ = conn
                .execute(Statement::from_string(
                    sea_orm::DatabaseBackend::Sqlite,
                    pragma,
                ))
                .await;
        }

        info!("Opened index database at {:?}", path);
        Ok(Self { conn })
    }

    /// In-memory database, used by tests.
    ///
    /// The pool is pinned to a single connection: every pooled connection
    /// to `sqlite::memory:` would otherwise see its own empty database.
    pub async fn in_memory() -> Result<Self, DbErr> {
        let mut opt = ConnectOptions::new("sqlite::memory:");
        opt.max_connections(1).sqlx_logging(false);
        let conn = SeaDatabase::connect(opt).await?;
        Ok(Self { conn })
    }

    /// Run pending migrations.
    pub async fn migrate(&self) -> Result<(), DbErr> {
        migration::Migrator::up(&self.conn, None).await?;
        info!("Index database migrations completed");
        Ok(())
    }

    pub fn conn(&self) -> &DatabaseConnection {
        &self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FileEntry, StatModel};
    use crate::infrastructure::index_store::FileIndexStore;
    use crate::shared::now_ms;

    #[tokio::test]
    async fn file_backed_database_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache").join("index.db");

        {
            let db = Database::open(&path).await.unwrap();
            db.migrate().await.unwrap();
            let store = FileIndexStore::new(&db, "vault@/base");
            let entry =
                FileEntry::from_stat(&StatModel::new("/base/a.txt", false, 100, 10), now_ms());
            store.set(&entry).await.unwrap();
        }

        let db = Database::open(&path).await.unwrap();
        db.migrate().await.unwrap();
        let store = FileIndexStore::new(&db, "vault@/base");
        let loaded = store.get("/base/a.txt").await.unwrap().unwrap();
        assert_eq!(loaded.mtime, 100);
    }
}
