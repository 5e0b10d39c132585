//! Initial migration: file index, directory mtime cache, sync progress

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(FileIndex::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(FileIndex::Namespace).string().not_null())
                    .col(ColumnDef::new(FileIndex::Path).string().not_null())
                    .col(ColumnDef::new(FileIndex::Basename).string().not_null())
                    .col(ColumnDef::new(FileIndex::IsDir).boolean().not_null())
                    .col(ColumnDef::new(FileIndex::Mtime).big_integer().not_null())
                    .col(ColumnDef::new(FileIndex::Size).big_integer().not_null())
                    .col(ColumnDef::new(FileIndex::Etag).string())
                    .col(ColumnDef::new(FileIndex::ContentHash).string())
                    .col(
                        ColumnDef::new(FileIndex::LastSynced)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(FileIndex::ParentPath).string().not_null())
                    .primary_key(
                        Index::create()
                            .col(FileIndex::Namespace)
                            .col(FileIndex::Path),
                    )
                    .to_owned(),
            )
            .await?;

        // Hot path of file-level diffing: direct-children lookups
        manager
            .create_index(
                Index::create()
                    .name("idx_file_index_parent")
                    .table(FileIndex::Table)
                    .col(FileIndex::Namespace)
                    .col(FileIndex::ParentPath)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(DirMtime::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(DirMtime::Namespace).string().not_null())
                    .col(ColumnDef::new(DirMtime::Path).string().not_null())
                    .col(ColumnDef::new(DirMtime::Mtime).big_integer().not_null())
                    .col(
                        ColumnDef::new(DirMtime::LastChecked)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DirMtime::ChildCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .primary_key(Index::create().col(DirMtime::Namespace).col(DirMtime::Path))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SyncProgress::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SyncProgress::Namespace)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SyncProgress::SessionId).string().not_null())
                    .col(
                        ColumnDef::new(SyncProgress::StartTimeMs)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SyncProgress::Phase).string().not_null())
                    .col(
                        ColumnDef::new(SyncProgress::ProcessedCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SyncProgress::TotalCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SyncProgress::CurrentPath)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(SyncProgress::Pending).json().not_null())
                    .col(ColumnDef::new(SyncProgress::Completed).json().not_null())
                    .col(ColumnDef::new(SyncProgress::Failed).json().not_null())
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SyncProgress::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(DirMtime::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(FileIndex::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum FileIndex {
    Table,
    Namespace,
    Path,
    Basename,
    IsDir,
    Mtime,
    Size,
    Etag,
    ContentHash,
    LastSynced,
    ParentPath,
}

#[derive(DeriveIden)]
enum DirMtime {
    Table,
    Namespace,
    Path,
    Mtime,
    LastChecked,
    ChildCount,
}

#[derive(DeriveIden)]
enum SyncProgress {
    Table,
    Namespace,
    SessionId,
    StartTimeMs,
    Phase,
    ProcessedCount,
    TotalCount,
    CurrentPath,
    Pending,
    Completed,
    Failed,
}
