//! FileEntry entity — one row per known remote path

use sea_orm::entity::prelude::*;

use crate::domain::FileEntry;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "file_index")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub namespace: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub path: String,
    pub basename: String,
    pub is_dir: bool,
    pub mtime: i64,
    pub size: i64,
    pub etag: Option<String>,
    pub content_hash: Option<String>,
    pub last_synced: i64,
    pub parent_path: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for FileEntry {
    fn from(model: Model) -> Self {
        Self {
            path: model.path,
            basename: model.basename,
            is_dir: model.is_dir,
            mtime: model.mtime,
            size: model.size,
            etag: model.etag,
            content_hash: model.content_hash,
            last_synced: model.last_synced,
            parent_path: model.parent_path,
        }
    }
}

