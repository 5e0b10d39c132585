//! DirMtime entity — cached modification time per known directory

use sea_orm::entity::prelude::*;

use crate::domain::DirMtimeEntry;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "dir_mtime")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub namespace: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub path: String,
    pub mtime: i64,
    pub last_checked: i64,
    pub child_count: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for DirMtimeEntry {
    fn from(model: Model) -> Self {
        Self {
            path: model.path,
            mtime: model.mtime,
            last_checked: model.last_checked,
            child_count: model.child_count,
        }
    }
}

