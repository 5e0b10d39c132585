//! SyncProgress entity — at most one in-flight record per namespace

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "sync_progress")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub namespace: String,
    pub session_id: String,
    pub start_time_ms: i64,
    pub phase: String,
    pub processed_count: i64,
    pub total_count: i64,
    pub current_path: String,
    /// JSON arrays of paths
    pub pending: Json,
    pub completed: Json,
    pub failed: Json,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
