//! SeaORM entities for the persisted index

pub mod dir_mtime;
pub mod file_entry;
pub mod sync_progress;
