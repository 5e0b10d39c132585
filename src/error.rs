//! Crate-level error types

use thiserror::Error;

use crate::remote::RemoteError;

/// Result type used throughout the sync core
pub type SyncResult<T = ()> = Result<T, SyncError>;

/// Errors surfaced by the index store, detector, and sync driver
#[derive(Debug, Error)]
pub enum SyncError {
    /// Persistent store operation failed
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Remote adapter failure that could not be handled conservatively
    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    /// A persisted record could not be decoded
    #[error("corrupt persisted record: {0}")]
    Corrupt(String),

    /// Filter rule compilation failed
    #[error("invalid filter rule: {0}")]
    Filter(#[from] globset::Error),
}

impl SyncError {
    /// Create a corrupt-record error
    pub fn corrupt<T: std::fmt::Display>(msg: T) -> Self {
        Self::Corrupt(msg.to_string())
    }
}
