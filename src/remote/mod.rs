//! Remote directory capability
//!
//! The sync core consumes exactly one ability from the WebDAV transport:
//! PROPFIND at depth 0 or 1 against an absolute remote path, yielding
//! normalized stat records. Request execution, authentication, XML
//! parsing, and rate limiting live with the embedding; implementations
//! are expected to normalize hrefs with [`crate::shared::paths`] before
//! returning them.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::StatModel;

mod retry;

pub use retry::RetryingRemote;

/// PROPFIND depth. Depth 0 returns the resource itself; depth 1 returns
/// the resource followed by its immediate children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Depth {
    Zero,
    One,
}

/// Errors surfaced by a remote adapter.
#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    /// The target does not exist; interpreted as deletion of the path
    #[error("remote target not found: {0}")]
    NotFound(String),

    /// Transient transport condition (e.g. service unavailable); safe to
    /// retry after a pause
    #[error("remote service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Permanent transport failure (auth, protocol, connection drop)
    #[error("remote transport failed: {0}")]
    Transport(String),
}

impl RemoteError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ServiceUnavailable(_))
    }
}

/// Minimal metadata capability over an opaque WebDAV transport.
#[async_trait]
pub trait RemoteDirectory: Send + Sync {
    /// Stat `path` (depth 0) or list it with its immediate children
    /// (depth 1, the directory itself first).
    async fn propfind(&self, path: &str, depth: Depth) -> Result<Vec<StatModel>, RemoteError>;
}

#[async_trait]
impl<R: RemoteDirectory + ?Sized> RemoteDirectory for std::sync::Arc<R> {
    async fn propfind(&self, path: &str, depth: Depth) -> Result<Vec<StatModel>, RemoteError> {
        (**self).propfind(path, depth).await
    }
}
