//! davsync
//!
//! Scalable incremental synchronization of a remote WebDAV tree against a
//! locally persisted index. The crate discovers which remote files were
//! added, modified, or deleted since the last observation without
//! re-enumerating the whole tree: cached directory modification times let
//! unchanged subtrees be pruned after a single depth-0 PROPFIND.
//!
//! The embedding supplies the transport (an implementation of
//! [`remote::RemoteDirectory`]) and an optional listing filter; the crate
//! owns the persistent index, the delta detector, the full-scan engine,
//! and the sync driver that ties them together.

pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod operations;
pub mod remote;
pub mod shared;

pub use config::SyncSettings;
pub use domain::{
    ChangeKind, DeltaDetectionResult, DirMtimeEntry, FileChange, FileEntry, IndexStats,
    ScanSummary, StatModel, SyncPhase, SyncProgress,
};
pub use error::{SyncError, SyncResult};
pub use infrastructure::database::Database;
pub use infrastructure::index_store::FileIndexStore;
pub use operations::sync::{
    AcceptAll, DeltaDetector, GlobPatternFilter, PathFilter, ProgressFn, SyncDriver,
};
pub use remote::{Depth, RemoteDirectory, RemoteError, RetryingRemote};
