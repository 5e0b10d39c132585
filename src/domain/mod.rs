//! Data model shared between the store, detector, and driver

pub mod change;
pub mod entry;
pub mod progress;

pub use change::{ChangeKind, DeltaDetectionResult, FileChange, IndexStats, ScanSummary};
pub use entry::{DirMtimeEntry, FileEntry, StatModel};
pub use progress::{SyncPhase, SyncProgress};
