//! Resumable sync-progress record
//!
//! At most one record exists per namespace. The record is advisory: a
//! later invocation logs its presence and restarts from the root, which
//! is cheap because unchanged subtrees prune immediately.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::now_ms;

/// Phase the in-flight (or abandoned) sync session was last seen in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncPhase {
    Scanning,
    Comparing,
    Syncing,
    Updating,
}

impl SyncPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scanning => "scanning",
            Self::Comparing => "comparing",
            Self::Syncing => "syncing",
            Self::Updating => "updating",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "scanning" => Some(Self::Scanning),
            "comparing" => Some(Self::Comparing),
            "syncing" => Some(Self::Syncing),
            "updating" => Some(Self::Updating),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncProgress {
    pub session_id: String,
    pub start_time_ms: i64,
    pub phase: SyncPhase,
    pub processed_count: u64,
    /// 0 when the total is not yet known
    pub total_count: u64,
    pub current_path: String,
    pub pending: Vec<String>,
    pub completed: Vec<String>,
    pub failed: Vec<String>,
}

impl SyncProgress {
    /// Start a fresh session record in the given phase.
    pub fn begin(phase: SyncPhase) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            start_time_ms: now_ms(),
            phase,
            processed_count: 0,
            total_count: 0,
            current_path: String::new(),
            pending: Vec::new(),
            completed: Vec::new(),
            failed: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_serializes_lowercase() {
        let json = serde_json::to_string(&SyncPhase::Scanning).unwrap();
        assert_eq!(json, "\"scanning\"");
    }

    #[test]
    fn fresh_sessions_are_distinct() {
        let a = SyncProgress::begin(SyncPhase::Comparing);
        let b = SyncProgress::begin(SyncPhase::Comparing);
        assert_ne!(a.session_id, b.session_id);
    }
}
