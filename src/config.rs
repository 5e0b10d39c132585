//! Sync settings supplied by the embedding

use serde::{Deserialize, Serialize};

use crate::shared::paths;

/// Default fan-out for concurrent PROPFINDs during detection and scanning.
pub const DEFAULT_CONCURRENCY: usize = 5;

fn default_base_path() -> String {
    "/".to_string()
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

/// Read-only configuration for one synchronized tree.
///
/// A `(vault_name, remote_base_dir)` pair names one independent index;
/// multiple settings values may share a single database file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Name of the local vault this tree is synchronized for
    pub vault_name: String,

    /// Absolute remote path of the synchronized tree root
    pub remote_base_dir: String,

    /// HTTP path prefix the WebDAV server prepends to hrefs ("/" for none)
    #[serde(default = "default_base_path")]
    pub base_path: String,

    /// Maximum number of sibling directories scanned in parallel
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl SyncSettings {
    pub fn new(vault_name: impl Into<String>, remote_base_dir: &str) -> Self {
        Self {
            vault_name: vault_name.into(),
            remote_base_dir: paths::normalize_path(remote_base_dir),
            base_path: default_base_path(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_base_path(mut self, base_path: &str) -> Self {
        self.base_path = paths::normalize_path(base_path);
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Namespace key scoping all persisted records for this tree.
    pub fn db_key(&self) -> String {
        format!("{}@{}", self.vault_name, self.remote_base_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_base_dir() {
        let settings = SyncSettings::new("notes", "base/");
        assert_eq!(settings.remote_base_dir, "/base");
        assert_eq!(settings.db_key(), "notes@/base");
    }

    #[test]
    fn defaults() {
        let settings = SyncSettings::new("notes", "/base");
        assert_eq!(settings.base_path, "/");
        assert_eq!(settings.concurrency, DEFAULT_CONCURRENCY);
    }
}
