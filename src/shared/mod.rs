//! Shared utilities

pub mod paths;

/// Current time as integer milliseconds since the Unix epoch.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
