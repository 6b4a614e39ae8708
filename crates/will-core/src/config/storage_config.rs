use serde::{Deserialize, Serialize};

use super::defaults;

/// Local offline store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    pub db_path: String,
    /// Busy timeout in milliseconds.
    pub busy_timeout_ms: u32,
    /// Maximum number of buffered increment entries. Past this, new taps are
    /// coalesced into the newest entry instead of appended.
    pub max_buffered_entries: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: defaults::DEFAULT_DB_FILENAME.to_string(),
            busy_timeout_ms: defaults::DEFAULT_BUSY_TIMEOUT_MS,
            max_buffered_entries: defaults::DEFAULT_MAX_BUFFERED_ENTRIES,
        }
    }
}
