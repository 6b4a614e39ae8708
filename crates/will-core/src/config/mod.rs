//! Layered TOML configuration. Every section is `#[serde(default)]`, so an
//! empty or partial file yields the documented defaults.
//!
//! # Examples
//!
//! ```
//! use will_core::config::WillConfig;
//!
//! let config = WillConfig::from_toml("[sync]\ncooldown_secs = 60\n").unwrap();
//! assert_eq!(config.sync.cooldown_secs, 60);
//! assert_eq!(config.sync.stabilization_delay_ms, 2_000);
//! ```

pub mod defaults;
mod observability_config;
mod storage_config;
mod sync_config;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{WillError, WillResult};

pub use observability_config::ObservabilityConfig;
pub use storage_config::StorageConfig;
pub use sync_config::SyncConfig;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WillConfig {
    pub storage: StorageConfig,
    pub sync: SyncConfig,
    pub observability: ObservabilityConfig,
}

impl WillConfig {
    /// Parse configuration from a TOML string.
    pub fn from_toml(source: &str) -> WillResult<Self> {
        toml::from_str(source).map_err(|e| WillError::ConfigError {
            reason: e.to_string(),
        })
    }

    /// Load configuration from a TOML file on disk.
    pub fn from_file(path: &Path) -> WillResult<Self> {
        let source = std::fs::read_to_string(path).map_err(|e| WillError::ConfigError {
            reason: format!("failed to read {}: {e}", path.display()),
        })?;
        Self::from_toml(&source)
    }
}
