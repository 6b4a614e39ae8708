use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::defaults;

/// Sync coordinator and transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Base URL of the counter API. The HTTP remote refuses to build
    /// without one.
    pub endpoint_url: Option<String>,
    /// Minimum time since the last successful sync before another is admitted.
    pub cooldown_secs: u64,
    /// Wait after a reconnect before acting on it.
    pub stabilization_delay_ms: u64,
    /// Upper bound on a single reconciliation call, retries included. Each
    /// transport attempt gets an equal share (see [`Self::attempt_timeout`]).
    pub request_timeout_secs: u64,
    /// Maximum number of transport retry attempts.
    pub max_retries: u32,
    /// Initial backoff between retries (doubles each retry).
    pub initial_backoff_ms: u64,
    /// Backoff ceiling.
    pub max_backoff_ms: u64,
    /// How often the admission policy is re-checked while connected.
    pub recheck_interval_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            endpoint_url: None,
            cooldown_secs: defaults::DEFAULT_COOLDOWN_SECS,
            stabilization_delay_ms: defaults::DEFAULT_STABILIZATION_DELAY_MS,
            request_timeout_secs: defaults::DEFAULT_REQUEST_TIMEOUT_SECS,
            max_retries: defaults::DEFAULT_MAX_RETRIES,
            initial_backoff_ms: defaults::DEFAULT_INITIAL_BACKOFF_MS,
            max_backoff_ms: defaults::DEFAULT_MAX_BACKOFF_MS,
            recheck_interval_secs: defaults::DEFAULT_RECHECK_INTERVAL_SECS,
        }
    }
}

impl SyncConfig {
    pub fn cooldown(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.cooldown_secs as i64)
    }

    pub fn stabilization_delay(&self) -> Duration {
        Duration::from_millis(self.stabilization_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Timeout for one transport attempt: the call budget split across the
    /// first attempt and every retry, never below one millisecond.
    pub fn attempt_timeout(&self) -> Duration {
        let attempts = self.max_retries.saturating_add(1);
        (self.request_timeout() / attempts).max(Duration::from_millis(1))
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    pub fn recheck_interval(&self) -> Duration {
        Duration::from_secs(self.recheck_interval_secs)
    }
}
