/// Engine version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Persisted key for the buffered increment sequence.
pub const KEY_OFFLINE_INCREMENTS: &str = "offline_increments";

/// Persisted key for the offline-mode flag.
pub const KEY_OFFLINE_MODE: &str = "offline_mode";

/// Persisted key for the last confirmed sync timestamp.
pub const KEY_LAST_SYNC: &str = "last_sync";

/// Persisted key for the sealed batch currently being reconciled.
pub const KEY_SYNC_IN_FLIGHT: &str = "sync_in_flight";

/// Environment variable consulted for the log filter.
pub const LOG_ENV_VAR: &str = "WILL_LOG";
