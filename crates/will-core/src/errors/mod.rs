//! Error taxonomy for the sync engine.
//!
//! Sub-errors are grouped by layer and lifted into [`WillError`] with `?`.
//! Nothing in this taxonomy is fatal: callers degrade to stale or pending
//! data rather than aborting.

mod storage_error;
mod sync_error;

pub use storage_error::StorageError;
pub use sync_error::SyncError;

/// Top-level error for every fallible operation in the workspace.
#[derive(Debug, thiserror::Error)]
pub enum WillError {
    #[error("storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("sync error: {0}")]
    SyncError(#[from] SyncError),

    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    #[error("invalid increment: count must be at least 1, got {count}")]
    InvalidIncrement { count: u32 },
}

/// Result alias used across the workspace.
pub type WillResult<T> = Result<T, WillError>;

impl WillError {
    /// Whether this error came from the network layer and is worth retrying
    /// once connectivity settles.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            WillError::SyncError(SyncError::NetworkError { .. } | SyncError::Timeout { .. })
        )
    }
}
