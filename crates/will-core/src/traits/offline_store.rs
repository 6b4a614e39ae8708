use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::admission;
use crate::config::defaults::DEFAULT_COOLDOWN_SECS;
use crate::errors::WillResult;
use crate::models::{InFlightSync, PendingIncrement, Stored, SyncAttempt};

/// Durable local persistence for pending increments, the offline flag, and
/// the last-sync marker. No network access.
///
/// Reads return [`Stored`] and never fail; writes return a `WillResult` that
/// callers log and otherwise ignore.
#[async_trait]
pub trait IOfflineStore: Send + Sync {
    // --- Buffer ---

    /// Append one increment to the persisted sequence (read-modify-write).
    async fn store_increment(&self, increment: PendingIncrement) -> WillResult<()>;

    /// The persisted sequence, oldest first. Absent key is an empty sequence.
    async fn get_increments(&self) -> Stored<Vec<PendingIncrement>>;

    /// Delete the persisted sequence entirely, along with any sealed batch
    /// drawn from it.
    async fn clear_increments(&self) -> WillResult<()>;

    /// Remove exactly `count` taps from the front of the sequence and return
    /// the total still buffered.
    async fn settle_increments(&self, count: u64) -> WillResult<u64>;

    /// Sum of `count` across all buffered increments.
    async fn get_increment_count(&self) -> Stored<u64> {
        self.get_increments()
            .await
            .map(|increments| crate::models::total_count(&increments))
    }

    // --- Flags ---

    async fn set_offline_mode(&self, offline: bool) -> WillResult<()>;

    /// Persisted offline flag; `false` when never set.
    async fn is_offline_mode(&self) -> Stored<bool>;

    async fn set_last_sync_time(&self, at: DateTime<Utc>) -> WillResult<()>;

    async fn get_last_sync_time(&self) -> Stored<Option<DateTime<Utc>>>;

    // --- Admission ---

    /// Admission policy evaluated at `now` against `cooldown`. Unavailable
    /// storage is never admitted.
    async fn should_sync_at(&self, now: DateTime<Utc>, cooldown: Duration) -> bool {
        let total = match self.get_increment_count().await {
            Stored::Value(total) => total,
            Stored::Unavailable { .. } => return false,
        };
        let last_sync = match self.get_last_sync_time().await {
            Stored::Value(last) => last,
            Stored::Unavailable { .. } => return false,
        };
        admission::should_sync(total, last_sync, now, cooldown)
    }

    /// Admission policy with the default five-minute cooldown.
    async fn should_sync(&self) -> bool {
        self.should_sync_at(Utc::now(), Duration::seconds(DEFAULT_COOLDOWN_SECS as i64))
            .await
    }

    // --- Reconciliation bookkeeping ---

    /// The batch sealed by an earlier attempt that has not been confirmed.
    async fn in_flight(&self) -> Stored<Option<InFlightSync>>;

    /// Persist a sealed batch before sending it.
    async fn begin_sync(&self, batch: &InFlightSync) -> WillResult<()>;

    /// Atomically settle `batch.count` taps from the buffer and drop the
    /// sealed batch, after the server confirmed it. Returns the total still
    /// buffered.
    async fn complete_sync(&self, batch: &InFlightSync) -> WillResult<u64>;

    /// Drop a sealed batch without settling anything.
    async fn abandon_sync(&self) -> WillResult<()>;

    /// Append an attempt to the sync journal.
    async fn record_attempt(&self, attempt: &SyncAttempt) -> WillResult<()>;
}
