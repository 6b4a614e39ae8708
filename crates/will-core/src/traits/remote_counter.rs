use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::WillResult;
use crate::models::{RemoteCounterRecord, UserId};

/// The remote counter service.
#[async_trait]
pub trait IRemoteCounter: Send + Sync {
    /// Add `count` taps to today's record for `user` in one call.
    ///
    /// The server is expected to deduplicate by `idempotency_key`: resending
    /// a key it has already applied returns the record without re-applying.
    async fn apply_offline_increments(
        &self,
        user: &UserId,
        count: u64,
        idempotency_key: Uuid,
    ) -> WillResult<RemoteCounterRecord>;

    /// Today's record for `user`, if one exists.
    async fn fetch_today(&self, user: &UserId) -> WillResult<Option<RemoteCounterRecord>>;
}
