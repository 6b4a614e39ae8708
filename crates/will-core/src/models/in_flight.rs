use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A batch sealed for reconciliation.
///
/// Written before the remote call and removed only after the server confirms
/// it. A retry after any failure resends the same key and count, so a server
/// that deduplicates by key applies the batch at most once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InFlightSync {
    pub idempotency_key: Uuid,
    pub count: u64,
    pub started_at: DateTime<Utc>,
}

impl InFlightSync {
    /// Seal `count` buffered taps under a fresh idempotency key.
    pub fn seal(count: u64) -> Self {
        Self {
            idempotency_key: Uuid::new_v4(),
            count,
            started_at: Utc::now(),
        }
    }
}
