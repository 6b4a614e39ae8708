use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Result recorded for a reconciliation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    Synced,
    Failed,
}

impl AttemptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptStatus::Synced => "synced",
            AttemptStatus::Failed => "failed",
        }
    }
}

/// One row of the sync journal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncAttempt {
    pub attempted_at: DateTime<Utc>,
    pub idempotency_key: Uuid,
    pub count: u64,
    pub status: AttemptStatus,
    pub details: String,
}
