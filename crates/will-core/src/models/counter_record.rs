use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::UserId;

/// Server-owned counter row: one per user per calendar day.
///
/// The local buffer never edits this directly. It only changes through the
/// remote increment/merge call, and the client keeps the last snapshot it saw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteCounterRecord {
    pub id: String,
    pub user_id: UserId,
    pub date: NaiveDate,
    pub count: u64,
    #[serde(default)]
    pub timestamps: Vec<DateTime<Utc>>,
}
