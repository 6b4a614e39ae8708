use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{WillError, WillResult};

/// One buffered local increment event (or a coalesced batch of them).
///
/// Persisted as `{ "timestamp": "<RFC 3339>", "count": n }`. Immutable once
/// written; removed only by a confirmed sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingIncrement {
    /// When the (latest) tap in this entry happened.
    pub timestamp: DateTime<Utc>,
    /// Number of taps represented. Always at least 1.
    pub count: u32,
}

impl PendingIncrement {
    /// A single increment of `count` taps stamped now.
    pub fn new(count: u32) -> WillResult<Self> {
        Self::at(Utc::now(), count)
    }

    /// A single increment stamped at `timestamp`.
    pub fn at(timestamp: DateTime<Utc>, count: u32) -> WillResult<Self> {
        if count == 0 {
            return Err(WillError::InvalidIncrement { count });
        }
        Ok(Self { timestamp, count })
    }

    /// One tap, now.
    pub fn tap() -> Self {
        Self {
            timestamp: Utc::now(),
            count: 1,
        }
    }
}

/// Sum of `count` across a buffer.
pub fn total_count(increments: &[PendingIncrement]) -> u64 {
    increments.iter().map(|i| u64::from(i.count)).sum()
}
