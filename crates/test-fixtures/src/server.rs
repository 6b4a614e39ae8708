use std::collections::{HashMap, HashSet};

use chrono::Utc;
use uuid::Uuid;

use will_core::models::{RemoteCounterRecord, UserId};

/// Reference server: one record per user for today, batches deduplicated by
/// idempotency key.
#[derive(Debug, Default)]
pub struct IdempotentServer {
    records: HashMap<UserId, RemoteCounterRecord>,
    seen: HashSet<Uuid>,
    applications: usize,
}

impl IdempotentServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start `user` at `count` for today.
    pub fn seed(&mut self, user: &UserId, count: u64) {
        self.record_mut(user).count = count;
    }

    /// Add `count` unless `key` was already applied. Returns today's record.
    pub fn apply(&mut self, user: &UserId, count: u64, key: Uuid) -> RemoteCounterRecord {
        if self.seen.insert(key) {
            self.applications += 1;
            let now = Utc::now();
            let record = self.record_mut(user);
            record.count += count;
            record.timestamps.push(now);
        }
        self.record_mut(user).clone()
    }

    pub fn today(&self, user: &UserId) -> Option<RemoteCounterRecord> {
        self.records.get(user).cloned()
    }

    pub fn count_for(&self, user: &UserId) -> u64 {
        self.records.get(user).map_or(0, |r| r.count)
    }

    /// Batches applied, excluding deduplicated resends.
    pub fn applications(&self) -> usize {
        self.applications
    }

    fn record_mut(&mut self, user: &UserId) -> &mut RemoteCounterRecord {
        self.records.entry(user.clone()).or_insert_with(|| {
            let date = Utc::now().date_naive();
            RemoteCounterRecord {
                id: format!("{user}-{date}"),
                user_id: user.clone(),
                date,
                count: 0,
                timestamps: Vec::new(),
            }
        })
    }
}
