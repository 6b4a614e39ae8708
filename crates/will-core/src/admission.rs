//! Sync admission policy.
//!
//! A sync is admitted only when something is buffered and the last confirmed
//! sync is older than the cooldown (or never happened). This keeps a flapping
//! connection from hammering the network on every reconnect.

use chrono::{DateTime, Duration, Utc};

/// Decide whether a sync attempt may proceed.
pub fn should_sync(
    pending_total: u64,
    last_sync: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    cooldown: Duration,
) -> bool {
    if pending_total == 0 {
        return false;
    }
    match last_sync {
        None => true,
        Some(last) => now.signed_duration_since(last) > cooldown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn five_minutes() -> Duration {
        Duration::minutes(5)
    }

    #[test]
    fn empty_buffer_never_syncs() {
        let now = Utc::now();
        assert!(!should_sync(0, None, now, five_minutes()));
        assert!(!should_sync(0, Some(now - Duration::hours(3)), now, five_minutes()));
    }

    #[test]
    fn first_sync_is_always_admitted() {
        assert!(should_sync(1, None, Utc::now(), five_minutes()));
    }

    #[test]
    fn cooldown_gates_recent_syncs() {
        let now = Utc::now();
        assert!(!should_sync(4, Some(now - Duration::minutes(2)), now, five_minutes()));
        assert!(should_sync(4, Some(now - Duration::minutes(6)), now, five_minutes()));
    }

    #[test]
    fn exactly_at_cooldown_is_not_admitted() {
        let now = Utc::now();
        assert!(!should_sync(1, Some(now - five_minutes()), now, five_minutes()));
    }
}
