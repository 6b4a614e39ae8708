use std::fmt;

use super::RemoteCounterRecord;

/// Coordinator state per app session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncState {
    /// No sync in flight.
    #[default]
    Idle,
    /// Connectivity just came back; waiting for it to settle.
    AwaitingStabilization,
    /// A reconciliation request is in flight.
    Syncing,
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncState::Idle => "idle",
            SyncState::AwaitingStabilization => "awaiting_stabilization",
            SyncState::Syncing => "syncing",
        };
        f.write_str(name)
    }
}

/// Why a sync attempt did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoUser,
    InFlight,
    NothingPending,
    /// Buffered taps exist but the cooldown since the last sync has not elapsed.
    NotAdmitted,
    Offline,
    StorageUnavailable,
}

/// Result of one `sync_offline_data` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The server applied `applied` taps and returned its record.
    Synced {
        applied: u64,
        record: RemoteCounterRecord,
    },
    /// A guard declined the attempt; nothing changed.
    Skipped(SkipReason),
    /// The call failed; `retained` taps remain buffered for a later attempt.
    Failed { reason: String, retained: u64 },
}

impl SyncOutcome {
    pub fn is_synced(&self) -> bool {
        matches!(self, SyncOutcome::Synced { .. })
    }
}
