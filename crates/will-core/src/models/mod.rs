//! Data model shared by the store, the coordinator, and the transport.

mod counter_record;
mod in_flight;
mod pending_increment;
mod stored;
mod sync_attempt;
mod sync_outcome;
mod user;

pub use counter_record::RemoteCounterRecord;
pub use in_flight::InFlightSync;
pub use pending_increment::{total_count, PendingIncrement};
pub use stored::Stored;
pub use sync_attempt::{AttemptStatus, SyncAttempt};
pub use sync_outcome::{SkipReason, SyncOutcome, SyncState};
pub use user::UserId;
