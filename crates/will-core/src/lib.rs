//! # will-core
//!
//! Foundation crate for the Will Counter offline-increment sync engine.
//! Defines the shared models, collaborator traits, errors, config, and
//! constants. Every other crate in the workspace depends on this.

pub mod admission;
pub mod config;
pub mod constants;
pub mod errors;
pub mod models;
pub mod traits;

// Re-export the most commonly used types at the crate root.
pub use config::WillConfig;
pub use errors::{WillError, WillResult};
pub use models::{
    InFlightSync, PendingIncrement, RemoteCounterRecord, SkipReason, Stored, SyncOutcome,
    SyncState, UserId,
};
