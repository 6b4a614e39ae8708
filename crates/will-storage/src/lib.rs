//! # will-storage
//!
//! SQLite persistence for the offline store: the buffered increment
//! sequence, the offline flag, the last-sync marker, the sealed in-flight
//! batch, and an append-only journal of sync attempts.

pub mod buffer;
pub mod engine;
pub mod migrations;
pub mod pool;
pub mod queries;

pub use engine::OfflineStore;

use will_core::errors::{StorageError, WillError};

/// Wrap a SQLite error message as a [`WillError`].
pub(crate) fn to_storage_err(message: String) -> WillError {
    StorageError::SqliteError { message }.into()
}
