//! SQLite-backed `IOfflineStore`. Migrations run when the store is opened.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::de::DeserializeOwned;

use will_core::config::StorageConfig;
use will_core::constants::{
    KEY_LAST_SYNC, KEY_OFFLINE_INCREMENTS, KEY_OFFLINE_MODE, KEY_SYNC_IN_FLIGHT,
};
use will_core::errors::{StorageError, WillResult};
use will_core::models::{
    total_count, AttemptStatus, InFlightSync, PendingIncrement, Stored, SyncAttempt,
};
use will_core::traits::IOfflineStore;

use crate::buffer;
use crate::migrations;
use crate::pool::WriteConnection;
use crate::queries::{kv_ops, sync_log_ops};

/// Key that receives an undecodable increment sequence before a fresh one is
/// started in its place.
const KEY_QUARANTINE: &str = "offline_increments_corrupt";

/// The local offline store.
pub struct OfflineStore {
    conn: WriteConnection,
    max_buffered_entries: usize,
}

impl OfflineStore {
    /// Open the store at `config.db_path`.
    pub fn open(config: &StorageConfig) -> WillResult<Self> {
        Self::open_path(Path::new(&config.db_path), config)
    }

    /// Open the store at an explicit path, taking limits from `config`.
    pub fn open_path(path: &Path, config: &StorageConfig) -> WillResult<Self> {
        let conn = WriteConnection::open(path, config.busy_timeout_ms, migrations::run_migrations)?;
        tracing::debug!(path = %path.display(), "storage: opened offline store");
        Ok(Self {
            conn,
            max_buffered_entries: config.max_buffered_entries,
        })
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> WillResult<Self> {
        Self::open_in_memory_with_capacity(StorageConfig::default().max_buffered_entries)
    }

    /// Open an in-memory store with a custom buffer bound.
    pub fn open_in_memory_with_capacity(max_buffered_entries: usize) -> WillResult<Self> {
        let conn = WriteConnection::open_in_memory(migrations::run_migrations)?;
        Ok(Self {
            conn,
            max_buffered_entries,
        })
    }

    /// Maximum number of buffered entries before coalescing kicks in.
    pub fn max_buffered_entries(&self) -> usize {
        self.max_buffered_entries
    }

    /// Applied schema version.
    pub async fn schema_version(&self) -> WillResult<u32> {
        self.conn
            .with_conn(|conn| migrations::current_version(conn))
            .await
    }

    /// Most recent sync attempts, newest first.
    pub async fn recent_attempts(&self, limit: usize) -> WillResult<Vec<SyncAttempt>> {
        self.conn
            .with_conn(|conn| sync_log_ops::recent_attempts(conn, limit))
            .await
    }

    /// Number of journaled attempts with the given status.
    pub async fn attempt_count(&self, status: AttemptStatus) -> WillResult<usize> {
        self.conn
            .with_conn(|conn| sync_log_ops::count_by_status(conn, status))
            .await
    }

    /// Read and decode a JSON value, degrading failures to `Unavailable`.
    async fn read_json<T: DeserializeOwned>(&self, key: &'static str) -> Stored<Option<T>> {
        let raw = match self.conn.with_conn(|conn| kv_ops::get(conn, key)).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(key, "storage: read failed: {e}");
                return Stored::unavailable(e.to_string());
            }
        };
        match raw {
            None => Stored::Value(None),
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(value) => Stored::Value(Some(value)),
                Err(e) => {
                    tracing::warn!(key, "storage: corrupt value: {e}");
                    Stored::unavailable(format!("corrupt value under {key}: {e}"))
                }
            },
        }
    }

    async fn write(&self, key: &'static str, value: String) -> WillResult<()> {
        let result = self
            .conn
            .with_conn(|conn| kv_ops::put(conn, key, &value))
            .await;
        if let Err(ref e) = result {
            tracing::warn!(key, "storage: write failed: {e}");
        }
        result
    }

    async fn remove(&self, key: &'static str) -> WillResult<()> {
        let result = self.conn.with_conn(|conn| kv_ops::delete(conn, key)).await;
        if let Err(ref e) = result {
            tracing::warn!(key, "storage: delete failed: {e}");
        }
        result
    }
}

/// Decode the persisted sequence, moving undecodable data aside so new taps
/// can still be recorded. A sealed batch refers to the old sequence and is
/// dropped with it.
fn load_or_quarantine(conn: &Connection) -> WillResult<Vec<PendingIncrement>> {
    let Some(raw) = kv_ops::get(conn, KEY_OFFLINE_INCREMENTS)? else {
        return Ok(Vec::new());
    };
    match serde_json::from_str(&raw) {
        Ok(increments) => Ok(increments),
        Err(e) => {
            tracing::warn!("storage: quarantining corrupt increment buffer: {e}");
            kv_ops::put(conn, KEY_QUARANTINE, &raw)?;
            kv_ops::delete(conn, KEY_SYNC_IN_FLIGHT)?;
            Ok(Vec::new())
        }
    }
}

fn save_increments(conn: &Connection, increments: &[PendingIncrement]) -> WillResult<()> {
    if increments.is_empty() {
        kv_ops::delete(conn, KEY_OFFLINE_INCREMENTS)
    } else {
        kv_ops::put(conn, KEY_OFFLINE_INCREMENTS, &serde_json::to_string(increments)?)
    }
}

/// Remove `count` taps from the front of the buffer, returning what remains.
fn settle_in(conn: &Connection, count: u64) -> WillResult<u64> {
    let mut increments: Vec<PendingIncrement> = match kv_ops::get(conn, KEY_OFFLINE_INCREMENTS)? {
        None => Vec::new(),
        Some(raw) => serde_json::from_str(&raw).map_err(|e| StorageError::CorruptValue {
            key: KEY_OFFLINE_INCREMENTS.to_string(),
            details: e.to_string(),
        })?,
    };
    let settled = buffer::settle(&mut increments, count);
    if settled < count {
        tracing::warn!(
            expected = count,
            settled,
            "storage: buffer held fewer taps than the settled batch"
        );
    }
    save_increments(conn, &increments)?;
    Ok(total_count(&increments))
}

fn begin(conn: &mut Connection) -> WillResult<rusqlite::Transaction<'_>> {
    conn.transaction()
        .map_err(|e| crate::to_storage_err(e.to_string()))
}

fn commit(tx: rusqlite::Transaction<'_>) -> WillResult<()> {
    tx.commit().map_err(|e| crate::to_storage_err(e.to_string()))
}

#[async_trait]
impl IOfflineStore for OfflineStore {
    async fn store_increment(&self, increment: PendingIncrement) -> WillResult<()> {
        let max_entries = self.max_buffered_entries;
        let result = self
            .conn
            .with_conn(|conn| {
                let tx = begin(conn)?;
                let mut increments = load_or_quarantine(&tx)?;
                if buffer::append(&mut increments, increment, max_entries) {
                    tracing::debug!(max_entries, "storage: buffer full, coalesced increment");
                }
                save_increments(&tx, &increments)?;
                commit(tx)
            })
            .await;
        if let Err(ref e) = result {
            tracing::warn!("storage: failed to buffer increment: {e}");
        }
        result
    }

    async fn get_increments(&self) -> Stored<Vec<PendingIncrement>> {
        self.read_json(KEY_OFFLINE_INCREMENTS)
            .await
            .map(Option::unwrap_or_default)
    }

    async fn clear_increments(&self) -> WillResult<()> {
        let result = self
            .conn
            .with_conn(|conn| {
                let tx = begin(conn)?;
                kv_ops::delete(&tx, KEY_OFFLINE_INCREMENTS)?;
                kv_ops::delete(&tx, KEY_SYNC_IN_FLIGHT)?;
                commit(tx)
            })
            .await;
        if let Err(ref e) = result {
            tracing::warn!("storage: failed to clear increments: {e}");
        }
        result
    }

    async fn settle_increments(&self, count: u64) -> WillResult<u64> {
        let result = self
            .conn
            .with_conn(|conn| {
                let tx = begin(conn)?;
                let remaining = settle_in(&tx, count)?;
                commit(tx)?;
                Ok(remaining)
            })
            .await;
        if let Err(ref e) = result {
            tracing::warn!("storage: failed to settle increments: {e}");
        }
        result
    }

    async fn set_offline_mode(&self, offline: bool) -> WillResult<()> {
        self.write(KEY_OFFLINE_MODE, offline.to_string()).await
    }

    async fn is_offline_mode(&self) -> Stored<bool> {
        self.read_json(KEY_OFFLINE_MODE)
            .await
            .map(Option::unwrap_or_default)
    }

    async fn set_last_sync_time(&self, at: DateTime<Utc>) -> WillResult<()> {
        self.write(KEY_LAST_SYNC, at.to_rfc3339()).await
    }

    async fn get_last_sync_time(&self) -> Stored<Option<DateTime<Utc>>> {
        let raw = match self
            .conn
            .with_conn(|conn| kv_ops::get(conn, KEY_LAST_SYNC))
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("storage: failed to read last sync time: {e}");
                return Stored::unavailable(e.to_string());
            }
        };
        match raw {
            None => Stored::Value(None),
            Some(raw) => match DateTime::parse_from_rfc3339(&raw) {
                Ok(at) => Stored::Value(Some(at.with_timezone(&Utc))),
                Err(e) => {
                    tracing::warn!("storage: corrupt last sync time {raw:?}: {e}");
                    Stored::unavailable(format!("corrupt value under {KEY_LAST_SYNC}: {e}"))
                }
            },
        }
    }

    async fn in_flight(&self) -> Stored<Option<InFlightSync>> {
        self.read_json(KEY_SYNC_IN_FLIGHT).await
    }

    async fn begin_sync(&self, batch: &InFlightSync) -> WillResult<()> {
        self.write(KEY_SYNC_IN_FLIGHT, serde_json::to_string(batch)?)
            .await
    }

    async fn complete_sync(&self, batch: &InFlightSync) -> WillResult<u64> {
        let count = batch.count;
        let key = batch.idempotency_key;
        let result = self
            .conn
            .with_conn(|conn| {
                let tx = begin(conn)?;
                let remaining = settle_in(&tx, count)?;
                let sealed: Option<InFlightSync> = kv_ops::get(&tx, KEY_SYNC_IN_FLIGHT)?
                    .and_then(|raw| serde_json::from_str(&raw).ok());
                match sealed {
                    Some(sealed) if sealed.idempotency_key != key => {
                        tracing::warn!(%key, sealed = %sealed.idempotency_key, "storage: sealed batch changed underneath completion");
                    }
                    _ => kv_ops::delete(&tx, KEY_SYNC_IN_FLIGHT)?,
                }
                commit(tx)?;
                Ok(remaining)
            })
            .await;
        if let Err(ref e) = result {
            tracing::warn!("storage: failed to complete sync: {e}");
        }
        result
    }

    async fn abandon_sync(&self) -> WillResult<()> {
        self.remove(KEY_SYNC_IN_FLIGHT).await
    }

    async fn record_attempt(&self, attempt: &SyncAttempt) -> WillResult<()> {
        let result = self
            .conn
            .with_conn(|conn| sync_log_ops::insert_attempt(conn, attempt))
            .await;
        if let Err(ref e) = result {
            tracing::warn!("storage: failed to journal sync attempt: {e}");
        }
        result
    }
}
