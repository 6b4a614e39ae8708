//! Append-only journal of reconciliation attempts.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use will_core::errors::{StorageError, WillResult};
use will_core::models::{AttemptStatus, SyncAttempt};

use crate::to_storage_err;

pub fn insert_attempt(conn: &Connection, attempt: &SyncAttempt) -> WillResult<()> {
    conn.execute(
        "INSERT INTO sync_log (attempted_at, idempotency_key, count, status, details)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            attempt.attempted_at.to_rfc3339(),
            attempt.idempotency_key.to_string(),
            attempt.count as i64,
            attempt.status.as_str(),
            attempt.details,
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

/// Most recent attempts, newest first.
pub fn recent_attempts(conn: &Connection, limit: usize) -> WillResult<Vec<SyncAttempt>> {
    let mut stmt = conn
        .prepare(
            "SELECT attempted_at, idempotency_key, count, status, details
             FROM sync_log ORDER BY id DESC LIMIT ?1",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;

    let rows = stmt
        .query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut attempts = Vec::new();
    for row in rows {
        let (attempted_at, key, count, status, details) =
            row.map_err(|e| to_storage_err(e.to_string()))?;
        attempts.push(SyncAttempt {
            attempted_at: parse_time(&attempted_at)?,
            idempotency_key: Uuid::parse_str(&key).map_err(|e| corrupt(e.to_string()))?,
            count: count.max(0) as u64,
            status: parse_status(&status)?,
            details,
        });
    }
    Ok(attempts)
}

/// Number of journal rows with the given status.
pub fn count_by_status(conn: &Connection, status: AttemptStatus) -> WillResult<usize> {
    conn.query_row(
        "SELECT COUNT(*) FROM sync_log WHERE status = ?1",
        params![status.as_str()],
        |row| row.get::<_, i64>(0),
    )
    .map(|n| n as usize)
    .map_err(|e| to_storage_err(e.to_string()))
}

fn parse_time(raw: &str) -> WillResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| corrupt(e.to_string()))
}

fn parse_status(raw: &str) -> WillResult<AttemptStatus> {
    match raw {
        "synced" => Ok(AttemptStatus::Synced),
        "failed" => Ok(AttemptStatus::Failed),
        other => Err(corrupt(format!("unknown status {other}"))),
    }
}

fn corrupt(details: String) -> will_core::WillError {
    StorageError::CorruptValue {
        key: "sync_log".to_string(),
        details,
    }
    .into()
}
