//! Key-value access on `kv_store`.

use rusqlite::{params, Connection, OptionalExtension};

use will_core::errors::WillResult;

use crate::to_storage_err;

/// Raw value stored under `key`, if any.
pub fn get(conn: &Connection, key: &str) -> WillResult<Option<String>> {
    conn.query_row(
        "SELECT value FROM kv_store WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )
    .optional()
    .map_err(|e| to_storage_err(e.to_string()))
}

/// Insert or replace the value under `key`.
pub fn put(conn: &Connection, key: &str, value: &str) -> WillResult<()> {
    conn.execute(
        "INSERT INTO kv_store (key, value, updated_at)
         VALUES (?1, ?2, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        params![key, value],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

/// Remove `key`. Removing an absent key is not an error.
pub fn delete(conn: &Connection, key: &str) -> WillResult<()> {
    conn.execute("DELETE FROM kv_store WHERE key = ?1", params![key])
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}
