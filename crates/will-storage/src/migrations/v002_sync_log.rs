//! v002: sync_log.

use rusqlite::Connection;

use will_core::errors::WillResult;

use crate::to_storage_err;

pub fn migrate(conn: &Connection) -> WillResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS sync_log (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            attempted_at    TEXT NOT NULL,
            idempotency_key TEXT NOT NULL,
            count           INTEGER NOT NULL,
            status          TEXT NOT NULL,
            details         TEXT NOT NULL DEFAULT ''
        );

        CREATE INDEX IF NOT EXISTS idx_sync_log_status ON sync_log(status);
        ",
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}
