//! Schema migrations, applied in order and tracked in `schema_version`.

mod v001_kv_store;
mod v002_sync_log;

use rusqlite::Connection;

use will_core::errors::{StorageError, WillResult};

use crate::to_storage_err;

type MigrationFn = fn(&Connection) -> WillResult<()>;

const MIGRATIONS: &[(u32, MigrationFn)] = &[
    (1, v001_kv_store::migrate),
    (2, v002_sync_log::migrate),
];

/// Latest schema version known to this build.
pub const LATEST_VERSION: u32 = 2;

/// Bring the database up to [`LATEST_VERSION`].
pub fn run_migrations(conn: &mut Connection) -> WillResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version    INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );",
    )
    .map_err(|e| to_storage_err(e.to_string()))?;

    let current = current_version(conn)?;
    for &(version, migrate) in MIGRATIONS.iter().filter(|(v, _)| *v > current) {
        let tx = conn
            .transaction()
            .map_err(|e| to_storage_err(e.to_string()))?;
        migrate(&tx).map_err(|e| StorageError::MigrationFailed {
            version,
            reason: e.to_string(),
        })?;
        tx.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [version],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
        tx.commit().map_err(|e| to_storage_err(e.to_string()))?;
        tracing::debug!(version, "storage: applied migration");
    }
    Ok(())
}

/// Highest applied migration, 0 on a fresh database.
pub fn current_version(conn: &Connection) -> WillResult<u32> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )
    .map_err(|e| to_storage_err(e.to_string()))
}
