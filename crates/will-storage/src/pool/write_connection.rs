//! Single connection behind `tokio::sync::Mutex`.
//! Serialized access: every read-modify-write of the buffer is atomic with
//! respect to other callers in the process.

use std::path::Path;

use rusqlite::Connection;
use tokio::sync::Mutex;

use will_core::errors::WillResult;

use super::pragmas::apply_pragmas;
use crate::to_storage_err;

/// A single connection protected by an async mutex.
pub struct WriteConnection {
    conn: Mutex<Connection>,
}

impl WriteConnection {
    /// Open a connection to the given database path, run `setup` on it
    /// (migrations), and wrap it.
    pub fn open<S>(path: &Path, busy_timeout_ms: u32, setup: S) -> WillResult<Self>
    where
        S: FnOnce(&mut Connection) -> WillResult<()>,
    {
        let mut conn = Connection::open(path).map_err(|e| to_storage_err(e.to_string()))?;
        apply_pragmas(&conn, busy_timeout_ms)?;
        setup(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory<S>(setup: S) -> WillResult<Self>
    where
        S: FnOnce(&mut Connection) -> WillResult<()>,
    {
        let mut conn = Connection::open_in_memory().map_err(|e| to_storage_err(e.to_string()))?;
        setup(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the lock and execute a closure with the connection.
    pub async fn with_conn<F, T>(&self, f: F) -> WillResult<T>
    where
        F: FnOnce(&mut Connection) -> WillResult<T>,
    {
        let mut guard = self.conn.lock().await;
        f(&mut guard)
    }
}
