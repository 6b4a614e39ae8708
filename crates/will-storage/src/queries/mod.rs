//! Raw SQL against the store tables. Callers hold the connection lock.

pub mod kv_ops;
pub mod sync_log_ops;
