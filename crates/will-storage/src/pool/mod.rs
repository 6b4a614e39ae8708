//! Connection handling. The store is a handful of keys, so a single
//! serialized connection serves both reads and writes.

pub mod pragmas;
pub mod write_connection;

pub use write_connection::WriteConnection;
