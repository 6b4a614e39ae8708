//! Span definitions per subsystem: offline store and sync coordinator.

/// Create a sync span.
#[macro_export]
macro_rules! sync_span {
    ($trigger:expr) => {
        tracing::info_span!("will.sync", trigger = %$trigger)
    };
}

/// Create a store span.
#[macro_export]
macro_rules! store_span {
    ($operation:expr) => {
        tracing::debug_span!("will.store", operation = %$operation)
    };
}

/// Span names as constants for programmatic use.
pub mod names {
    pub const SYNC: &str = "will.sync";
    pub const STORE: &str = "will.store";
}
