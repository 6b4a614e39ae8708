//! # will-observability
//!
//! Tracing subscriber setup and the span macros used by the store and the
//! sync coordinator.

pub mod tracing_setup;

pub use tracing_setup::try_init_from_config;
