//! Tracing setup: structured logging with span definitions.

pub mod spans;

use tracing_subscriber::EnvFilter;

use will_core::config::ObservabilityConfig;
use will_core::constants::LOG_ENV_VAR;

/// Initialize tracing from config. `WILL_LOG` wins over `log_level` when
/// set. Returns `false` if a global subscriber was already installed.
pub fn try_init_from_config(config: &ObservabilityConfig) -> bool {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.json {
        builder.json().try_init().is_ok()
    } else {
        builder.try_init().is_ok()
    }
}
