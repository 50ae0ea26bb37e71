//! Tracing subscriber setup.

use crate::domain::store_config::DEFAULT_LOG_LEVEL;
use crate::ports::config_port::ConfigPort;
use tracing_subscriber::EnvFilter;

/// Filter directive: `RUST_LOG` wins, then `[log] level`, then the default.
pub fn filter_directive(config: Option<&dyn ConfigPort>) -> String {
    if let Ok(env) = std::env::var(EnvFilter::DEFAULT_ENV) {
        if !env.trim().is_empty() {
            return env;
        }
    }
    config
        .and_then(|c| c.get_string("log", "level"))
        .map(|level| level.trim().to_lowercase())
        .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
}

/// Installs a stderr fmt subscriber. Safe to call more than once; later calls are no-ops.
pub fn init(config: Option<&dyn ConfigPort>) {
    let filter = EnvFilter::try_new(filter_directive(config))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
