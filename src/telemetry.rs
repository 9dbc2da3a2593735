//! Logging setup.
//!
//! `RUST_LOG` wins when set; otherwise the configured `LOG_LEVEL` is the
//! default filter.

use crate::config::ObservabilityConfig;

/// Initialize the global logger. Calling it twice is harmless.
pub fn init_logging(config: &ObservabilityConfig) {
    let env = env_logger::Env::new().default_filter_or(config.log_level.as_str());
    if let Err(e) = env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .try_init()
    {
        log::debug!("Logger already initialized: {}", e);
        return;
    }
    log::info!("Logging initialized (default level {})", config.log_level);
}
