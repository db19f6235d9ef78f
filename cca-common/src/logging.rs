//! Tracing subscriber setup shared by every service binary

use crate::config::LoggingConfig;
use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber
///
/// `RUST_LOG` overrides the level from the TOML `[logging]` section.
pub fn init_tracing(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    // try_init: tests and embedded callers may already have a subscriber
    if config.json {
        let _ = builder.json().try_init();
    } else {
        let _ = builder.try_init();
    }
}
