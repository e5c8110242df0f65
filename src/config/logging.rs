//! Logging configuration

use serde::{Deserialize, Serialize};

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or filter directive (`info`, `sdkwork_piper=debug`)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Include the event target
    #[serde(default)]
    pub with_target: bool,

    /// Include thread ids
    #[serde(default)]
    pub with_thread_ids: bool,

    /// Colored output
    #[serde(default = "default_true")]
    pub ansi: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            with_target: false,
            with_thread_ids: false,
            ansi: true,
        }
    }
}

impl LoggingConfig {
    /// Debug-level logging
    pub fn debug() -> Self {
        Self {
            level: "debug".to_string(),
            ..Self::default()
        }
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. Returns false if a
/// subscriber was already installed.
pub fn init_logging(config: &LoggingConfig) -> bool {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    fmt()
        .with_target(config.with_target)
        .with_thread_ids(config.with_thread_ids)
        .with_file(false)
        .with_line_number(false)
        .with_ansi(config.ansi)
        .with_env_filter(filter)
        .try_init()
        .is_ok()
}
