//! Configuration
//!
//! - SynthesisConfig: per-call settings with a validating builder
//! - SynthesisSettings: `PIPER_*` environment / YAML settings, model lookup
//! - LoggingConfig: tracing subscriber setup

pub mod logging;
pub mod settings;
pub mod synthesis;

pub use logging::{init_logging, LoggingConfig};
pub use settings::{SynthesisSettings, ENV_PREFIX};
pub use synthesis::{SynthesisConfig, SynthesisConfigBuilder};
