//! Configuration module for the hubbot runtime.
//!
//! Layered loading (defaults, files, `HUBBOT_*` environment variables,
//! programmatic overrides) via figment, plus validation.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    BotSection, HubConfig, HubbotConfig, LogFormat, LogLevel, LogOutput, LogRotation,
    LoggingConfig, SpanEventConfig,
};
pub use validation::validate_config;
