//! Hubbot Runtime - configuration, logging and the run loop.
//!
//! This crate provides:
//! - Layered configuration (`HubbotConfig`, `ConfigLoader`)
//! - Logging setup (`LoggingBuilder`)
//! - The runner (`HubbotRuntime`): build the bot, power up, join the
//!   configured rooms, wait for a stop signal, shut down
//!
//! ```ignore
//! use hubbot_runtime::HubbotRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = HubbotRuntime::builder().build()?;
//!     runtime.add_handler(MyHandler);
//!
//!     // Run until Ctrl+C
//!     runtime.run_ws().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

// Re-exports
pub use config::{
    BotSection, ConfigError, ConfigLoader, ConfigResult, HubConfig, HubbotConfig, LoggingConfig,
    Profile,
};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{HubbotRuntime, RuntimeBuilder};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
///
/// This provides all the commonly used logging macros:
/// - `trace!`, `debug!`, `info!`, `warn!`, `error!`
/// - `instrument` attribute
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
