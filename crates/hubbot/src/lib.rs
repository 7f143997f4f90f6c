//! # Hubbot
//!
//! An asynchronous bot for a room-based chat hub.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐  events   ┌──────────┐  normalized  ┌───────────────────────────┐
//! │ Transport │──────────▶│   Bot    │─────────────▶│ Handler 1 ─▶ Handler 2 ─▶ │
//! │ (hub RPC) │◀──────────│ (engine) │◀─────────────│ ... first match wins      │
//! └───────────┘  invoke   └──────────┘   bot API    └───────────────────────────┘
//! ```
//!
//! - **Transport**: invocation/event channel to the hub (WebSocket client)
//! - **Bot**: connection lifecycle, room registry, outbound commands
//! - **Handlers**: ordered; the first one returning `Ok(true)` consumes the message
//! - **Runtime**: configuration, logging, auto-join and signal handling
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use hubbot::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = HubbotRuntime::builder().build()?;
//!
//!     runtime.add_handler(handler_fn(|message, bot| async move {
//!         if message.content() != "!ping" {
//!             return Ok(false);
//!         }
//!         bot.reply(message.sender(), "pong", message.room()).await?;
//!         Ok(true)
//!     }));
//!
//!     runtime.run_ws().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config`: read `hubbot.toml` (default)
//! - `yaml-config`: read `hubbot.yaml`
//! - `json-log`: JSON log format
//! - `ws-client`: WebSocket transport and `HubbotRuntime::run_ws`

pub use hubbot_core as core;
pub use hubbot_runtime as runtime;
pub use hubbot_transport as transport;

pub use hubbot_core::{
    Bot, BotError, BotIdentity, BotResult, ChatMessage, ConnectionState, Handler, handler_fn,
};
pub use hubbot_runtime::{HubbotConfig, HubbotRuntime, RuntimeBuilder, RuntimeError};

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use hubbot::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use hubbot_runtime::{HubbotRuntime, RuntimeError};

    // Engine and handlers
    pub use hubbot_core::{
        Bot, BotError, BotIdentity, BoxedHandler, ChatMessage, ConnectionState, Disconnected,
        Handler, Presence, handler_fn,
    };

    // Transport seam for custom implementations
    pub use hubbot_core::{BoxedTransport, EventSink, Transport};

    #[cfg(feature = "ws-client")]
    pub use hubbot_transport::{WsTransport, WsTransportConfig};
}
