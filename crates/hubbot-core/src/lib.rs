//! # Hubbot Core
//!
//! The engine of the hubbot chat-hub bot.
//!
//! This crate owns everything between a raw hub connection and user-written
//! handlers: the connection lifecycle, inbound event parsing and message
//! normalization, the room registry, the handler chain and the outbound
//! command encoder. It does not speak any wire protocol itself; that is the
//! job of a [`Transport`].
//!
//! ## Architecture Layers
//!
//! ### Foundation Layer
//!
//! - **Errors**: [`TransportError`] and [`BotError`]
//! - **Data model**: [`ChatMessage`] and [`BotIdentity`]
//! - **Events**: raw [`HubEvent`]s and typed [`InboundEvent`]s
//! - **Normalization**: [`normalize`] and [`decode_html_entities`]
//!
//! ### Framework Layer
//!
//! - **Rooms**: [`RoomRegistry`]
//! - **Handlers**: [`Handler`], [`handler_fn`] and the [`HandlerChain`]
//! - **Commands**: [`Command`] and the send API on [`Bot`]
//! - **Engine**: [`Bot`] and its [`ConnectionState`] machine
//!
//! ### Integration Layer
//!
//! - **Transport**: the [`Transport`] contract consumed by the engine
//!
//! ## Event Flow
//!
//! ```text
//! ┌───────────┐  HubEvent  ┌──────────┐ ChatMessage ┌──────────────┐
//! │ Transport │───────────▶│  Engine  │────────────▶│ HandlerChain │──▶ Handler, Handler, ...
//! └───────────┘            │  (pump)  │             └──────────────┘
//!       ▲                  └──────────┘                    │
//!       │       Send("/leave dev"), Send("@alice hi")      │
//!       └──────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use hubbot_core::{Bot, BotIdentity, handler_fn};
//!
//! let bot = Bot::new("wss://hub.example/chat", BotIdentity::new("bot", "pw"), transport);
//! bot.add_handler(handler_fn(|message, bot| async move {
//!     if message.content() == "!ping" {
//!         bot.reply(message.sender(), "pong", message.room()).await?;
//!         return Ok(true);
//!     }
//!     Ok(false)
//! }));
//!
//! bot.power_up().await?;
//! bot.join("dev").await?;
//! ```

// Architectural layers
pub mod foundation;
pub mod framework;
pub mod integration;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export foundation types
pub use foundation::{
    BotError, BotIdentity, BotResult, ChatMessage, HubEvent, InboundEvent, SUBSCRIBED_EVENTS,
    TransportError, TransportResult, decode_html_entities, names_match, normalize,
};

// Re-export framework types
pub use framework::{
    Bot, BoxedHandler, COMMAND_PREFIX, Command, ConnectionState, Disconnected, FnHandler, Handler,
    HandlerChain, Presence, RoomRegistry, handler_fn,
};

// Re-export integration types
pub use integration::{BoxedTransport, EventSink, JOIN_METHOD, SEND_METHOD, Transport};

/// Prelude for common imports.
pub mod prelude {
    pub use super::foundation::{BotError, BotIdentity, BotResult, ChatMessage};
    pub use super::framework::{
        Bot, BoxedHandler, ConnectionState, Handler, Presence, handler_fn,
    };
}
