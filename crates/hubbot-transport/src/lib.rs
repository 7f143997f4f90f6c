//! # Hubbot Transport
//!
//! Concrete implementations of the hubbot [`Transport`](hubbot_core::Transport)
//! contract.
//!
//! ## Features
//!
//! - `ws-client`: WebSocket client transport ([`WsTransport`])
//! - `full`: every transport
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │  hubbot-core        │  (Transport trait, Bot engine)
//! ├─────────────────────┤
//! │  hubbot-transport   │  <- This crate (implementations + frame codec)
//! ├─────────────────────┤
//! │  Network (TCP/TLS)  │
//! └─────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use hubbot_core::{Bot, BotIdentity};
//! use hubbot_transport::{WsTransport, WsTransportConfig};
//!
//! let transport = Arc::new(WsTransport::new(WsTransportConfig::default()));
//! let bot = Bot::new("wss://hub.example/chat", BotIdentity::new("bot", "pw"), transport);
//! bot.power_up().await?;
//! ```

pub mod frame;

#[cfg(feature = "ws-client")]
pub mod ws;

pub use frame::{FrameState, InboundFrame, InvocationFrame};

#[cfg(feature = "ws-client")]
pub use ws::{USER_HEADER, WsTransport, WsTransportConfig};
