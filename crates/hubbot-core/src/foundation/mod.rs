//! Foundation layer - data model and error types.
//!
//! This module contains the building blocks every other layer depends on:
//! - Error taxonomy for transport and bot operations
//! - Canonical message and identity records
//! - Raw and typed inbound events
//! - Payload normalization

pub mod error;
pub mod event;
pub mod message;
pub mod normalize;

pub use error::{BotError, BotResult, TransportError, TransportResult};
pub use event::{HubEvent, InboundEvent, SUBSCRIBED_EVENTS};
pub use message::{BotIdentity, ChatMessage, names_match};
pub use normalize::{decode_html_entities, normalize};
