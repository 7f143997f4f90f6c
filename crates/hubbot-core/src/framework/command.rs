//! Outbound command encoding.
//!
//! Every outbound intent ends up as one `Send` invocation carrying either a
//! plain chat line or one of the protocol's slash commands:
//!
//! | intent | text |
//! |--------|------|
//! | create a room | `/create <room>` |
//! | join a room | `/join <room>` |
//! | leave a room | `/leave <room>` |
//! | register the nick | `/nick <name> <secret>` |
//! | private message | `/msg <who> <text>` |
//!
//! Chat lines target a room through the transport's active-room slot, which
//! [`RoomSlot`] hands out one holder at a time.

use std::fmt;

use serde_json::Value;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, trace};

use crate::foundation::error::{BotError, BotResult};
use crate::framework::engine::Bot;
use crate::integration::transport::{SEND_METHOD, Transport};

/// Prefix that turns a line into a protocol command.
pub const COMMAND_PREFIX: char = '/';

/// A protocol command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/create <room>`
    Create { room: String },
    /// `/join <room>`
    Join { room: String },
    /// `/leave <room>`
    Leave { room: String },
    /// `/nick <name> <secret>`
    Nick { name: String, secret: String },
    /// `/msg <who> <text>`
    Msg { who: String, text: String },
}

impl Command {
    /// Returns the command word, without arguments. Safe to log.
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Create { .. } => "create",
            Self::Join { .. } => "join",
            Self::Leave { .. } => "leave",
            Self::Nick { .. } => "nick",
            Self::Msg { .. } => "msg",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create { room } => write!(f, "/create {room}"),
            Self::Join { room } => write!(f, "/join {room}"),
            Self::Leave { room } => write!(f, "/leave {room}"),
            Self::Nick { name, secret } => write!(f, "/nick {name} {secret}"),
            Self::Msg { who, text } => write!(f, "/msg {who} {text}"),
        }
    }
}

/// Rejects empty or whitespace-only required arguments.
pub(crate) fn require<'a>(name: &'static str, value: &'a str) -> BotResult<&'a str> {
    if value.trim().is_empty() {
        Err(BotError::missing(name))
    } else {
        Ok(value)
    }
}

/// Rejects chat text that would be read as a command.
pub(crate) fn ensure_chat(text: &str) -> BotResult<()> {
    if text.starts_with(COMMAND_PREFIX) {
        Err(BotError::ForbiddenCommand {
            text: text.to_string(),
        })
    } else {
        Ok(())
    }
}

// =============================================================================
// Active-room slot
// =============================================================================

/// Mutual exclusion over the transport's active room.
#[derive(Debug, Default)]
pub(crate) struct RoomSlot {
    lock: Mutex<()>,
}

impl RoomSlot {
    /// Waits for the slot, then points the transport at `room`.
    pub(crate) async fn acquire<'a>(
        &'a self,
        transport: &'a dyn Transport,
        room: &str,
    ) -> ActiveRoom<'a> {
        let guard = self.lock.lock().await;
        transport.set_active_room(Some(room));
        ActiveRoom {
            transport,
            _guard: guard,
        }
    }

    /// Waits for the slot without setting a room. Every holder of an
    /// [`ActiveRoom`] clears the room before releasing, so the transport has
    /// no active room while this guard is held.
    pub(crate) async fn hold(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().await
    }
}

/// Holder of the active-room slot.
///
/// Dropping it clears the transport's active room before releasing the
/// slot, whichever way the holding scope exits.
pub(crate) struct ActiveRoom<'a> {
    transport: &'a dyn Transport,
    _guard: MutexGuard<'a, ()>,
}

impl Drop for ActiveRoom<'_> {
    fn drop(&mut self) {
        self.transport.set_active_room(None);
    }
}

// =============================================================================
// Bot API
// =============================================================================

impl Bot {
    /// Creates `room` and registers it.
    pub async fn create_room(&self, room: &str) -> BotResult<()> {
        let room = require("room", room)?;
        self.send_command(&Command::Create {
            room: room.to_string(),
        })
        .await?;
        self.rooms_registry().insert(room);
        Ok(())
    }

    /// Joins `room` and registers it.
    pub async fn join(&self, room: &str) -> BotResult<()> {
        let room = require("room", room)?;
        self.send_command(&Command::Join {
            room: room.to_string(),
        })
        .await?;
        self.rooms_registry().insert(room);
        Ok(())
    }

    /// Says `text` in `room`.
    ///
    /// Waits for the active-room slot, so concurrent sends to different rooms
    /// are serialized. The active room is cleared again afterwards, also when
    /// the send fails.
    pub async fn say_in(&self, text: &str, room: &str) -> BotResult<()> {
        let text = require("text", text)?;
        let room = require("room", room)?;
        ensure_chat(text)?;

        let _active = self.room_slot().acquire(self.transport(), room).await;
        trace!(room = %room, "Active room set");
        self.send_raw(text).await
    }

    /// Says `text` in whatever room is currently active.
    pub async fn say(&self, text: &str) -> BotResult<()> {
        let text = require("text", text)?;
        ensure_chat(text)?;
        self.send_raw(text).await
    }

    /// Addresses `who` in `room` with `@who what`.
    pub async fn reply(&self, who: &str, what: &str, room: &str) -> BotResult<()> {
        let who = require("who", who)?;
        let what = require("what", what)?;
        self.say_in(&format!("@{who} {what}"), room).await
    }

    /// Sends `who` a private message. Never carries an active room, even
    /// while a `say_in` from another task is in flight.
    pub async fn private_reply(&self, who: &str, what: &str) -> BotResult<()> {
        let who = require("who", who)?;
        let what = require("what", what)?;
        self.send_command(&Command::Msg {
            who: who.to_string(),
            text: what.to_string(),
        })
        .await
    }

    /// Sends a protocol command as-is, outside any room context.
    pub(crate) async fn send_command(&self, command: &Command) -> BotResult<()> {
        let _slot = self.room_slot().hold().await;
        debug!(command = command.verb(), "Sending command");
        self.send_raw(&command.to_string()).await
    }

    async fn send_raw(&self, text: &str) -> BotResult<()> {
        self.transport()
            .invoke(SEND_METHOD, vec![Value::String(text.to_string())])
            .await?;
        Ok(())
    }
}
