//! Canonical message and identity records.

use std::fmt;

/// Compares two user or room names the way the hub does: ignoring case.
pub fn names_match(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}

/// A normalized chat message.
///
/// Produced once per inbound `addMessage` event by
/// [`normalize`](crate::foundation::normalize::normalize) and handed to every
/// handler in the chain by reference. Fields are private so a handler can
/// never alter what the next handler sees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    content: String,
    sender: String,
    room: String,
}

impl ChatMessage {
    /// Creates a message. `content` is expected to be already HTML-decoded.
    pub fn new(
        content: impl Into<String>,
        sender: impl Into<String>,
        room: impl Into<String>,
    ) -> Self {
        Self {
            content: content.into(),
            sender: sender.into(),
            room: room.into(),
        }
    }

    /// The decoded message text.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Name of the user who wrote the message.
    pub fn sender(&self) -> &str {
        &self.sender
    }

    /// Room the message was posted in.
    pub fn room(&self) -> &str {
        &self.room
    }

    /// Returns `true` if `name` wrote this message (case-insensitive).
    pub fn is_from(&self, name: &str) -> bool {
        names_match(&self.sender, name)
    }
}

impl fmt::Display for ChatMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.room, self.sender, self.content)
    }
}

/// The single identity the bot speaks as.
///
/// The secret is used once, for `/nick` registration when the initial join
/// is refused. It is never printed by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct BotIdentity {
    name: String,
    secret: String,
}

impl BotIdentity {
    /// Creates an identity.
    pub fn new(name: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            secret: secret.into(),
        }
    }

    /// The bot's nick.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The registration secret.
    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for BotIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotIdentity")
            .field("name", &self.name)
            .field("secret", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_match_ignores_case() {
        assert!(names_match("Dev", "dev"));
        assert!(names_match("ÉCOLE", "école"));
        assert!(!names_match("dev", "devs"));
    }

    #[test]
    fn message_knows_its_author() {
        let msg = ChatMessage::new("hi", "Alice", "dev");
        assert!(msg.is_from("alice"));
        assert!(!msg.is_from("bob"));
        assert_eq!(msg.to_string(), "[dev] Alice: hi");
    }

    #[test]
    fn identity_debug_hides_secret() {
        let id = BotIdentity::new("bot", "hunter2");
        let printed = format!("{id:?}");
        assert!(printed.contains("bot"));
        assert!(!printed.contains("hunter2"));
    }
}
