//! Inbound hub events.
//!
//! A [`Transport`](crate::Transport) delivers every hub-side invocation as a
//! raw [`HubEvent`]: an event name plus positional JSON arguments. The engine
//! turns those into the typed [`InboundEvent`] before routing, so nothing past
//! this module reads fields off untyped JSON.
//!
//! ```text
//! HubEvent::Invoked { "logOn", [["dev", "random"]] }
//!     └── InboundEvent::RoomList(["dev", "random"])
//! ```

use serde::Deserialize;
use serde_json::Value;

use crate::foundation::error::{BotError, BotResult};

/// Event name for a chat message: `addMessage(payload, room)`.
pub const ADD_MESSAGE: &str = "addMessage";
/// Event name for a user entering a room: `addUser(user[, room])`.
pub const ADD_USER: &str = "addUser";
/// Event name for a user leaving a room: `leave(user[, room])`.
pub const LEAVE: &str = "leave";
/// Event name for the initial room list: `logOn(rooms)`.
pub const LOG_ON: &str = "logOn";

/// Every event name the engine subscribes to.
pub const SUBSCRIBED_EVENTS: &[&str] = &[ADD_MESSAGE, LEAVE, ADD_USER, LOG_ON];

/// A raw signal from the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum HubEvent {
    /// The hub invoked a client-side event.
    Invoked {
        /// Event name.
        name: String,
        /// Positional arguments.
        args: Vec<Value>,
    },
    /// The connection is gone.
    Closed {
        /// Why, if the transport knows.
        reason: Option<String>,
    },
}

impl HubEvent {
    /// Builds an [`HubEvent::Invoked`].
    pub fn invoked(name: impl Into<String>, args: Vec<Value>) -> Self {
        Self::Invoked {
            name: name.into(),
            args,
        }
    }

    /// Builds an [`HubEvent::Closed`].
    pub fn closed(reason: Option<String>) -> Self {
        Self::Closed { reason }
    }
}

/// A typed inbound event.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    /// A chat message. The payload is normalized later by the engine.
    Message {
        /// Raw message payload.
        payload: Value,
        /// Room the message belongs to.
        room: String,
    },
    /// A user entered a room.
    UserJoined {
        /// User name.
        user: String,
        /// Room, when the hub says which.
        room: Option<String>,
    },
    /// A user left a room.
    UserLeft {
        /// User name.
        user: String,
        /// Room, when the hub says which.
        room: Option<String>,
    },
    /// The rooms the bot is already in, sent by the hub after sign-on.
    RoomList(Vec<String>),
}

/// A user is either sent as a bare name or as a user record.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NamedRef {
    Bare(String),
    Record {
        #[serde(alias = "Name")]
        name: String,
    },
}

impl NamedRef {
    fn into_name(self) -> String {
        match self {
            Self::Bare(name) | Self::Record { name } => name,
        }
    }
}

impl InboundEvent {
    /// Parses a raw event.
    ///
    /// Returns `Ok(None)` for event names the engine does not handle and
    /// [`BotError::MalformedPayload`] when a known event has bad arguments.
    pub fn parse(name: &str, args: &[Value]) -> BotResult<Option<Self>> {
        let event = match name {
            ADD_MESSAGE => {
                let payload = arg(name, args, 0)?.clone();
                let room = string_arg(name, args, 1)?;
                Self::Message { payload, room }
            }
            ADD_USER => {
                let (user, room) = presence_args(name, args)?;
                Self::UserJoined { user, room }
            }
            LEAVE => {
                let (user, room) = presence_args(name, args)?;
                Self::UserLeft { user, room }
            }
            LOG_ON => {
                let rooms: Vec<NamedRef> = decode(name, arg(name, args, 0)?)?;
                Self::RoomList(rooms.into_iter().map(NamedRef::into_name).collect())
            }
            _ => return Ok(None),
        };
        Ok(Some(event))
    }

    /// Short label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Message { .. } => ADD_MESSAGE,
            Self::UserJoined { .. } => ADD_USER,
            Self::UserLeft { .. } => LEAVE,
            Self::RoomList(_) => LOG_ON,
        }
    }
}

fn arg<'a>(event: &str, args: &'a [Value], index: usize) -> BotResult<&'a Value> {
    args.get(index)
        .ok_or_else(|| BotError::malformed(event, format!("missing argument #{index}")))
}

fn string_arg(event: &str, args: &[Value], index: usize) -> BotResult<String> {
    match arg(event, args, index)? {
        Value::String(s) => Ok(s.clone()),
        other => Err(BotError::malformed(
            event,
            format!("argument #{index} should be a string, got {other}"),
        )),
    }
}

fn presence_args(event: &str, args: &[Value]) -> BotResult<(String, Option<String>)> {
    let user: NamedRef = decode(event, arg(event, args, 0)?)?;
    let room = match args.get(1) {
        None | Some(Value::Null) => None,
        Some(_) => Some(string_arg(event, args, 1)?),
    };
    Ok((user.into_name(), room))
}

fn decode<T: serde::de::DeserializeOwned>(event: &str, value: &Value) -> BotResult<T> {
    T::deserialize(value).map_err(|e| BotError::malformed(event, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_room_list_of_names_and_records() {
        let event = InboundEvent::parse(LOG_ON, &[json!(["dev", { "Name": "random" }])])
            .unwrap()
            .unwrap();
        assert_eq!(
            event,
            InboundEvent::RoomList(vec!["dev".into(), "random".into()])
        );
    }

    #[test]
    fn parses_message_with_room() {
        let payload = json!({ "content": "hi", "user": { "Name": "alice" } });
        let event = InboundEvent::parse(ADD_MESSAGE, &[payload.clone(), json!("dev")])
            .unwrap()
            .unwrap();
        assert_eq!(
            event,
            InboundEvent::Message {
                payload,
                room: "dev".into()
            }
        );
    }

    #[test]
    fn message_without_room_is_malformed() {
        let err = InboundEvent::parse(ADD_MESSAGE, &[json!({})]).unwrap_err();
        assert!(matches!(err, BotError::MalformedPayload { ref event, .. } if event == ADD_MESSAGE));
    }

    #[test]
    fn presence_room_is_optional() {
        let joined = InboundEvent::parse(ADD_USER, &[json!({ "name": "bob" })])
            .unwrap()
            .unwrap();
        assert_eq!(
            joined,
            InboundEvent::UserJoined {
                user: "bob".into(),
                room: None
            }
        );

        let left = InboundEvent::parse(LEAVE, &[json!("bob"), json!("dev")])
            .unwrap()
            .unwrap();
        assert_eq!(left.kind(), LEAVE);
    }

    #[test]
    fn unknown_events_are_ignored() {
        assert!(InboundEvent::parse("updateActivity", &[]).unwrap().is_none());
    }

    #[test]
    fn room_list_must_be_a_list() {
        let err = InboundEvent::parse(LOG_ON, &[json!("dev")]).unwrap_err();
        assert!(matches!(err, BotError::MalformedPayload { .. }));
    }
}
