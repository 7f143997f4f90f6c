//! JSON frames exchanged with the hub.
//!
//! ```text
//! client → hub   {"id": 7, "method": "Send", "args": ["hi"], "state": {"activeRoom": "dev"}}
//! hub → client   {"id": 7, "result": null}
//!                {"id": 7, "error": "no such room"}
//!                {"event": "addMessage", "args": [{...}, "dev"]}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An outbound method invocation.
#[derive(Debug, Serialize)]
pub struct InvocationFrame<'a> {
    /// Correlates the hub's reply with this call.
    pub id: u64,
    /// Hub method name.
    pub method: &'a str,
    /// Positional arguments.
    pub args: &'a [Value],
    /// Per-connection state the hub reads alongside the call.
    pub state: FrameState<'a>,
}

/// Connection state attached to every invocation.
#[derive(Debug, Serialize)]
pub struct FrameState<'a> {
    /// Room that plain chat text is posted to.
    #[serde(rename = "activeRoom")]
    pub active_room: Option<&'a str>,
}

/// Anything the hub can send.
///
/// Variant order matters: a failure also carries an `id`, so it is tried
/// before a plain reply.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum InboundFrame {
    /// The hub rejected an invocation.
    Failure {
        /// Id of the invocation.
        id: u64,
        /// Error message or object.
        error: Value,
    },
    /// The hub answered an invocation.
    Reply {
        /// Id of the invocation.
        id: u64,
        /// Return value; absent for void methods.
        #[serde(default)]
        result: Value,
    },
    /// The hub invoked a client-side event.
    Event {
        /// Event name.
        event: String,
        /// Positional arguments.
        #[serde(default)]
        args: Vec<Value>,
    },
}

impl InboundFrame {
    /// Parses a text frame.
    pub fn parse(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

/// Renders a hub error value as a message.
pub fn error_message(error: &Value) -> String {
    match error {
        Value::String(message) => message.clone(),
        Value::Object(map) => map
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string()),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn invocation_carries_active_room() {
        let args = [json!("hello")];
        let frame = InvocationFrame {
            id: 3,
            method: "Send",
            args: &args,
            state: FrameState {
                active_room: Some("dev"),
            },
        };
        assert_eq!(
            serde_json::to_value(&frame).unwrap(),
            json!({ "id": 3, "method": "Send", "args": ["hello"], "state": { "activeRoom": "dev" } })
        );
    }

    #[test]
    fn cleared_room_serializes_as_null() {
        let frame = InvocationFrame {
            id: 1,
            method: "Join",
            args: &[],
            state: FrameState { active_room: None },
        };
        let value = serde_json::to_value(&frame).unwrap();
        assert_eq!(value["state"]["activeRoom"], Value::Null);
    }

    #[test]
    fn distinguishes_inbound_frames() {
        assert_eq!(
            InboundFrame::parse(r#"{"id":1,"result":true}"#).unwrap(),
            InboundFrame::Reply {
                id: 1,
                result: json!(true)
            }
        );
        assert_eq!(
            InboundFrame::parse(r#"{"id":2}"#).unwrap(),
            InboundFrame::Reply {
                id: 2,
                result: Value::Null
            }
        );
        assert_eq!(
            InboundFrame::parse(r#"{"id":3,"error":"nope"}"#).unwrap(),
            InboundFrame::Failure {
                id: 3,
                error: json!("nope")
            }
        );
        assert_eq!(
            InboundFrame::parse(r#"{"event":"logOn","args":[["dev"]]}"#).unwrap(),
            InboundFrame::Event {
                event: "logOn".into(),
                args: vec![json!(["dev"])]
            }
        );
        assert!(InboundFrame::parse(r#"{"hello":"world"}"#).is_err());
    }

    #[test]
    fn error_messages_are_extracted() {
        assert_eq!(error_message(&json!("boom")), "boom");
        assert_eq!(error_message(&json!({ "message": "bad room" })), "bad room");
        assert_eq!(error_message(&json!(42)), "42");
    }
}
