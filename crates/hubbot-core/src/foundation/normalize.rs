//! Message normalization.
//!
//! Converts a raw `addMessage` payload into a [`ChatMessage`]. The hub sends
//! message text HTML-encoded; handlers only ever see decoded text.

use std::borrow::Cow;

use serde::Deserialize;
use serde_json::Value;

use crate::foundation::error::{BotError, BotResult};
use crate::foundation::event::ADD_MESSAGE;
use crate::foundation::message::ChatMessage;

/// Longest entity body we try to decode, `&` through `;` inclusive.
const MAX_ENTITY_LEN: usize = 12;

#[derive(Debug, Deserialize)]
struct MessagePayload {
    #[serde(alias = "Content")]
    content: String,
    #[serde(alias = "User")]
    user: Sender,
}

#[derive(Debug, Deserialize)]
struct Sender {
    #[serde(alias = "Name")]
    name: String,
}

/// Normalizes a raw message payload posted in `room`.
///
/// Fails with [`BotError::MalformedPayload`] if `content` or `user.name` is
/// missing or not a string.
pub fn normalize(payload: &Value, room: &str) -> BotResult<ChatMessage> {
    let raw = MessagePayload::deserialize(payload)
        .map_err(|e| BotError::malformed(ADD_MESSAGE, e.to_string()))?;

    Ok(ChatMessage::new(
        decode_html_entities(&raw.content),
        raw.user.name,
        room,
    ))
}

/// Decodes HTML character references in a single pass.
///
/// Handles the named entities the hub emits plus decimal and hex numeric
/// references. Anything unrecognised is copied through untouched, so
/// `&amp;lt;` decodes to `&lt;` and not `<`.
pub fn decode_html_entities(input: &str) -> Cow<'_, str> {
    if !input.contains('&') {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];

        let decoded = tail
            .find(';')
            .filter(|&end| end <= MAX_ENTITY_LEN)
            .and_then(|end| decode_entity(&tail[1..end]).map(|ch| (ch, end)));

        match decoded {
            Some((ch, end)) => {
                out.push(ch);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }

    out.push_str(rest);
    Cow::Owned(out)
}

fn decode_entity(body: &str) -> Option<char> {
    match body {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let number = body.strip_prefix('#')?;
            let code = match number.strip_prefix(['x', 'X']) {
                Some(hex) if !hex.is_empty() && hex.bytes().all(|b| b.is_ascii_hexdigit()) => {
                    u32::from_str_radix(hex, 16).ok()?
                }
                Some(_) => return None,
                None if !number.is_empty() && number.bytes().all(|b| b.is_ascii_digit()) => {
                    number.parse().ok()?
                }
                None => return None,
            };
            char::from_u32(code)
        }
    }
}
