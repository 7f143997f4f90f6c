//! The transport contract.
//!
//! The core never speaks a wire protocol itself. A [`Transport`] opens the
//! connection to the hub, invokes hub methods, and pushes hub-side events into
//! an [`EventSink`]. `hubbot-transport` ships a WebSocket implementation;
//! tests use [`MockTransport`](crate::testing::MockTransport).
//!
//! # Active room
//!
//! Hub invocations carry an "active room" alongside their arguments, which
//! the hub uses to decide where plain chat text goes. The engine sets it
//! around each targeted send through [`Transport::set_active_room`] and
//! always clears it afterwards.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::foundation::error::TransportResult;
use crate::foundation::event::HubEvent;
use crate::foundation::message::BotIdentity;

/// Hub method that joins the hub after connecting. Returns a bool.
pub const JOIN_METHOD: &str = "Join";

/// Hub method that posts text, either chat or a `/command`.
pub const SEND_METHOD: &str = "Send";

/// Receiving end for hub events.
///
/// Every subscription shares one ordered stream; a transport must deliver
/// events in arrival order and send [`HubEvent::Closed`] once when the
/// connection ends.
pub type EventSink = mpsc::UnboundedSender<HubEvent>;

/// A connection to the hub.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Opens the connection. Resolves once the transport is ready to invoke.
    async fn connect(&self, url: &str, identity: &BotIdentity) -> TransportResult<()>;

    /// Routes the named events into `sink`.
    fn subscribe(&self, events: &[&str], sink: EventSink);

    /// Invokes a hub method and waits for its result.
    async fn invoke(&self, method: &str, args: Vec<Value>) -> TransportResult<Value>;

    /// Sets (or with `None` clears) the room attached to later invocations.
    fn set_active_room(&self, room: Option<&str>);

    /// Returns `true` while the connection is open.
    fn is_active(&self) -> bool;

    /// Closes the connection. Closing an inactive transport is a no-op.
    async fn close(&self);
}

/// A shared transport trait object.
pub type BoxedTransport = Arc<dyn Transport>;
