//! In-memory transport for tests.
//!
//! [`MockTransport`] records everything the engine asks of it and lets the
//! test play the hub's side by emitting events. Enabled for this crate's own
//! tests and, through the `testing` feature, for downstream test suites.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::Semaphore;

use crate::foundation::error::{TransportError, TransportResult};
use crate::foundation::event::{ADD_MESSAGE, HubEvent};
use crate::foundation::message::BotIdentity;
use crate::framework::engine::Bot;
use crate::integration::transport::{EventSink, JOIN_METHOD, SEND_METHOD, Transport};

/// Hub URL used by [`test_bot`].
pub const TEST_HUB_URL: &str = "ws://hub.test/chat";

/// One recorded hub invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    /// Hub method name.
    pub method: String,
    /// Positional arguments.
    pub args: Vec<Value>,
    /// Active room at the time of the call.
    pub active_room: Option<String>,
    /// Whether any subscription existed at the time of the call.
    pub subscribed_before: bool,
}

impl Invocation {
    /// The text of a `Send` invocation.
    pub fn text(&self) -> Option<&str> {
        if self.method != SEND_METHOD {
            return None;
        }
        self.args.first().and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Op {
    Invoke,
    Close,
}

#[derive(Default)]
struct MockState {
    active: bool,
    active_room: Option<String>,
    room_changes: Vec<Option<String>>,
    sinks: Vec<EventSink>,
    subscribed_events: Vec<String>,
    invocations: Vec<Invocation>,
    journal: Vec<Op>,
    connects: usize,
    closes: usize,
    fail_connect: bool,
    fail_sends: bool,
    fail_join: bool,
    refuse_join: bool,
    panic_sends: bool,
    send_gate: Option<Arc<Semaphore>>,
}

/// A scriptable [`Transport`] that never touches the network.
#[derive(Default)]
pub struct MockTransport {
    state: Mutex<MockState>,
}

impl MockTransport {
    /// Creates a disconnected mock. The hub accepts the join by default.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    // -------------------------------------------------------------------------
    // Scripting
    // -------------------------------------------------------------------------

    /// Makes `connect` fail.
    pub fn fail_connect(&self, fail: bool) {
        self.state.lock().fail_connect = fail;
    }

    /// Makes every `Send` invocation fail.
    pub fn fail_sends(&self, fail: bool) {
        self.state.lock().fail_sends = fail;
    }

    /// Makes the `Join` invocation fail outright.
    pub fn fail_join(&self, fail: bool) {
        self.state.lock().fail_join = fail;
    }

    /// Makes every `Send` invocation panic, as a buggy transport would.
    pub fn panic_sends(&self, panic: bool) {
        self.state.lock().panic_sends = panic;
    }

    /// Parks every `Send` invocation after it is recorded, until
    /// [`release_sends`](Self::release_sends).
    pub fn hold_sends(&self) {
        self.state.lock().send_gate = Some(Arc::new(Semaphore::new(0)));
    }

    /// Lets held and future `Send` invocations complete.
    pub fn release_sends(&self) {
        if let Some(gate) = self.state.lock().send_gate.take() {
            gate.close();
        }
    }

    /// Makes the hub answer `Join` with `false`.
    pub fn refuse_join(&self) {
        self.state.lock().refuse_join = true;
    }

    /// Plays a hub-side event to every subscriber.
    pub fn emit(&self, name: &str, args: Vec<Value>) {
        let state = self.state.lock();
        for sink in &state.sinks {
            let _ = sink.send(HubEvent::invoked(name, args.clone()));
        }
    }

    /// Plays an `addMessage` event.
    pub fn emit_message(&self, sender: &str, content: &str, room: &str) {
        self.emit(
            ADD_MESSAGE,
            vec![
                json!({ "content": content, "user": { "name": sender } }),
                json!(room),
            ],
        );
    }

    /// Simulates the hub dropping the connection.
    pub fn drop_connection(&self, reason: &str) {
        let mut state = self.state.lock();
        state.active = false;
        for sink in state.sinks.drain(..) {
            let _ = sink.send(HubEvent::closed(Some(reason.to_string())));
        }
    }

    // -------------------------------------------------------------------------
    // Inspection
    // -------------------------------------------------------------------------

    /// Every invocation attempted so far, failed ones included.
    pub fn invocations(&self) -> Vec<Invocation> {
        self.state.lock().invocations.clone()
    }

    /// Texts of every `Send` invocation.
    pub fn sent_texts(&self) -> Vec<String> {
        self.state
            .lock()
            .invocations
            .iter()
            .filter_map(|call| call.text().map(str::to_string))
            .collect()
    }

    /// Current active room.
    pub fn active_room(&self) -> Option<String> {
        self.state.lock().active_room.clone()
    }

    /// Every `set_active_room` call, in order.
    pub fn room_changes(&self) -> Vec<Option<String>> {
        self.state.lock().room_changes.clone()
    }

    /// Event names of the most recent subscription.
    pub fn subscribed_events(&self) -> Vec<String> {
        self.state.lock().subscribed_events.clone()
    }

    /// Number of successful connects.
    pub fn connect_count(&self) -> usize {
        self.state.lock().connects
    }

    /// Number of `close` calls.
    pub fn close_count(&self) -> usize {
        self.state.lock().closes
    }

    /// Returns `true` if the last thing that happened was a `close`.
    pub fn closed_after_last_invocation(&self) -> bool {
        self.state.lock().journal.last() == Some(&Op::Close)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self, url: &str, _identity: &BotIdentity) -> TransportResult<()> {
        let mut state = self.state.lock();
        if state.fail_connect {
            return Err(TransportError::ConnectionFailed {
                url: url.to_string(),
                reason: "connection refused".into(),
            });
        }
        state.active = true;
        state.connects += 1;
        Ok(())
    }

    fn subscribe(&self, events: &[&str], sink: EventSink) {
        let mut state = self.state.lock();
        state.subscribed_events = events.iter().map(|e| e.to_string()).collect();
        state.sinks.push(sink);
    }

    async fn invoke(&self, method: &str, args: Vec<Value>) -> TransportResult<Value> {
        let gate = {
            let mut state = self.state.lock();
            let call = Invocation {
                method: method.to_string(),
                args,
                active_room: state.active_room.clone(),
                subscribed_before: !state.sinks.is_empty(),
            };
            state.invocations.push(call);
            state.journal.push(Op::Invoke);
            if method == SEND_METHOD && state.panic_sends {
                drop(state);
                panic!("transport exploded");
            }
            state.send_gate.clone().filter(|_| method == SEND_METHOD)
        };

        // A closed semaphore is the release signal.
        if let Some(gate) = gate {
            let _ = gate.acquire().await;
        }

        let state = self.state.lock();
        match method {
            JOIN_METHOD if state.fail_join => Err(TransportError::Remote {
                method: method.to_string(),
                message: "join rejected".into(),
            }),
            JOIN_METHOD => Ok(Value::Bool(!state.refuse_join)),
            SEND_METHOD if state.fail_sends => {
                Err(TransportError::SendFailed("socket write failed".into()))
            }
            _ => Ok(Value::Null),
        }
    }

    fn set_active_room(&self, room: Option<&str>) {
        let mut state = self.state.lock();
        let room = room.map(str::to_string);
        state.room_changes.push(room.clone());
        state.active_room = room;
    }

    fn is_active(&self) -> bool {
        self.state.lock().active
    }

    async fn close(&self) {
        let mut state = self.state.lock();
        state.active = false;
        for sink in state.sinks.drain(..) {
            let _ = sink.send(HubEvent::closed(Some("closed by client".into())));
        }
        state.closes += 1;
        state.journal.push(Op::Close);
    }
}

/// Builds a bot named `bot` (secret `s3cret`) on top of `transport`.
pub fn test_bot(transport: Arc<MockTransport>) -> Bot {
    Bot::new(
        TEST_HUB_URL,
        BotIdentity::new("bot", "s3cret"),
        transport,
    )
}

/// Polls `condition` until it holds, panicking after two seconds.
pub async fn eventually(condition: impl Fn() -> bool) {
    for _ in 0..400 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not met within 2s");
}
