//! The dispatch engine: connection lifecycle plus event routing.
//!
//! # Lifecycle
//!
//! ```text
//!                power_up()              connect ok
//! Disconnected ─────────────▶ Connecting ──────────▶ Joining ──Join=true──▶ Active
//!      ▲   ▲                      │                  │  ▲ │                    │
//!      │   └──── connect error ───┘       Join=false │  │ └── logOn ───────────┤
//!      │                                  send /nick └──┘                      │
//!      │                                      │ /nick failed                   │
//!      │                                      ▼                                │
//!      │                                   Faulted                             │
//!      └──────────────────────── transport closed / shut_down() ───────────────┘
//! ```
//!
//! # Dispatch
//!
//! One pump task per connection drains the event sink in arrival order.
//! Chat messages are normalized, filtered for self-authorship, announced to
//! observers, then offered to the [`HandlerChain`] one handler at a time.

use std::sync::{Arc, Weak};

use tokio::sync::{Mutex, broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, debug_span, info, info_span, trace, warn};

use crate::foundation::error::{BotError, BotResult};
use crate::foundation::event::{HubEvent, InboundEvent, SUBSCRIBED_EVENTS};
use crate::foundation::message::{BotIdentity, ChatMessage};
use crate::foundation::normalize::normalize;
use crate::framework::chain::{BoxedHandler, Handler, HandlerChain};
use crate::framework::command::{Command, RoomSlot};
use crate::framework::rooms::RoomRegistry;
use crate::integration::transport::{BoxedTransport, JOIN_METHOD, Transport};

/// Capacity of each notification channel. Slow observers lag, they never
/// block dispatch.
const NOTIFICATION_CAPACITY: usize = 64;

/// Where the bot is in its connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No connection.
    Disconnected,
    /// Transport handshake in progress.
    Connecting,
    /// Connected; waiting for the hub to accept the join.
    Joining,
    /// Joined and dispatching messages.
    Active,
    /// Joining failed and the connection was torn down; `power_up` may be
    /// retried.
    Faulted,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Joining => "joining",
            Self::Active => "active",
            Self::Faulted => "faulted",
        };
        f.write_str(name)
    }
}

/// Notification sent when the connection ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disconnected {
    /// Reason reported by the transport, if any.
    pub reason: Option<String>,
    /// `true` when the bot itself shut down.
    pub requested: bool,
}

/// Notification sent when someone enters or leaves a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presence {
    /// A user entered.
    Joined { user: String, room: Option<String> },
    /// A user left.
    Left { user: String, room: Option<String> },
}

/// Lifecycle bookkeeping guarded by the lifecycle mutex.
#[derive(Default)]
struct Lifecycle {
    /// Stops the pump task of the current connection.
    pump: Option<CancellationToken>,
}

struct BotInner {
    hub_url: String,
    identity: BotIdentity,
    transport: BoxedTransport,
    rooms: RoomRegistry,
    handlers: HandlerChain,
    room_slot: RoomSlot,
    state: watch::Sender<ConnectionState>,
    lifecycle: Mutex<Lifecycle>,
    messages: broadcast::Sender<ChatMessage>,
    disconnects: broadcast::Sender<Disconnected>,
    presence: broadcast::Sender<Presence>,
}

/// A chat bot bound to one hub connection.
///
/// `Bot` is a cheap handle: clones share the same connection, rooms and
/// handlers. Handlers receive a `&Bot` and use it to reply.
///
/// ```rust,ignore
/// let bot = Bot::new("wss://hub.example/chat", BotIdentity::new("bot", "pw"), transport);
/// bot.add_handler(MyHandler);
/// bot.power_up().await?;
/// bot.join("dev").await?;
/// // ...
/// bot.shut_down().await;
/// ```
#[derive(Clone)]
pub struct Bot {
    inner: Arc<BotInner>,
}

impl Bot {
    /// Creates a disconnected bot.
    pub fn new(hub_url: impl Into<String>, identity: BotIdentity, transport: BoxedTransport) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        let (messages, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        let (disconnects, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        let (presence, _) = broadcast::channel(NOTIFICATION_CAPACITY);

        Self {
            inner: Arc::new(BotInner {
                hub_url: hub_url.into(),
                identity,
                transport,
                rooms: RoomRegistry::new(),
                handlers: HandlerChain::new(),
                room_slot: RoomSlot::default(),
                state,
                lifecycle: Mutex::new(Lifecycle::default()),
                messages,
                disconnects,
                presence,
            }),
        }
    }

    /// The bot's identity.
    pub fn identity(&self) -> &BotIdentity {
        &self.inner.identity
    }

    /// The bot's nick.
    pub fn name(&self) -> &str {
        self.inner.identity.name()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    /// Subscribes to lifecycle state changes.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    /// Rooms the bot is in, in registry order.
    pub fn rooms(&self) -> Vec<String> {
        self.inner.rooms.snapshot()
    }

    /// Subscribes to every chat message that reaches the handler chain.
    pub fn on_message_received(&self) -> broadcast::Receiver<ChatMessage> {
        self.inner.messages.subscribe()
    }

    /// Subscribes to disconnect notifications.
    pub fn on_disconnected(&self) -> broadcast::Receiver<Disconnected> {
        self.inner.disconnects.subscribe()
    }

    /// Subscribes to users entering and leaving rooms.
    pub fn on_presence(&self) -> broadcast::Receiver<Presence> {
        self.inner.presence.subscribe()
    }

    // =========================================================================
    // Handler management
    // =========================================================================

    /// Appends a handler and returns the shared instance, which can later be
    /// passed to [`remove_handler`](Self::remove_handler).
    pub fn add_handler<H: Handler>(&self, handler: H) -> BoxedHandler {
        let handler: BoxedHandler = Arc::new(handler);
        self.inner.handlers.add(Arc::clone(&handler));
        handler
    }

    /// Appends an already shared handler.
    pub fn add_boxed_handler(&self, handler: BoxedHandler) {
        self.inner.handlers.add(handler);
    }

    /// Removes the first occurrence of `handler`.
    pub fn remove_handler(&self, handler: &BoxedHandler) -> bool {
        self.inner.handlers.remove(handler)
    }

    /// Removes every handler.
    pub fn clear_handlers(&self) {
        self.inner.handlers.clear();
    }

    /// Number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.inner.handlers.len()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Connects, subscribes and joins the hub.
    ///
    /// Does nothing if the transport is already active. When the hub refuses
    /// the join, the bot registers its nick and stays in
    /// [`ConnectionState::Joining`] until the hub's `logOn` arrives.
    pub async fn power_up(&self) -> BotResult<()> {
        let span = info_span!("power_up", bot = %self.name(), url = %self.inner.hub_url);
        self.power_up_inner().instrument(span).await
    }

    async fn power_up_inner(&self) -> BotResult<()> {
        let mut lifecycle = self.inner.lifecycle.lock().await;
        let transport = self.transport();

        if transport.is_active() {
            debug!("Transport already active, ignoring power up");
            return Ok(());
        }

        self.set_state(ConnectionState::Connecting);
        info!("Connecting to hub");
        if let Err(e) = transport
            .connect(&self.inner.hub_url, &self.inner.identity)
            .await
        {
            warn!(error = %e, "Connection failed");
            self.set_state(ConnectionState::Disconnected);
            return Err(e.into());
        }

        self.set_state(ConnectionState::Joining);

        // Subscribe before joining so nothing the hub sends in reply to the
        // join is lost.
        let (sink, events) = mpsc::unbounded_channel();
        transport.subscribe(SUBSCRIBED_EVENTS, sink);

        let stop = CancellationToken::new();
        if let Some(previous) = lifecycle.pump.replace(stop.clone()) {
            previous.cancel();
        }
        tokio::spawn(pump(Arc::downgrade(&self.inner), events, stop));

        match transport.invoke(JOIN_METHOD, Vec::new()).await {
            Ok(joined) if joined.as_bool() == Some(true) => {
                info!("Joined hub");
                self.set_state(ConnectionState::Active);
                Ok(())
            }
            Ok(_) => {
                info!("Join refused, registering identity");
                let nick = Command::Nick {
                    name: self.inner.identity.name().to_string(),
                    secret: self.inner.identity.secret().to_string(),
                };
                match self.send_command(&nick).await {
                    Ok(()) => Ok(()),
                    Err(BotError::Transport(source)) => {
                        warn!(error = %source, "Identity registration failed");
                        self.fault(&mut lifecycle).await;
                        Err(BotError::RegistrationFailed { source })
                    }
                    Err(e) => {
                        self.fault(&mut lifecycle).await;
                        Err(e)
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "Join failed");
                self.fault(&mut lifecycle).await;
                Err(e.into())
            }
        }
    }

    /// Stops the pump and closes the transport so the next `power_up`
    /// starts from a fresh connection.
    async fn fault(&self, lifecycle: &mut Lifecycle) {
        if let Some(stop) = lifecycle.pump.take() {
            stop.cancel();
        }
        self.transport().close().await;
        self.set_state(ConnectionState::Faulted);
    }

    /// Leaves every room, closes the transport and forgets the rooms.
    ///
    /// Leaving is best-effort: failures are logged and the remaining rooms
    /// are still attempted. Valid in every state.
    pub async fn shut_down(&self) {
        let span = info_span!("shut_down", bot = %self.name());
        self.shut_down_inner().instrument(span).await;
    }

    async fn shut_down_inner(&self) {
        let mut lifecycle = self.inner.lifecycle.lock().await;

        if let Some(stop) = lifecycle.pump.take() {
            stop.cancel();
        }

        for room in self.inner.rooms.snapshot() {
            debug!(room = %room, "Leaving room");
            if let Err(e) = self.send_command(&Command::Leave { room: room.clone() }).await {
                warn!(room = %room, error = %e, "Failed to leave room");
            }
        }

        self.transport().close().await;
        self.inner.rooms.clear();

        let previous = self.inner.state.send_replace(ConnectionState::Disconnected);
        if previous != ConnectionState::Disconnected {
            let _ = self.inner.disconnects.send(Disconnected {
                reason: None,
                requested: true,
            });
        }
        info!("Bot shut down");
    }

    // =========================================================================
    // Routing
    // =========================================================================

    async fn route(&self, event: InboundEvent) {
        match event {
            InboundEvent::Message { payload, room } => {
                let message = match normalize(&payload, &room) {
                    Ok(message) => message,
                    Err(e) => {
                        warn!(room = %room, error = %e, "Dropping malformed message");
                        return;
                    }
                };
                self.dispatch_message(message).await;
            }
            InboundEvent::RoomList(rooms) => {
                let added = self.inner.rooms.extend(&rooms);
                info!(rooms = rooms.len(), added, "Received room list");
                let promoted = self.inner.state.send_if_modified(|state| {
                    if *state == ConnectionState::Joining {
                        *state = ConnectionState::Active;
                        true
                    } else {
                        false
                    }
                });
                if promoted {
                    info!("Hub confirmed sign-on");
                }
            }
            InboundEvent::UserJoined { user, room } => {
                debug!(user = %user, room = ?room, "User joined");
                let _ = self.inner.presence.send(Presence::Joined { user, room });
            }
            InboundEvent::UserLeft { user, room } => {
                debug!(user = %user, room = ?room, "User left");
                let _ = self.inner.presence.send(Presence::Left { user, room });
            }
        }
    }

    async fn dispatch_message(&self, message: ChatMessage) {
        if message.is_from(self.name()) {
            trace!(room = %message.room(), "Ignoring own message");
            return;
        }

        let span = debug_span!("dispatch", room = %message.room(), sender = %message.sender());
        async {
            let _ = self.inner.messages.send(message.clone());
            if self.inner.handlers.dispatch(&message, self).await.is_none() {
                trace!("No handler consumed message");
            }
        }
        .instrument(span)
        .await;
    }

    fn on_transport_closed(&self, reason: Option<String>) {
        let previous = self.inner.state.send_replace(ConnectionState::Disconnected);
        if previous == ConnectionState::Disconnected {
            return;
        }
        warn!(reason = ?reason, "Connection to hub lost");
        let _ = self.inner.disconnects.send(Disconnected {
            reason,
            requested: false,
        });
    }

    // =========================================================================
    // Internals shared with the command encoder
    // =========================================================================

    pub(crate) fn transport(&self) -> &dyn Transport {
        self.inner.transport.as_ref()
    }

    pub(crate) fn rooms_registry(&self) -> &RoomRegistry {
        &self.inner.rooms
    }

    pub(crate) fn room_slot(&self) -> &RoomSlot {
        &self.inner.room_slot
    }

    fn set_state(&self, state: ConnectionState) {
        let previous = self.inner.state.send_replace(state);
        if previous != state {
            debug!(from = %previous, to = %state, "State changed");
        }
    }
}

impl std::fmt::Debug for Bot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bot")
            .field("name", &self.name())
            .field("state", &self.state())
            .field("rooms", &self.inner.rooms.len())
            .field("handlers", &self.inner.handlers.len())
            .finish()
    }
}

/// Drains one connection's events until the connection closes or the pump
/// is cancelled. Holds the bot weakly so a dropped bot ends the task.
async fn pump(
    bot: Weak<BotInner>,
    mut events: mpsc::UnboundedReceiver<HubEvent>,
    stop: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            event = events.recv() => event,
        };
        let Some(inner) = bot.upgrade() else { break };
        let bot = Bot { inner };

        match event {
            Some(HubEvent::Invoked { name, args }) => match InboundEvent::parse(&name, &args) {
                Ok(Some(event)) => {
                    trace!(event = event.kind(), "Routing event");
                    bot.route(event).await;
                }
                Ok(None) => trace!(event = %name, "Ignoring unsubscribed event"),
                Err(e) => warn!(event = %name, error = %e, "Dropping malformed event"),
            },
            Some(HubEvent::Closed { reason }) => {
                bot.on_transport_closed(reason);
                break;
            }
            None => {
                bot.on_transport_closed(None);
                break;
            }
        }
    }
    trace!("Event pump stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::chain::handler_fn;
    use crate::testing::{MockTransport, eventually, test_bot};
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn power_up_reaches_active() {
        let transport = MockTransport::new();
        let bot = test_bot(transport.clone());

        assert_ok!(bot.power_up().await);
        assert_eq!(bot.state(), ConnectionState::Active);
        assert_eq!(transport.connect_count(), 1);
        assert_eq!(transport.subscribed_events(), SUBSCRIBED_EVENTS);
    }

    #[tokio::test]
    async fn subscribes_before_joining() {
        let transport = MockTransport::new();
        let bot = test_bot(transport.clone());

        assert_ok!(bot.power_up().await);
        let calls = transport.invocations();
        assert_eq!(calls[0].method, JOIN_METHOD);
        assert!(calls[0].subscribed_before);
    }

    #[tokio::test]
    async fn power_up_is_idempotent() {
        let transport = MockTransport::new();
        let bot = test_bot(transport.clone());

        assert_ok!(bot.power_up().await);
        assert_ok!(bot.power_up().await);

        assert_eq!(transport.connect_count(), 1);
        let joins = transport
            .invocations()
            .iter()
            .filter(|call| call.method == JOIN_METHOD)
            .count();
        assert_eq!(joins, 1);
    }

    #[tokio::test]
    async fn connect_failure_returns_to_disconnected() {
        let transport = MockTransport::new();
        transport.fail_connect(true);
        let bot = test_bot(transport.clone());

        let err = bot.power_up().await.unwrap_err();
        assert!(matches!(err, BotError::Transport(_)));
        assert_eq!(bot.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn refused_join_registers_nick_and_waits_for_log_on() {
        let transport = MockTransport::new();
        transport.refuse_join();
        let bot = test_bot(transport.clone());

        assert_ok!(bot.power_up().await);
        assert_eq!(bot.state(), ConnectionState::Joining);
        assert_eq!(transport.sent_texts(), vec!["/nick bot s3cret"]);

        transport.emit("logOn", vec![json!(["dev"])]);
        let state_bot = bot.clone();
        eventually(move || state_bot.state() == ConnectionState::Active).await;
        assert_eq!(bot.rooms(), vec!["dev"]);
    }

    #[tokio::test]
    async fn failed_registration_faults() {
        let transport = MockTransport::new();
        transport.refuse_join();
        transport.fail_sends(true);
        let bot = test_bot(transport.clone());

        let err = bot.power_up().await.unwrap_err();
        assert!(matches!(err, BotError::RegistrationFailed { .. }));
        assert_eq!(bot.state(), ConnectionState::Faulted);
        assert!(!transport.is_active());
        assert_eq!(transport.close_count(), 1);
    }

    #[tokio::test]
    async fn power_up_recovers_from_faulted() {
        let transport = MockTransport::new();
        transport.fail_join(true);
        let bot = test_bot(transport.clone());
        let mut disconnects = bot.on_disconnected();

        assert_err!(bot.power_up().await);
        assert_eq!(bot.state(), ConnectionState::Faulted);
        assert!(!transport.is_active());

        transport.fail_join(false);
        assert_ok!(bot.power_up().await);
        assert_eq!(bot.state(), ConnectionState::Active);
        assert_eq!(transport.connect_count(), 2);

        // The torn-down connection's close signal must not reach observers.
        let mut observed = bot.on_message_received();
        transport.emit_message("alice", "again", "dev");
        assert_eq!(observed.recv().await.unwrap().content(), "again");
        assert!(disconnects.try_recv().is_err());
        assert_eq!(bot.state(), ConnectionState::Active);
    }

    #[tokio::test]
    async fn own_messages_never_reach_handlers() {
        let transport = MockTransport::new();
        let bot = test_bot(transport.clone());
        let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
        bot.add_handler(handler_fn(move |message, _bot| {
            let seen_tx = seen_tx.clone();
            async move {
                let _ = seen_tx.send(message);
                Ok(true)
            }
        }));
        let mut observed = bot.on_message_received();

        assert_ok!(bot.power_up().await);
        transport.emit_message("BOT", "echo", "dev");
        transport.emit_message("alice", "hi", "dev");

        let seen = seen_rx.recv().await.unwrap();
        assert_eq!(seen.sender(), "alice");
        assert_eq!(observed.recv().await.unwrap().sender(), "alice");
        assert!(seen_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn malformed_events_do_not_stop_the_pump() {
        let transport = MockTransport::new();
        let bot = test_bot(transport.clone());
        let mut observed = bot.on_message_received();

        assert_ok!(bot.power_up().await);
        transport.emit("addMessage", vec![json!({ "content": "no user" }), json!("dev")]);
        transport.emit("logOn", vec![json!("not a list")]);
        transport.emit_message("alice", "still here", "dev");

        let message = observed.recv().await.unwrap();
        assert_eq!(message.content(), "still here");
    }

    #[tokio::test]
    async fn presence_is_announced() {
        let transport = MockTransport::new();
        let bot = test_bot(transport.clone());
        let mut presence = bot.on_presence();

        assert_ok!(bot.power_up().await);
        transport.emit("addUser", vec![json!({ "Name": "carol" }), json!("dev")]);
        transport.emit("leave", vec![json!("carol")]);

        assert_eq!(
            presence.recv().await.unwrap(),
            Presence::Joined {
                user: "carol".into(),
                room: Some("dev".into())
            }
        );
        assert_eq!(
            presence.recv().await.unwrap(),
            Presence::Left {
                user: "carol".into(),
                room: None
            }
        );
    }

    #[tokio::test]
    async fn transport_loss_notifies_and_keeps_rooms() {
        let transport = MockTransport::new();
        let bot = test_bot(transport.clone());
        let mut disconnects = bot.on_disconnected();

        assert_ok!(bot.power_up().await);
        assert_ok!(bot.join("dev").await);
        transport.drop_connection("server restart");

        let notice = disconnects.recv().await.unwrap();
        assert_eq!(notice.reason.as_deref(), Some("server restart"));
        assert!(!notice.requested);
        assert_eq!(bot.state(), ConnectionState::Disconnected);
        assert_eq!(bot.rooms(), vec!["dev"]);
    }

    #[tokio::test]
    async fn reconnects_after_loss() {
        let transport = MockTransport::new();
        let bot = test_bot(transport.clone());
        let mut disconnects = bot.on_disconnected();

        assert_ok!(bot.power_up().await);
        transport.drop_connection("blip");
        assert_ok!(disconnects.recv().await);

        assert_ok!(bot.power_up().await);
        assert_eq!(transport.connect_count(), 2);
        assert_eq!(bot.state(), ConnectionState::Active);
    }

    #[tokio::test]
    async fn shut_down_leaves_rooms_then_closes() {
        let transport = MockTransport::new();
        let bot = test_bot(transport.clone());
        let mut disconnects = bot.on_disconnected();

        assert_ok!(bot.power_up().await);
        transport.emit("logOn", vec![json!(["dev", "random"])]);
        let rooms_bot = bot.clone();
        eventually(move || rooms_bot.rooms().len() == 2).await;

        bot.shut_down().await;

        assert_eq!(transport.sent_texts(), vec!["/leave dev", "/leave random"]);
        assert!(transport.closed_after_last_invocation());
        assert!(bot.rooms().is_empty());
        assert_eq!(bot.state(), ConnectionState::Disconnected);
        assert!(disconnects.recv().await.unwrap().requested);
    }

    #[tokio::test]
    async fn shut_down_is_best_effort() {
        let transport = MockTransport::new();
        let bot = test_bot(transport.clone());

        assert_ok!(bot.power_up().await);
        assert_ok!(bot.join("dev").await);
        assert_ok!(bot.join("ops").await);
        transport.fail_sends(true);

        bot.shut_down().await;
        assert_eq!(transport.close_count(), 1);
        assert!(bot.rooms().is_empty());
        assert_err!(bot.say_in("anyone?", "dev").await);
    }

    #[tokio::test]
    async fn shut_down_without_power_up_is_quiet() {
        let transport = MockTransport::new();
        let bot = test_bot(transport.clone());
        let mut disconnects = bot.on_disconnected();

        bot.shut_down().await;
        assert!(transport.invocations().is_empty());
        assert!(disconnects.try_recv().is_err());
    }

    #[tokio::test]
    async fn handlers_can_reply_through_the_bot() {
        let transport = MockTransport::new();
        let bot = test_bot(transport.clone());
        bot.add_handler(handler_fn(|message, bot| async move {
            if message.content() == "!ping" {
                bot.reply(message.sender(), "pong", message.room()).await?;
                return Ok(true);
            }
            Ok(false)
        }));

        assert_ok!(bot.power_up().await);
        transport.emit_message("alice", "!ping", "dev");

        let probe = transport.clone();
        eventually(move || probe.sent_texts().len() == 1 && probe.active_room().is_none()).await;
        let reply = transport.invocations().pop().unwrap();
        assert_eq!(reply.text(), Some("@alice pong"));
        assert_eq!(reply.active_room.as_deref(), Some("dev"));
        assert_eq!(transport.active_room(), None);
    }

    #[tokio::test]
    async fn state_changes_are_observable() {
        let transport = MockTransport::new();
        let bot = test_bot(transport.clone());
        let mut states = bot.watch_state();
        assert_eq!(*states.borrow_and_update(), ConnectionState::Disconnected);

        assert_ok!(bot.power_up().await);
        assert!(states.has_changed().unwrap());
        assert_eq!(*states.borrow_and_update(), ConnectionState::Active);
    }
}
