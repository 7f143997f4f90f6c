//! WebSocket hub transport.
//!
//! Each [`invoke`](Transport::invoke):
//! 1. Takes the next numeric id.
//! 2. Registers a one-shot reply channel under that id.
//! 3. Queues the JSON frame for the socket task.
//! 4. Awaits the reply, which the socket task routes back by id.
//!
//! Hub events are fanned out to every subscriber whose event list names them.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tracing::{debug, info, trace, warn};

use hubbot_core::{BotIdentity, EventSink, HubEvent, Transport, TransportError, TransportResult};

use crate::frame::{FrameState, InboundFrame, InvocationFrame, error_message};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Header that tells the hub who is connecting.
pub const USER_HEADER: &str = "x-hub-user";

/// Settings for [`WsTransport`].
#[derive(Debug, Clone)]
pub struct WsTransportConfig {
    /// How long an invocation waits for the hub's reply.
    pub invoke_timeout: Duration,
    /// Capacity of the outbound frame queue.
    pub outbound_capacity: usize,
}

impl Default for WsTransportConfig {
    fn default() -> Self {
        Self {
            invoke_timeout: Duration::from_secs(30),
            outbound_capacity: 256,
        }
    }
}

impl WsTransportConfig {
    /// Sets the invocation timeout.
    pub fn with_invoke_timeout(mut self, invoke_timeout: Duration) -> Self {
        self.invoke_timeout = invoke_timeout;
        self
    }
}

struct PendingCall {
    method: String,
    reply: oneshot::Sender<TransportResult<Value>>,
}

struct Subscription {
    events: Vec<String>,
    sink: EventSink,
}

/// State shared between the transport handle and its socket task.
#[derive(Default)]
struct Shared {
    active: AtomicBool,
    pending: Mutex<HashMap<u64, PendingCall>>,
    subscriptions: Mutex<Vec<Subscription>>,
}

impl Shared {
    fn on_frame(&self, text: &str) {
        let frame = match InboundFrame::parse(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, len = text.len(), "Ignoring unparseable frame");
                return;
            }
        };

        match frame {
            InboundFrame::Reply { id, result } => self.resolve(id, |_| Ok(result)),
            InboundFrame::Failure { id, error } => self.resolve(id, |method| {
                Err(TransportError::Remote {
                    method: method.to_string(),
                    message: error_message(&error),
                })
            }),
            InboundFrame::Event { event, args } => self.publish(event, args),
        }
    }

    fn resolve(&self, id: u64, outcome: impl FnOnce(&str) -> TransportResult<Value>) {
        let Some(call) = self.pending.lock().remove(&id) else {
            warn!(id, "Received reply for unknown invocation (timed out?)");
            return;
        };
        trace!(id, method = %call.method, "Invocation answered");
        let _ = call.reply.send(outcome(&call.method));
    }

    fn publish(&self, event: String, args: Vec<Value>) {
        let mut subscriptions = self.subscriptions.lock();
        subscriptions.retain(|s| !s.sink.is_closed());

        let mut delivered = false;
        for subscription in subscriptions.iter() {
            if subscription.events.iter().any(|e| *e == event) {
                delivered |= subscription
                    .sink
                    .send(HubEvent::invoked(event.clone(), args.clone()))
                    .is_ok();
            }
        }
        if !delivered {
            trace!(event = %event, "No subscriber for event");
        }
    }

    /// Marks the connection dead, fails every pending call, and tells every
    /// subscriber. Subscriptions end with the connection.
    fn on_closed(&self, reason: String) {
        self.active.store(false, Ordering::SeqCst);

        let pending: Vec<_> = self.pending.lock().drain().collect();
        if !pending.is_empty() {
            debug!(count = pending.len(), "Failing pending invocations due to disconnect");
        }
        for (_, call) in pending {
            let _ = call.reply.send(Err(TransportError::ConnectionClosed {
                reason: reason.clone(),
            }));
        }

        for subscription in self.subscriptions.lock().drain(..) {
            let _ = subscription
                .sink
                .send(HubEvent::closed(Some(reason.clone())));
        }
    }
}

/// Handle to the running socket task.
struct Connection {
    outbound: mpsc::Sender<String>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// A [`Transport`] over a WebSocket connection to the hub.
pub struct WsTransport {
    config: WsTransportConfig,
    next_id: AtomicU64,
    active_room: RwLock<Option<String>>,
    shared: Arc<Shared>,
    connection: Mutex<Option<Connection>>,
}

impl WsTransport {
    /// Creates a disconnected transport.
    pub fn new(config: WsTransportConfig) -> Self {
        Self {
            config,
            next_id: AtomicU64::new(1),
            active_room: RwLock::new(None),
            shared: Arc::new(Shared::default()),
            connection: Mutex::new(None),
        }
    }

    fn outbound(&self) -> TransportResult<mpsc::Sender<String>> {
        if !self.is_active() {
            return Err(TransportError::NotConnected);
        }
        self.connection
            .lock()
            .as_ref()
            .map(|c| c.outbound.clone())
            .ok_or(TransportError::NotConnected)
    }
}

impl Default for WsTransport {
    fn default() -> Self {
        Self::new(WsTransportConfig::default())
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn connect(&self, url: &str, identity: &BotIdentity) -> TransportResult<()> {
        if self.is_active() {
            return Ok(());
        }

        let failed = |reason: String| TransportError::ConnectionFailed {
            url: url.to_string(),
            reason,
        };

        let mut request = url
            .into_client_request()
            .map_err(|e| failed(format!("invalid hub URL: {e}")))?;
        let user = HeaderValue::from_str(identity.name())
            .map_err(|e| failed(format!("bot name is not a valid header value: {e}")))?;
        request.headers_mut().insert(USER_HEADER, user);

        info!(url = %url, "Connecting to hub");
        let (stream, _response) = connect_async(request)
            .await
            .map_err(|e| failed(format!("WebSocket connection failed: {e}")))?;
        let (ws_tx, ws_rx) = stream.split();

        let (outbound_tx, outbound_rx) = mpsc::channel(self.config.outbound_capacity);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        self.shared.active.store(true, Ordering::SeqCst);
        let task = tokio::spawn(run_socket_loop(
            ws_tx,
            ws_rx,
            outbound_rx,
            shutdown_rx,
            Arc::clone(&self.shared),
        ));

        let previous = self.connection.lock().replace(Connection {
            outbound: outbound_tx,
            shutdown: shutdown_tx,
            task,
        });
        if let Some(previous) = previous {
            previous.task.abort();
        }

        info!(url = %url, "Connected to hub");
        Ok(())
    }

    fn subscribe(&self, events: &[&str], sink: EventSink) {
        self.shared.subscriptions.lock().push(Subscription {
            events: events.iter().map(|e| e.to_string()).collect(),
            sink,
        });
    }

    async fn invoke(&self, method: &str, args: Vec<Value>) -> TransportResult<Value> {
        let outbound = self.outbound()?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);

        let text = {
            let room = self.active_room.read();
            serde_json::to_string(&InvocationFrame {
                id,
                method,
                args: &args,
                state: FrameState {
                    active_room: room.as_deref(),
                },
            })?
        };

        // Register before sending so a fast reply is never missed.
        let (tx, rx) = oneshot::channel();
        self.shared.pending.lock().insert(
            id,
            PendingCall {
                method: method.to_string(),
                reply: tx,
            },
        );

        debug!(method = %method, id, "Invoking hub method");
        if let Err(e) = outbound.send(text).await {
            self.shared.pending.lock().remove(&id);
            return Err(TransportError::SendFailed(e.to_string()));
        }

        match timeout(self.config.invoke_timeout, rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(TransportError::ConnectionClosed {
                reason: "connection dropped before reply".into(),
            }),
            Err(_) => {
                self.shared.pending.lock().remove(&id);
                Err(TransportError::Timeout {
                    method: method.to_string(),
                })
            }
        }
    }

    fn set_active_room(&self, room: Option<&str>) {
        *self.active_room.write() = room.map(str::to_string);
    }

    fn is_active(&self) -> bool {
        self.shared.active.load(Ordering::SeqCst)
    }

    async fn close(&self) {
        let Some(connection) = self.connection.lock().take() else {
            return;
        };
        let _ = connection.shutdown.send(true);
        if let Err(e) = connection.task.await {
            warn!(error = %e, "Socket task ended abnormally");
            self.shared.on_closed("socket task failed".into());
        }
    }
}

/// Pumps frames between the socket and the transport until either side
/// closes.
async fn run_socket_loop(
    mut ws_tx: WsSink,
    mut ws_rx: WsSource,
    mut outbound: mpsc::Receiver<String>,
    mut shutdown: watch::Receiver<bool>,
    shared: Arc<Shared>,
) {
    let reason = loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!("Closing hub connection");
                    let _ = ws_tx.close().await;
                    break "closed by client".to_string();
                }
            }

            Some(text) = outbound.recv() => {
                trace!(len = text.len(), "Sending frame");
                if let Err(e) = ws_tx.send(Message::Text(text.into())).await {
                    warn!(error = %e, "Failed to write frame");
                    break format!("write failed: {e}");
                }
            }

            msg = ws_rx.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    trace!(len = text.len(), "Received text");
                    shared.on_frame(text.as_str());
                }
                Some(Ok(Message::Binary(data))) => match std::str::from_utf8(&data) {
                    Ok(text) => shared.on_frame(text),
                    Err(e) => warn!(error = %e, "Ignoring non-UTF-8 binary frame"),
                },
                Some(Ok(Message::Ping(data))) => {
                    trace!("Received ping, sending pong");
                    let _ = ws_tx.send(Message::Pong(data)).await;
                }
                Some(Ok(Message::Pong(_))) | Some(Ok(Message::Frame(_))) => {}
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame
                        .map(|f| f.reason.as_str().to_string())
                        .filter(|r| !r.is_empty())
                        .unwrap_or_else(|| "closed by hub".to_string());
                    info!(reason = %reason, "Hub closed connection");
                    break reason;
                }
                Some(Err(e)) => {
                    warn!(error = %e, "WebSocket error");
                    break e.to_string();
                }
                None => {
                    info!("WebSocket stream ended");
                    break "stream ended".to_string();
                }
            }
        }
    };

    shared.on_closed(reason);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::net::TcpListener;
    use tokio_test::assert_ok;
    use tokio_tungstenite::accept_async;

    type ServerStream = WebSocketStream<TcpStream>;

    async fn listen() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        (listener, url)
    }

    async fn accept(listener: &TcpListener) -> ServerStream {
        let (stream, _) = listener.accept().await.unwrap();
        accept_async(stream).await.unwrap()
    }

    async fn next_json(server: &mut ServerStream) -> Value {
        loop {
            match server.next().await.unwrap().unwrap() {
                Message::Text(text) => return serde_json::from_str(text.as_str()).unwrap(),
                _ => continue,
            }
        }
    }

    async fn send_json(server: &mut ServerStream, value: Value) {
        server
            .send(Message::Text(value.to_string().into()))
            .await
            .unwrap();
    }

    fn identity() -> BotIdentity {
        BotIdentity::new("bot", "s3cret")
    }

    #[tokio::test]
    async fn invocation_round_trips_through_hub() {
        let (listener, url) = listen().await;
        let server = tokio::spawn(async move {
            let mut ws = accept(&listener).await;
            let call = next_json(&mut ws).await;
            assert_eq!(call["method"], "Send");
            assert_eq!(call["args"], json!(["hello"]));
            assert_eq!(call["state"]["activeRoom"], "dev");
            send_json(&mut ws, json!({ "id": call["id"], "result": "ok" })).await;
            ws
        });

        let transport = WsTransport::default();
        assert_ok!(transport.connect(&url, &identity()).await);
        assert!(transport.is_active());

        transport.set_active_room(Some("dev"));
        let result = transport.invoke("Send", vec![json!("hello")]).await.unwrap();
        assert_eq!(result, json!("ok"));

        transport.close().await;
        assert!(!transport.is_active());
        drop(server.await.unwrap());
    }

    #[tokio::test]
    async fn hub_errors_surface_as_remote() {
        let (listener, url) = listen().await;
        let server = tokio::spawn(async move {
            let mut ws = accept(&listener).await;
            let call = next_json(&mut ws).await;
            send_json(&mut ws, json!({ "id": call["id"], "error": "unknown room" })).await;
            ws
        });

        let transport = WsTransport::default();
        assert_ok!(transport.connect(&url, &identity()).await);
        let err = transport.invoke("Join", vec![]).await.unwrap_err();
        assert!(
            matches!(err, TransportError::Remote { ref method, ref message } if method == "Join" && message == "unknown room")
        );

        transport.close().await;
        drop(server.await.unwrap());
    }

    #[tokio::test]
    async fn events_reach_matching_subscribers() {
        let (listener, url) = listen().await;
        let server = tokio::spawn(async move {
            let mut ws = accept(&listener).await;
            send_json(&mut ws, json!({ "event": "typing", "args": [] })).await;
            send_json(&mut ws, json!({ "event": "logOn", "args": [["dev"]] })).await;
            ws
        });

        let transport = WsTransport::default();
        let (sink, mut events) = mpsc::unbounded_channel();
        transport.subscribe(&["logOn"], sink);
        assert_ok!(transport.connect(&url, &identity()).await);

        assert_eq!(
            events.recv().await.unwrap(),
            HubEvent::invoked("logOn", vec![json!(["dev"])])
        );

        let mut ws = server.await.unwrap();
        ws.close(None).await.unwrap();

        match events.recv().await.unwrap() {
            HubEvent::Closed { reason } => assert!(reason.is_some()),
            other => panic!("expected close, got {other:?}"),
        }
        assert!(!transport.is_active());
    }

    #[tokio::test]
    async fn timeout_clears_pending_call() {
        let (listener, url) = listen().await;
        let server = tokio::spawn(async move {
            let mut ws = accept(&listener).await;
            let _ = next_json(&mut ws).await;
            ws
        });

        let transport =
            WsTransport::new(WsTransportConfig::default().with_invoke_timeout(Duration::from_millis(50)));
        assert_ok!(transport.connect(&url, &identity()).await);

        let err = transport.invoke("Join", vec![]).await.unwrap_err();
        assert!(matches!(err, TransportError::Timeout { .. }));
        assert!(transport.shared.pending.lock().is_empty());

        transport.close().await;
        drop(server.await.unwrap());
    }

    #[tokio::test]
    async fn invoke_requires_connection() {
        let transport = WsTransport::default();
        let err = transport.invoke("Join", vec![]).await.unwrap_err();
        assert!(matches!(err, TransportError::NotConnected));
    }

    #[tokio::test]
    async fn connect_to_nothing_fails() {
        let (listener, url) = listen().await;
        drop(listener);

        let transport = WsTransport::default();
        let err = transport.connect(&url, &identity()).await.unwrap_err();
        assert!(matches!(err, TransportError::ConnectionFailed { .. }));
        assert!(!transport.is_active());
    }
}
