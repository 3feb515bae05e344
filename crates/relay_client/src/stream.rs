//! Streaming bundle results over a shared WebSocket subscription
//!
//! One connection carries results for every bundle this client submits.
//! A reader task routes each pushed result to the subscriber registered for
//! its bundle id. Results that arrive before anyone subscribed are held in a
//! bounded backlog and replayed on subscribe, so registering right after
//! `sendBundle` returns cannot miss an early result.

use crate::traits::{BundleEventSource, BundleSubscription};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use types::{
    utils::generate_request_id, BundleEvent, BundleHandle, JsonRpcRequest, RelayEndpoint,
    RelayError,
};

/// Unclaimed results kept for late subscribers
const BACKLOG_CAPACITY: usize = 256;
const SUBSCRIBE_METHOD: &str = "subscribeBundleResults";
const NOTIFICATION_METHOD: &str = "bundleResult";
const INITIAL_RECONNECT_DELAY: Duration = Duration::from_secs(1);
const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(30);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Pushed result for one bundle, mirroring the block engine's BundleResult
#[derive(Debug, Deserialize)]
struct BundleResultNotification {
    bundle_id: String,
    #[serde(default)]
    accepted: Option<AcceptedResult>,
    #[serde(default)]
    processed: Option<AcceptedResult>,
    #[serde(default)]
    finalized: Option<Value>,
    #[serde(default)]
    rejected: Option<Value>,
    #[serde(default)]
    dropped: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct AcceptedResult {
    #[serde(default)]
    slot: Option<u64>,
    #[serde(default)]
    validator_identity: Option<String>,
}

#[derive(Debug, PartialEq)]
enum StreamMessage {
    Result { bundle_id: String, event: BundleEvent },
    Error(String),
    Ignored,
}

impl BundleResultNotification {
    fn into_event(self) -> Option<(String, BundleEvent)> {
        let event = if let Some(accepted) = self.accepted.or(self.processed) {
            BundleEvent::Accepted {
                slot: accepted.slot,
                validator: accepted.validator_identity,
            }
        } else if self.finalized.is_some() {
            BundleEvent::Accepted {
                slot: None,
                validator: None,
            }
        } else if let Some(rejected) = self.rejected {
            BundleEvent::Rejected {
                reason: rejected.to_string(),
            }
        } else if let Some(dropped) = self.dropped {
            BundleEvent::Rejected {
                reason: format!("dropped: {}", dropped),
            }
        } else {
            return None;
        };
        Some((self.bundle_id, event))
    }
}

fn parse_stream_message(text: &str) -> StreamMessage {
    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => return StreamMessage::Error(format!("malformed stream message: {} | raw: {}", e, text)),
    };

    if let Some(error) = value.get("error") {
        return StreamMessage::Error(error.to_string());
    }

    if value.get("method").and_then(Value::as_str) != Some(NOTIFICATION_METHOD) {
        // Subscription acknowledgements and anything unrelated
        return StreamMessage::Ignored;
    }

    let params = &value["params"];
    let payload = params.get("result").unwrap_or(params);
    match serde_json::from_value::<BundleResultNotification>(payload.clone()) {
        Ok(notification) => match notification.into_event() {
            Some((bundle_id, event)) => StreamMessage::Result { bundle_id, event },
            None => StreamMessage::Ignored,
        },
        Err(e) => StreamMessage::Error(format!("malformed bundle result: {} | raw: {}", e, text)),
    }
}

#[derive(Debug, Default)]
struct RouterState {
    subscribers: HashMap<String, Vec<mpsc::UnboundedSender<BundleEvent>>>,
    backlog: VecDeque<(String, BundleEvent)>,
}

/// Routes pushed results to per-bundle channels. A bundle may have several
/// subscribers; each receives every result for it.
#[derive(Debug, Default)]
struct EventRouter {
    inner: Mutex<RouterState>,
}

impl EventRouter {
    async fn register(&self, bundle_id: &str) -> BundleSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut guard = self.inner.lock().await;
        let state = &mut *guard;

        state.subscribers.retain(|_, senders| {
            senders.retain(|sender| !sender.is_closed());
            !senders.is_empty()
        });

        let mut kept = VecDeque::with_capacity(state.backlog.len());
        for (id, event) in state.backlog.drain(..) {
            if id == bundle_id {
                let _ = tx.send(event);
            } else {
                kept.push_back((id, event));
            }
        }
        state.backlog = kept;
        state
            .subscribers
            .entry(bundle_id.to_string())
            .or_default()
            .push(tx);
        rx
    }

    async fn dispatch(&self, bundle_id: String, event: BundleEvent) {
        let mut guard = self.inner.lock().await;
        let state = &mut *guard;

        if let Some(senders) = state.subscribers.get_mut(&bundle_id) {
            // Closed channels mean tracking already resolved; late events are dropped
            senders.retain(|tx| tx.send(event.clone()).is_ok());
            if senders.is_empty() {
                state.subscribers.remove(&bundle_id);
            }
            return;
        }

        if state.backlog.len() == BACKLOG_CAPACITY {
            state.backlog.pop_front();
        }
        state.backlog.push_back((bundle_id, event));
    }

    async fn broadcast(&self, event: BundleEvent) {
        let mut state = self.inner.lock().await;
        state.subscribers.retain(|_, senders| {
            senders.retain(|tx| tx.send(event.clone()).is_ok());
            !senders.is_empty()
        });
    }
}

/// Shared WebSocket subscription to a relay's bundle results
#[derive(Debug)]
pub struct RelayStream {
    relay: String,
    router: Arc<EventRouter>,
    cancel: CancellationToken,
}

impl RelayStream {
    /// Connect, subscribe, and start routing results in the background
    pub async fn connect(endpoint: &RelayEndpoint) -> Result<Self, RelayError> {
        let relay = endpoint.name.clone();
        let ws_url = endpoint
            .ws_url
            .clone()
            .filter(|url| !url.is_empty())
            .ok_or_else(|| RelayError::Subscription {
                relay: relay.clone(),
                message: "no WebSocket URL configured".to_string(),
            })?;
        let connect_timeout = Duration::from_secs(endpoint.timeout_seconds);

        let socket = open_subscription(&relay, &ws_url, connect_timeout).await?;
        tracing::info!(relay = %relay, url = %ws_url, "Subscribed to bundle results");

        let router = Arc::new(EventRouter::default());
        let cancel = CancellationToken::new();
        tokio::spawn(run_reader(
            relay.clone(),
            ws_url,
            connect_timeout,
            socket,
            router.clone(),
            cancel.clone(),
        ));

        Ok(Self {
            relay,
            router,
            cancel,
        })
    }

    /// Stop the reader task and close the connection
    pub fn close(&self) {
        self.cancel.cancel();
    }
}

impl Drop for RelayStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[async_trait]
impl BundleEventSource for RelayStream {
    fn name(&self) -> &str {
        &self.relay
    }

    async fn subscribe(&self, handle: &BundleHandle) -> Result<BundleSubscription, RelayError> {
        if self.cancel.is_cancelled() {
            return Err(RelayError::Subscription {
                relay: self.relay.clone(),
                message: "stream is closed".to_string(),
            });
        }
        tracing::debug!(relay = %self.relay, bundle_id = %handle, "Registering bundle result subscriber");
        Ok(self.router.register(handle.as_str()).await)
    }
}

async fn open_subscription(
    relay: &str,
    ws_url: &str,
    connect_timeout: Duration,
) -> Result<WsStream, RelayError> {
    let (mut socket, _response) = timeout(connect_timeout, connect_async(ws_url))
        .await
        .map_err(|_| RelayError::Timeout {
            relay: relay.to_string(),
            endpoint: ws_url.to_string(),
        })?
        .map_err(|e| RelayError::Connection {
            relay: relay.to_string(),
            message: e.to_string(),
        })?;

    let request = JsonRpcRequest::new(generate_request_id(), SUBSCRIBE_METHOD, json!([]));
    let payload = serde_json::to_string(&request).map_err(|e| RelayError::Subscription {
        relay: relay.to_string(),
        message: e.to_string(),
    })?;

    socket
        .send(Message::Text(payload.into()))
        .await
        .map_err(|e| RelayError::Subscription {
            relay: relay.to_string(),
            message: e.to_string(),
        })?;

    Ok(socket)
}

async fn run_reader(
    relay: String,
    ws_url: String,
    connect_timeout: Duration,
    mut socket: WsStream,
    router: Arc<EventRouter>,
    cancel: CancellationToken,
) {
    loop {
        let interrupted = tokio::select! {
            _ = cancel.cancelled() => None,
            reason = pump(&relay, &mut socket, &router) => Some(reason),
        };

        let Some(reason) = interrupted else {
            let _ = socket.close(None).await;
            tracing::debug!(relay = %relay, "Bundle result stream closed");
            return;
        };

        tracing::warn!(relay = %relay, reason = %reason, "Bundle result stream interrupted");
        router.broadcast(BundleEvent::TransportError(reason)).await;

        let mut delay = INITIAL_RECONNECT_DELAY;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }

            let attempt = tokio::select! {
                _ = cancel.cancelled() => return,
                attempt = open_subscription(&relay, &ws_url, connect_timeout) => attempt,
            };

            match attempt {
                Ok(reconnected) => {
                    tracing::info!(relay = %relay, "Bundle result stream reconnected");
                    socket = reconnected;
                    break;
                }
                Err(e) => {
                    tracing::warn!(relay = %relay, error = %e, retry_in_ms = delay.as_millis() as u64, "Reconnect failed");
                    router.broadcast(BundleEvent::TransportError(e.to_string())).await;
                    delay = (delay * 2).min(MAX_RECONNECT_DELAY);
                }
            }
        }
    }
}

/// Read until the connection fails; returns why it stopped
async fn pump(relay: &str, socket: &mut WsStream, router: &EventRouter) -> String {
    while let Some(message) = socket.next().await {
        match message {
            Ok(Message::Text(text)) => handle_text(relay, text.as_str(), router).await,
            Ok(Message::Binary(bytes)) => match std::str::from_utf8(&bytes) {
                Ok(text) => handle_text(relay, text, router).await,
                Err(_) => tracing::debug!(relay = %relay, len = bytes.len(), "Ignoring non-UTF-8 frame"),
            },
            Ok(Message::Close(frame)) => return format!("closed by relay: {:?}", frame),
            Ok(_) => {}
            Err(e) => return e.to_string(),
        }
    }
    "stream ended".to_string()
}

async fn handle_text(relay: &str, text: &str, router: &EventRouter) {
    match parse_stream_message(text) {
        StreamMessage::Result { bundle_id, event } => {
            tracing::debug!(relay = %relay, bundle_id = %bundle_id, event = ?event, "Bundle result received");
            router.dispatch(bundle_id, event).await;
        }
        StreamMessage::Error(message) => {
            tracing::warn!(relay = %relay, error = %message, "Relay stream error");
            router.broadcast(BundleEvent::TransportError(message)).await;
        }
        StreamMessage::Ignored => {
            tracing::trace!(relay = %relay, raw = %text, "Ignoring stream message");
        }
    }
}
