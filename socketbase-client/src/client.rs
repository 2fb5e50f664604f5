//! Room pub/sub client over a single persistent connection
//!
//! This module provides [`SocketBaseClient`], which owns the transport, the
//! connection state machine, the outbound queue, the pending join/leave
//! table and the subscriber registry.
//!
//! # Client Lifecycle
//!
//! 1. **Connect**: open the transport, flush queued frames, emit `open`
//! 2. **Use**: join/leave rooms, send messages, receive events
//! 3. **Reconnect**: after an unexpected close, retry with linear backoff
//!    while `auto_reconnect` is on and the attempt budget lasts
//! 4. **Close**: `close()` disables reconnection and clears all state
//!
//! # Send Policy
//!
//! Outbound frames are written straight away while the connection is open.
//! Otherwise they are queued and a connect is triggered, or rejected with
//! `Error::NotConnected` when auto-reconnect is off.
//!
//! # Cloning
//!
//! `SocketBaseClient` is cheaply cloneable using `Arc` internally. All clones
//! share the same connection and state.
//!
//! # Handlers
//!
//! `open` handlers run on the task that opened the connection, after the
//! receive loop has started, so they may await `join`/`leave` (for example to
//! rejoin rooms after a reconnect). Handlers for inbound events run on the
//! receive loop, one at a time. Such a handler must not await `join`/`leave`
//! itself, because the acknowledgement it waits for is read by that same
//! task. Spawn such work instead; `send` and `broadcast` are fine to await.

use crate::connection_state::{ConnectionManager, ConnectionState};
use crate::event::{BroadcastMessage, ErrorEvent, Event, EventKind, RoomMessage};
use crate::metrics::ClientMetrics;
use crate::queue::OutboundQueue;
use crate::request::{RequestKind, RequestManager};
use crate::subscriber::{EventRegistry, Subscription};
use crate::transport::{
    CloseInfo, EventStream, FrameSink, Transport, TransportConnection, TransportEvent,
};
use crate::ClientConfig;
use futures::future::BoxFuture;
use futures::{FutureExt, SinkExt, StreamExt};
use serde::Serialize;
use serde_json::Value;
use socketbase_core::{
    codec, ClientFrame, Error, ErrorKind, Inbound, Result, RoomAck, ServerFrame,
};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{oneshot, Mutex};

/// The currently open transport
struct Link {
    id: u64,
    sink: FrameSink,
    shutdown: oneshot::Sender<()>,
}

pub(crate) struct Shared {
    config: ClientConfig,
    auto_reconnect: AtomicBool,
    connection: ConnectionManager,
    link: Mutex<Option<Link>>,
    outbound: OutboundQueue,
    requests: RequestManager,
    events: EventRegistry,
    transport: Arc<dyn Transport>,
    metrics: Option<Arc<ClientMetrics>>,
    /// Bumped by `close()` so in-flight opens can tell they are stale
    epoch: AtomicU64,
    next_link_id: AtomicU64,
}

/// Room pub/sub client
#[derive(Clone)]
pub struct SocketBaseClient {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for SocketBaseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocketBaseClient")
            .field("config", &self.shared.config)
            .field("auto_reconnect", &self.auto_reconnect())
            .finish_non_exhaustive()
    }
}

impl SocketBaseClient {
    pub(crate) fn from_parts(
        config: ClientConfig,
        connection: ConnectionManager,
        transport: Arc<dyn Transport>,
        metrics: Option<Arc<ClientMetrics>>,
    ) -> Self {
        let auto_reconnect = AtomicBool::new(config.auto_reconnect);
        Self {
            shared: Arc::new(Shared {
                config,
                auto_reconnect,
                connection,
                link: Mutex::new(None),
                outbound: OutboundQueue::new(),
                requests: RequestManager::new(),
                events: EventRegistry::new(),
                transport,
                metrics,
                epoch: AtomicU64::new(0),
                next_link_id: AtomicU64::new(0),
            }),
        }
    }

    /// The configuration the client was built with
    pub fn config(&self) -> &ClientConfig {
        &self.shared.config
    }

    /// Open the connection
    ///
    /// Returns immediately when a connection is already open or being
    /// opened. Otherwise resolves once the transport is open, the outbound
    /// queue has been flushed and `open` handlers have run.
    ///
    /// # Errors
    ///
    /// `Error::Config` if the endpoint cannot be built, or the transport's
    /// error if it fails to open. A failed open also emits a
    /// `connection_error` event followed by `close`, and schedules a retry
    /// when auto-reconnect is on.
    pub async fn connect(&self) -> Result<()> {
        let epoch = self.shared.epoch.load(Ordering::SeqCst);
        self.connect_in_epoch(epoch).await
    }

    /// `connect` for spawned tasks, bound to the current epoch
    ///
    /// The returned future does nothing if `close()` runs before it is
    /// polled.
    pub(crate) fn connect_boxed(&self) -> BoxFuture<'static, Result<()>> {
        let client = self.clone();
        let epoch = self.shared.epoch.load(Ordering::SeqCst);
        async move { client.connect_in_epoch(epoch).await }.boxed()
    }

    #[tracing::instrument(
        skip(self),
        fields(url = %self.shared.config.url, hash = %self.shared.config.hash)
    )]
    async fn connect_in_epoch(&self, epoch: u64) -> Result<()> {
        let shared = &self.shared;
        {
            let _link = shared.link.lock().await;
            if shared.epoch.load(Ordering::SeqCst) != epoch {
                tracing::debug!("Client closed, skipping connect");
                return Err(Error::ConnectionClosed);
            }
            if !shared.connection.begin_connecting().await {
                tracing::debug!("Connection already open or in progress");
                return Ok(());
            }
        }
        self.record_state(ConnectionState::Connecting);

        let endpoint = match shared.config.endpoint() {
            Ok(endpoint) => endpoint,
            Err(e) => {
                shared.connection.closed().await;
                self.record_state(ConnectionState::Closed);
                return Err(e);
            }
        };

        tracing::info!("Connecting to server");
        match shared.transport.open(&endpoint).await {
            Ok(connection) => self.on_open(connection, epoch).await,
            Err(e) => {
                if shared.epoch.load(Ordering::SeqCst) != epoch {
                    return Err(e);
                }
                tracing::error!(error = %e, "Failed to open connection");
                shared.connection.closed().await;
                self.emit_error(ErrorKind::ConnectionError, e.to_string(), None)
                    .await;
                self.handle_disconnect(CloseInfo::abnormal()).await;
                Err(e)
            }
        }
    }

    async fn on_open(&self, connection: TransportConnection, epoch: u64) -> Result<()> {
        let shared = &self.shared;
        let TransportConnection { mut sink, events } = connection;
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let link_id = shared.next_link_id.fetch_add(1, Ordering::Relaxed);

        let mut link = shared.link.lock().await;
        if shared.epoch.load(Ordering::SeqCst) != epoch {
            drop(link);
            tracing::debug!("Client closed while connecting, discarding transport");
            let _ = sink.close().await;
            return Err(Error::ConnectionClosed);
        }

        let previous_attempts = shared.connection.opened().await;
        self.record_state(ConnectionState::Open);
        if previous_attempts > 0 {
            tracing::info!(attempts = previous_attempts, "Reconnected successfully");
            if let Some(ref m) = shared.metrics {
                m.record_reconnection_success();
            }
        } else {
            tracing::info!("Connected successfully");
        }

        // Queued frames go out before anything an `open` handler sends
        let queued = shared.outbound.drain().await;
        let mut flushed = 0;
        let mut flush_error = None;
        for frame in &queued {
            if let Err(e) = sink.send(frame.clone()).await {
                flush_error = Some(e);
                break;
            }
            flushed += 1;
        }
        if flushed < queued.len() {
            shared.outbound.restore(queued[flushed..].to_vec()).await;
        }
        if flushed > 0 {
            tracing::debug!(frames = flushed, "Flushed outbound queue");
            if let Some(ref m) = shared.metrics {
                for _ in 0..flushed {
                    m.record_frame_sent("queued");
                }
            }
        }

        *link = Some(Link {
            id: link_id,
            sink,
            shutdown: shutdown_tx,
        });
        drop(link);

        if let Some(e) = flush_error {
            tracing::error!(error = %e, "Failed to flush outbound queue");
            self.emit_error(ErrorKind::ConnectionError, e.to_string(), None)
                .await;
        }

        // Open handlers may await acks, so frames must already be read
        tokio::spawn(self.clone().receive_loop(events, shutdown_rx, link_id));
        self.emit(Event::Open).await;

        Ok(())
    }

    async fn receive_loop(
        self,
        mut events: EventStream,
        mut shutdown: oneshot::Receiver<()>,
        link_id: u64,
    ) {
        let info = loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    tracing::debug!("Receive loop stopped");
                    return;
                }
                event = events.next() => match event {
                    Some(TransportEvent::Frame(text)) => self.handle_message(&text).await,
                    Some(TransportEvent::Error(message)) => {
                        tracing::error!(error = %message, "Transport error");
                        self.emit_error(ErrorKind::ConnectionError, message, None).await;
                    }
                    Some(TransportEvent::Closed(info)) => break info,
                    None => break CloseInfo::abnormal(),
                },
            }
        };

        {
            let mut link = self.shared.link.lock().await;
            match link.as_ref() {
                Some(current) if current.id == link_id => {}
                _ => return,
            }
            *link = None;
            self.shared.connection.closed().await;
        }

        self.handle_disconnect(info).await;
    }

    async fn handle_disconnect(&self, info: CloseInfo) {
        self.record_state(ConnectionState::Closed);
        tracing::info!(code = ?info.code, reason = %info.reason, "Connection closed");
        self.emit(Event::Close(info)).await;
        self.schedule_reconnect().await;
    }

    async fn schedule_reconnect(&self) {
        if !self.auto_reconnect() {
            return;
        }

        let Some((attempt, delay)) = self.shared.connection.next_reconnect_delay().await else {
            let attempts = self.shared.connection.attempts().await;
            tracing::error!(attempts = attempts, "Reconnection abandoned (max attempts reached)");
            return;
        };

        if let Some(ref m) = self.shared.metrics {
            m.record_reconnection_attempt();
        }
        tracing::info!(
            attempt = attempt,
            delay_ms = delay.as_millis() as u64,
            "Scheduling reconnection"
        );

        let client = self.clone();
        let reconnecting = self.connect_boxed();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if !client.auto_reconnect() {
                tracing::debug!(attempt = attempt, "Reconnection cancelled");
                return;
            }
            if let Err(e) = reconnecting.await {
                tracing::warn!(attempt = attempt, error = %e, "Reconnection failed");
            }
        });
    }

    /// Route one inbound text frame
    async fn handle_message(&self, text: &str) {
        let inbound = match codec::decode(text) {
            Ok(inbound) => inbound,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to parse inbound frame");
                self.emit_error(ErrorKind::ParseError, e.to_string(), Some(text.to_string()))
                    .await;
                return;
            }
        };

        match inbound {
            Inbound::Frame(ServerFrame::Joined { room }) => {
                tracing::debug!(room = %room, "Joined room");
                self.shared.requests.complete(RequestKind::Join, &room).await;
                self.emit(Event::Joined { room }).await;
            }
            Inbound::Frame(ServerFrame::Left { room }) => {
                tracing::debug!(room = %room, "Left room");
                self.shared.requests.complete(RequestKind::Leave, &room).await;
                self.emit(Event::Left { room }).await;
            }
            Inbound::Frame(ServerFrame::Message {
                room,
                payload,
                from,
                timestamp,
            }) => {
                tracing::debug!(room = %room, "Room message received");
                self.emit(Event::Message(RoomMessage {
                    room,
                    payload,
                    from,
                    timestamp,
                }))
                .await;
            }
            Inbound::Frame(ServerFrame::Broadcast { payload, from }) => {
                tracing::debug!("Broadcast received");
                self.emit(Event::Broadcast(BroadcastMessage { payload, from }))
                    .await;
            }
            Inbound::Frame(ServerFrame::Error { message }) => {
                let message = message.unwrap_or_else(|| "Unknown server error".to_string());
                let failed = self
                    .shared
                    .requests
                    .fail_all(Error::Server(message.clone()))
                    .await;
                tracing::warn!(
                    error = %message,
                    failed_requests = failed,
                    "Server reported an error"
                );
                self.emit_error(ErrorKind::ServerError, message, None).await;
            }
            Inbound::Unrecognized(value) => {
                tracing::debug!("Frame of unknown type delivered as message");
                self.emit(Event::Unrecognized(value)).await;
            }
        }
    }

    /// Write a frame now, or queue it for the next open
    async fn dispatch(&self, frame: ClientFrame) -> Result<()> {
        let shared = &self.shared;
        let kind = frame.kind();
        let text = codec::encode_frame(&frame)?;

        let mut link = shared.link.lock().await;
        if shared.connection.is_open().await {
            if let Some(current) = link.as_mut() {
                let sent = current.sink.send(text).await;
                drop(link);
                match sent {
                    Ok(()) => {
                        tracing::debug!(frame = kind, "Frame sent");
                        if let Some(ref m) = shared.metrics {
                            m.record_frame_sent(kind);
                        }
                    }
                    Err(e) => {
                        tracing::error!(frame = kind, error = %e, "Failed to write frame");
                        self.emit_error(ErrorKind::ConnectionError, e.to_string(), None)
                            .await;
                    }
                }
                return Ok(());
            }
        }

        if !self.auto_reconnect() {
            return Err(Error::NotConnected);
        }

        let queued = shared.outbound.push(text).await;
        let connecting = self.connect_boxed();
        drop(link);
        tracing::debug!(frame = kind, queued = queued, "Not connected, frame queued");
        if let Some(ref m) = shared.metrics {
            m.record_frame_queued(kind);
        }

        tokio::spawn(async move {
            if let Err(e) = connecting.await {
                tracing::warn!(error = %e, "Connect triggered by queued frame failed");
            }
        });
        Ok(())
    }

    /// Join a room
    ///
    /// Resolves once the server acknowledges with `joined` for the same room.
    ///
    /// # Errors
    ///
    /// - `Error::Validation` for an empty room name, without touching the
    ///   transport
    /// - `Error::NotConnected` when disconnected and auto-reconnect is off
    /// - `Error::Server` when the server answers with an `error` frame
    /// - `Error::Superseded` when another `join` for the room replaces this one
    /// - `Error::Timeout` when a request timeout is configured and expires
    /// - `Error::ConnectionClosed` when `close()` is called while waiting
    #[tracing::instrument(skip(self))]
    pub async fn join(&self, room: &str) -> Result<RoomAck> {
        self.room_request(RequestKind::Join, room).await
    }

    /// Leave a room
    ///
    /// Same contract as [`join`](Self::join), acknowledged by `left`.
    #[tracing::instrument(skip(self))]
    pub async fn leave(&self, room: &str) -> Result<RoomAck> {
        self.room_request(RequestKind::Leave, room).await
    }

    async fn room_request(&self, kind: RequestKind, room: &str) -> Result<RoomAck> {
        validate_room(room)?;
        let shared = &self.shared;
        let start = Instant::now();

        let handle = shared.requests.register(kind, room).await;
        let frame = match kind {
            RequestKind::Join => ClientFrame::Join {
                room: room.to_string(),
            },
            RequestKind::Leave => ClientFrame::Leave {
                room: room.to_string(),
            },
        };

        if let Err(e) = self.dispatch(frame).await {
            shared.requests.remove(kind, room, handle.id).await;
            return Err(e);
        }

        let received = match shared.config.request_timeout() {
            Some(limit) => match tokio::time::timeout(limit, handle.rx).await {
                Ok(received) => received,
                Err(_) => {
                    shared.requests.remove(kind, room, handle.id).await;
                    tracing::warn!(kind = kind.as_str(), room = %room, "Request timed out");
                    self.record_request(kind, "timeout", start);
                    return Err(Error::Timeout);
                }
            },
            None => handle.rx.await,
        };

        let result = received.unwrap_or(Err(Error::ConnectionClosed));
        match &result {
            Ok(_) => self.record_request(kind, "success", start),
            Err(e) => {
                tracing::debug!(kind = kind.as_str(), room = %room, error = %e, "Request failed");
                self.record_request(kind, "error", start);
            }
        }
        result
    }

    /// Publish a payload to a room
    ///
    /// Fire-and-forget: write failures surface as `error` events.
    ///
    /// # Errors
    ///
    /// `Error::Validation` for an empty room or a null payload,
    /// `Error::NotConnected` when disconnected and auto-reconnect is off.
    #[tracing::instrument(skip(self, payload))]
    pub async fn send<P: Serialize>(&self, room: &str, payload: P) -> Result<()> {
        validate_room(room)?;
        let payload = validate_payload(payload)?;
        self.dispatch(ClientFrame::Message {
            room: room.to_string(),
            payload,
        })
        .await
    }

    /// Publish a payload to every client of the project
    ///
    /// Same contract as [`send`](Self::send), without a room.
    #[tracing::instrument(skip(self, payload))]
    pub async fn broadcast<P: Serialize>(&self, payload: P) -> Result<()> {
        let payload = validate_payload(payload)?;
        self.dispatch(ClientFrame::Broadcast { payload }).await
    }

    /// Register a handler for an event kind
    ///
    /// Handlers for the same kind run in registration order. The returned
    /// [`Subscription`] removes exactly this registration.
    pub async fn on<F, Fut>(&self, kind: EventKind, handler: F) -> Subscription
    where
        F: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.shared.events.register(kind, handler).await
    }

    /// Shut the client down
    ///
    /// Disables auto-reconnect, closes the transport and clears subscribers,
    /// pending requests and queued frames. Callers still waiting on a
    /// join/leave get `Error::ConnectionClosed`. Safe to call repeatedly and
    /// before any connection.
    #[tracing::instrument(skip(self))]
    pub async fn close(&self) {
        let shared = &self.shared;
        shared.auto_reconnect.store(false, Ordering::SeqCst);
        shared.epoch.fetch_add(1, Ordering::SeqCst);

        let link = {
            let mut link = shared.link.lock().await;
            let taken = link.take();
            shared.connection.closed().await;
            taken
        };
        self.record_state(ConnectionState::Closed);

        if let Some(mut link) = link {
            let _ = link.shutdown.send(());
            if let Err(e) = link.sink.close().await {
                tracing::debug!(error = %e, "Transport close failed");
            }
        }

        shared.events.clear().await;
        let dropped_requests = shared.requests.clear().await;
        let dropped_frames = shared.outbound.len().await;
        shared.outbound.clear().await;

        tracing::info!(
            dropped_requests = dropped_requests,
            dropped_frames = dropped_frames,
            "Client closed"
        );
    }

    /// True only while the connection is open
    pub async fn is_connected(&self) -> bool {
        self.shared.connection.is_open().await
    }

    /// Current connection state
    pub async fn connection_state(&self) -> ConnectionState {
        self.shared.connection.state().await
    }

    /// Whether frames are queued and reconnection attempted while disconnected
    pub fn auto_reconnect(&self) -> bool {
        self.shared.auto_reconnect.load(Ordering::SeqCst)
    }

    /// Number of frames waiting for the next open
    pub async fn queued_frames(&self) -> usize {
        self.shared.outbound.len().await
    }

    /// Number of join/leave requests awaiting acknowledgement
    pub async fn pending_requests(&self) -> usize {
        self.shared.requests.pending_count().await
    }

    /// Reconnect attempts made since the last successful open
    pub async fn reconnect_attempts(&self) -> u32 {
        self.shared.connection.attempts().await
    }

    async fn emit(&self, event: Event) {
        if let Some(ref m) = self.shared.metrics {
            m.record_event(event.kind().as_str());
        }
        self.shared.events.emit(event).await;
    }

    async fn emit_error(&self, kind: ErrorKind, message: impl Into<String>, raw: Option<String>) {
        if let Some(ref m) = self.shared.metrics {
            m.record_error(kind.as_str());
        }
        self.emit(Event::Error(ErrorEvent {
            kind,
            message: message.into(),
            raw,
        }))
        .await;
    }

    fn record_state(&self, state: ConnectionState) {
        if let Some(ref m) = self.shared.metrics {
            m.update_connection_state(state.as_metric());
        }
    }

    fn record_request(&self, kind: RequestKind, status: &str, start: Instant) {
        if let Some(ref m) = self.shared.metrics {
            m.record_request(kind.as_str(), status, start.elapsed().as_secs_f64());
        }
    }
}

fn validate_room(room: &str) -> Result<()> {
    if room.is_empty() {
        return Err(Error::Validation("Room name required".to_string()));
    }
    Ok(())
}

fn validate_payload<P: Serialize>(payload: P) -> Result<Value> {
    let payload = serde_json::to_value(payload)?;
    if payload.is_null() {
        return Err(Error::Validation("Payload required".to_string()));
    }
    Ok(payload)
}
