//! Common test utilities for socketbase-client integration tests
//!
//! Provides an in-memory [`MockTransport`] that hands each opened
//! connection to the test as a [`MockConnection`], a [`MockWsServer`] on
//! a real local socket for end-to-end WebSocket tests, and small helpers
//! for building clients and recording events.

#![allow(dead_code)]

use futures::channel::mpsc as fmpsc;
use futures::future::BoxFuture;
use futures::{FutureExt, SinkExt, StreamExt};
use serde_json::Value;
use socketbase_client::{
    ClientBuilder, CloseInfo, Event, EventKind, SocketBaseClient, Transport, TransportConnection,
    TransportEvent,
};
use socketbase_core::Error;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;
use url::Url;

/// Upper bound for anything a test waits on
pub const WAIT: Duration = Duration::from_secs(2);

/// Server side of one connection opened through [`MockTransport`]
pub struct MockConnection {
    sent: fmpsc::UnboundedReceiver<String>,
    server: fmpsc::UnboundedSender<TransportEvent>,
}

impl MockConnection {
    /// Next frame written by the client, parsed as JSON
    pub async fn next_frame(&mut self) -> Option<Value> {
        let text = tokio::time::timeout(WAIT, self.sent.next())
            .await
            .ok()
            .flatten()?;
        Some(serde_json::from_str(&text).expect("client wrote invalid JSON"))
    }

    /// Frames written so far and not yet read, without waiting
    pub fn frames_now(&mut self) -> Vec<Value> {
        let mut frames = Vec::new();
        while let Ok(Some(text)) = self.sent.try_next() {
            frames.push(serde_json::from_str(&text).expect("client wrote invalid JSON"));
        }
        frames
    }

    /// Deliver a JSON frame to the client
    pub fn push(&self, frame: Value) {
        self.push_text(&frame.to_string());
    }

    /// Deliver raw text to the client
    pub fn push_text(&self, text: &str) {
        let _ = self
            .server
            .unbounded_send(TransportEvent::Frame(text.to_string()));
    }

    /// Report a transport error to the client
    pub fn fail(&self, message: &str) {
        let _ = self
            .server
            .unbounded_send(TransportEvent::Error(message.to_string()));
    }

    /// Close the connection from the server side
    pub fn close(&self, code: u16, reason: &str) {
        let _ = self
            .server
            .unbounded_send(TransportEvent::Closed(CloseInfo::new(Some(code), reason)));
    }
}

struct MockInner {
    opens: std::sync::Mutex<Vec<(Instant, String)>>,
    failures: AtomicUsize,
    open_delay_ms: AtomicU64,
    connections_tx: mpsc::UnboundedSender<MockConnection>,
    connections_rx: Mutex<mpsc::UnboundedReceiver<MockConnection>>,
}

/// In-memory transport recording every open
#[derive(Clone)]
pub struct MockTransport {
    inner: Arc<MockInner>,
}

impl MockTransport {
    pub fn new() -> Self {
        let (connections_tx, connections_rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(MockInner {
                opens: std::sync::Mutex::new(Vec::new()),
                failures: AtomicUsize::new(0),
                open_delay_ms: AtomicU64::new(0),
                connections_tx,
                connections_rx: Mutex::new(connections_rx),
            }),
        }
    }

    /// Make the next `count` opens fail
    pub fn fail_next(&self, count: usize) {
        self.inner.failures.store(count, Ordering::SeqCst);
    }

    /// Delay every open by `delay`
    pub fn set_open_delay(&self, delay: Duration) {
        self.inner
            .open_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Number of open attempts, failed ones included
    pub fn open_count(&self) -> usize {
        self.inner.opens.lock().unwrap().len()
    }

    /// Target URLs of every open attempt
    pub fn urls(&self) -> Vec<String> {
        self.inner
            .opens
            .lock()
            .unwrap()
            .iter()
            .map(|(_, url)| url.clone())
            .collect()
    }

    /// When each open attempt started
    pub fn open_times(&self) -> Vec<Instant> {
        self.inner
            .opens
            .lock()
            .unwrap()
            .iter()
            .map(|(at, _)| *at)
            .collect()
    }

    /// Wait for the next successfully opened connection
    pub async fn next_connection(&self) -> Option<MockConnection> {
        let mut rx = self.inner.connections_rx.lock().await;
        tokio::time::timeout(WAIT, rx.recv()).await.ok().flatten()
    }
}

impl Transport for MockTransport {
    fn open(&self, url: &Url) -> BoxFuture<'static, socketbase_core::Result<TransportConnection>> {
        self.inner
            .opens
            .lock()
            .unwrap()
            .push((Instant::now(), url.to_string()));

        let fail = self
            .inner
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        let delay = Duration::from_millis(self.inner.open_delay_ms.load(Ordering::SeqCst));
        let connections_tx = self.inner.connections_tx.clone();

        async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if fail {
                return Err(Error::WebSocket("connection refused".to_string()));
            }

            let (sent_tx, sent_rx) = fmpsc::unbounded::<String>();
            let (server_tx, server_rx) = fmpsc::unbounded::<TransportEvent>();
            let _ = connections_tx.send(MockConnection {
                sent: sent_rx,
                server: server_tx,
            });

            Ok(TransportConnection {
                sink: Box::pin(sent_tx.sink_map_err(|e| Error::WebSocket(e.to_string()))),
                events: server_rx.boxed(),
            })
        }
        .boxed()
    }
}

/// Builder wired to `transport`, with auto-connect off and short delays
pub fn builder(transport: &MockTransport) -> ClientBuilder {
    ClientBuilder::new("proj", "token")
        .url("ws://mock.local")
        .auto_connect(false)
        .reconnect_delay(Duration::from_millis(20))
        .with_transport(transport.clone())
}

/// Client wired to `transport` with default test settings
pub fn client(transport: &MockTransport) -> SocketBaseClient {
    builder(transport).build().unwrap()
}

/// Events received by a [`record_events`] recorder
pub type EventLog = Arc<std::sync::Mutex<Vec<Event>>>;

/// Subscribe to every event kind and record what arrives
pub async fn record_events(client: &SocketBaseClient) -> EventLog {
    let log: EventLog = Arc::new(std::sync::Mutex::new(Vec::new()));
    for kind in EventKind::ALL {
        let log = Arc::clone(&log);
        client
            .on(kind, move |event| {
                let log = Arc::clone(&log);
                async move {
                    log.lock().unwrap().push(event);
                }
            })
            .await;
    }
    log
}

/// Recorded events of one kind
pub fn events_of(log: &EventLog, kind: EventKind) -> Vec<Event> {
    log.lock()
        .unwrap()
        .iter()
        .filter(|event| event.kind() == kind)
        .cloned()
        .collect()
}

/// Poll `condition` until it holds or [`WAIT`] expires
pub async fn wait_until<F, Fut>(mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = Instant::now() + WAIT;
    loop {
        if condition().await {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Wait until `log` holds at least `count` events of `kind`
pub async fn wait_for_events(log: &EventLog, kind: EventKind, count: usize) -> bool {
    wait_until(|| {
        let log = log.clone();
        async move { events_of(&log, kind).len() >= count }
    })
    .await
}

/// Wait until `client` has exactly `count` unacknowledged join/leave calls
pub async fn wait_for_pending(client: &SocketBaseClient, count: usize) -> bool {
    wait_until(|| {
        let client = client.clone();
        async move { client.pending_requests().await == count }
    })
    .await
}

#[derive(Clone, Debug)]
enum ServerCommand {
    Send(String),
    Close,
}

/// Mock WebSocket server for end-to-end tests
///
/// Accepts connections on a local port, records the request path of each
/// handshake and every text frame received, and answers frames through a
/// handler.
pub struct MockWsServer {
    addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
    commands: broadcast::Sender<ServerCommand>,
    message_rx: mpsc::Receiver<String>,
    paths: Arc<std::sync::Mutex<Vec<String>>>,
}

impl MockWsServer {
    /// Start a server that never answers
    pub async fn new() -> Self {
        Self::with_handler(|_| Vec::new()).await
    }

    /// Start a server answering each received frame with the handler's replies
    pub async fn with_handler<F>(handler: F) -> Self
    where
        F: Fn(&str) -> Vec<String> + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let (msg_tx, message_rx) = mpsc::channel::<String>(100);
        let (commands, _) = broadcast::channel::<ServerCommand>(16);
        let paths = Arc::new(std::sync::Mutex::new(Vec::new()));
        let handler = Arc::new(handler);

        let commands_tx = commands.clone();
        let paths_clone = Arc::clone(&paths);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    accepted = listener.accept() => {
                        let Ok((stream, _)) = accepted else { continue };
                        let msg_tx = msg_tx.clone();
                        let handler = Arc::clone(&handler);
                        let paths = Arc::clone(&paths_clone);
                        let mut commands = commands_tx.subscribe();

                        tokio::spawn(async move {
                            let callback = |request: &Request, response: Response| {
                                let target = request
                                    .uri()
                                    .path_and_query()
                                    .map(|pq| pq.as_str().to_string())
                                    .unwrap_or_default();
                                paths.lock().unwrap().push(target);
                                Ok::<Response, ErrorResponse>(response)
                            };
                            let Ok(ws_stream) = accept_hdr_async(stream, callback).await else {
                                return;
                            };
                            let (mut write, mut read) = ws_stream.split();

                            loop {
                                tokio::select! {
                                    command = commands.recv() => match command {
                                        Ok(ServerCommand::Send(text)) => {
                                            let _ = write.send(Message::Text(text)).await;
                                        }
                                        Ok(ServerCommand::Close) | Err(_) => {
                                            let _ = write.close().await;
                                            break;
                                        }
                                    },
                                    message = read.next() => match message {
                                        Some(Ok(Message::Text(text))) => {
                                            let _ = msg_tx.send(text.clone()).await;
                                            for reply in (*handler)(&text) {
                                                let _ = write.send(Message::Text(reply)).await;
                                            }
                                        }
                                        Some(Ok(_)) => {}
                                        Some(Err(_)) | None => break,
                                    },
                                }
                            }
                        });
                    }
                }
            }
        });

        Self {
            addr,
            shutdown_tx,
            commands,
            message_rx,
            paths,
        }
    }

    /// Base URL to configure the client with
    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Request targets (path and query) of accepted handshakes
    pub fn paths(&self) -> Vec<String> {
        self.paths.lock().unwrap().clone()
    }

    /// Wait for the next frame received from any client
    pub async fn wait_for_message(&mut self) -> Option<String> {
        tokio::time::timeout(WAIT, self.message_rx.recv())
            .await
            .ok()
            .flatten()
    }

    /// Send a frame to every connected client
    pub fn push(&self, frame: Value) {
        let _ = self.commands.send(ServerCommand::Send(frame.to_string()));
    }

    /// Close every open connection with a close handshake
    pub fn close_connections(&self) {
        let _ = self.commands.send(ServerCommand::Close);
    }

    /// Stop accepting connections
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}
