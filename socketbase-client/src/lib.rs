//! Room-based publish/subscribe client over WebSocket
//!
//! This crate provides the connection manager for the socketbase protocol:
//! one persistent socket per client, authenticated with a JWT, over which
//! the client joins and leaves rooms, publishes messages and receives
//! events.
//!
//! # Core Features
//!
//! - **Rooms**: `join`/`leave` resolve when the server acknowledges them
//! - **Messaging**: room-scoped `send` and project-wide `broadcast`
//! - **Events**: subscribe to `open`, `close`, `error`, `message`, `joined`,
//!   `left` and `broadcast`
//! - **Offline Queue**: frames written while disconnected are flushed, in
//!   order, on the next open
//! - **Auto-Reconnection**: linear backoff with an attempt budget
//! - **Observability**: OpenTelemetry integration for traces and metrics
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use socketbase_client::{create_client, ClientConfig, Event, EventKind};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = ClientConfig::new("project-hash", "eyJhbGciOi...");
//!     config.auto_connect = false;
//!     let client = create_client(config)?;
//!
//!     client.on(EventKind::Message, |event| async move {
//!         if let Event::Message(message) = event {
//!             println!("{}: {}", message.room, message.payload);
//!         }
//!     }).await;
//!
//!     client.connect().await?;
//!     client.join("lobby").await?;
//!     client.send("lobby", json!({"text": "hello"})).await?;
//!
//!     client.close().await;
//!     Ok(())
//! }
//! ```
//!
//! # Configuring Reconnection
//!
//! ```rust,no_run
//! use socketbase_client::ClientBuilder;
//! use std::time::Duration;
//!
//! # async fn example() -> socketbase_core::Result<()> {
//! let client = ClientBuilder::new("project-hash", "jwt")
//!     .reconnect_delay(Duration::from_millis(250))
//!     .max_reconnect_attempts(8)
//!     .request_timeout(Duration::from_secs(5))
//!     .connect()
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod client;
mod client_builder;
mod config;
mod connection_state;
mod event;
mod metrics;
mod queue;
mod reconnect;
mod request;
mod subscriber;
mod transport;

pub use client::SocketBaseClient;
pub use client_builder::{create_client, ClientBuilder};
pub use config::{
    ClientConfig, DEFAULT_MAX_RECONNECT_ATTEMPTS, DEFAULT_RECONNECT_DELAY_MS, DEFAULT_URL,
};
pub use connection_state::{ConnectionManager, ConnectionState};
pub use event::{BroadcastMessage, ErrorEvent, Event, EventKind, RoomMessage};
pub use metrics::ClientMetrics;
pub use queue::OutboundQueue;
pub use reconnect::{LinearBackoff, ReconnectionStrategy};
pub use request::{PendingHandle, RequestKind, RequestManager};
pub use subscriber::{EventFn, EventRegistry, Subscription};
pub use transport::{
    CloseInfo, EventStream, FrameSink, Transport, TransportConnection, TransportEvent,
    WebSocketTransport, ABNORMAL_CLOSURE,
};
