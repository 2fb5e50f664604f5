//! Socketbase - room pub/sub over WebSocket
//!
//! This is the convenience crate that re-exports the socketbase sub-crates.
//! Use it if you want a single dependency for the client and its protocol
//! types.
//!
//! # Architecture
//!
//! - **socketbase-core**: wire frames, codec, error handling, observability
//! - **socketbase-client**: the room client with queueing and reconnection
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use socketbase::{ClientBuilder, Event, EventKind};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let client = ClientBuilder::new("project-hash", "jwt")
//!         .url("wss://socket.example.com")
//!         .connect()
//!         .await?;
//!
//!     client
//!         .on(EventKind::Message, |event| async move {
//!             if let Event::Message(message) = event {
//!                 println!("{}: {}", message.room, message.payload);
//!             }
//!         })
//!         .await;
//!
//!     client.join("lobby").await?;
//!     client.send("lobby", json!({"text": "hello"})).await?;
//!
//!     client.close().await;
//!     Ok(())
//! }
//! ```

pub use socketbase_client as client;
pub use socketbase_core as core;

pub use socketbase_client::{
    create_client, ClientBuilder, ClientConfig, ConnectionState, Event, EventKind,
    SocketBaseClient,
};
pub use socketbase_core::{Error, Result};
