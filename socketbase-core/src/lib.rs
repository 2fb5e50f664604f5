//! Core frame types, codec and errors for socketbase
//!
//! socketbase is a room-based publish/subscribe protocol spoken over a
//! single WebSocket. This crate holds everything that is independent of
//! the connection itself:
//!
//! - **Types**: outbound [`ClientFrame`]s, inbound [`ServerFrame`]s and
//!   join/leave acknowledgements
//! - **Codec**: JSON encoding/decoding with the unknown-frame fallback
//! - **Error handling**: the workspace-wide [`Error`] enum
//! - **Observability**: `tracing` and OpenTelemetry bootstrap
//!
//! The `socketbase-client` crate builds the connection manager on top.
//!
//! # Example
//!
//! ```rust
//! use socketbase_core::{codec, ClientFrame};
//! use serde_json::json;
//!
//! let frame = ClientFrame::Message { room: "lobby".into(), payload: json!({"text": "hi"}) };
//! let text = codec::encode_frame(&frame).unwrap();
//! assert!(text.contains("\"type\":\"message\""));
//! ```

pub mod codec;
pub mod error;
pub mod observability;
pub mod types;

pub use error::{Error, ErrorKind, Result};
pub use observability::{
    init_logging, init_observability, shutdown_observability, ObservabilityConfig,
};
pub use types::{ClientFrame, Inbound, RoomAck, ServerFrame};
