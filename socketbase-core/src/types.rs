//! Wire types for the socketbase room protocol
//!
//! Every frame exchanged with the server is a JSON object carrying a `type`
//! discriminator. Frames the client writes are modeled by [`ClientFrame`],
//! frames the server writes by [`ServerFrame`]. Both use serde's internally
//! tagged representation so the enum variant *is* the `type` field.
//!
//! # Outbound
//!
//! ```text
//! {"type":"join","room":"lobby"}
//! {"type":"leave","room":"lobby"}
//! {"type":"message","room":"lobby","payload":{...}}
//! {"type":"broadcast","payload":{...}}
//! ```
//!
//! # Inbound
//!
//! ```text
//! {"type":"joined","room":"lobby"}
//! {"type":"left","room":"lobby"}
//! {"type":"message","room":"lobby","payload":{...},"from":"u1","timestamp":1700000000000}
//! {"type":"broadcast","payload":{...},"from":"u1"}
//! {"type":"error","message":"not allowed"}
//! ```
//!
//! Inbound fields are lenient: a missing `room` or `payload` decodes to an
//! empty string or `null` rather than rejecting the whole frame.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Frame sent from the client to the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Ask to become a member of a room
    Join {
        /// Room name
        room: String,
    },
    /// Ask to stop being a member of a room
    Leave {
        /// Room name
        room: String,
    },
    /// Room-scoped message
    Message {
        /// Target room
        room: String,
        /// Arbitrary JSON payload, never `null`
        payload: Value,
    },
    /// Message delivered to every client of the project
    Broadcast {
        /// Arbitrary JSON payload, never `null`
        payload: Value,
    },
}

impl ClientFrame {
    /// Wire name of the frame type
    pub fn kind(&self) -> &'static str {
        match self {
            ClientFrame::Join { .. } => "join",
            ClientFrame::Leave { .. } => "leave",
            ClientFrame::Message { .. } => "message",
            ClientFrame::Broadcast { .. } => "broadcast",
        }
    }
}

/// Frame sent from the server to the client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Acknowledges a join
    Joined {
        #[serde(default)]
        room: String,
    },
    /// Acknowledges a leave
    Left {
        #[serde(default)]
        room: String,
    },
    /// Message published to a room
    Message {
        #[serde(default)]
        room: String,
        #[serde(default)]
        payload: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<String>,
        /// Server timestamp, usually epoch milliseconds
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<f64>,
    },
    /// Project-wide broadcast
    Broadcast {
        #[serde(default)]
        payload: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<String>,
    },
    /// Server-reported failure, not scoped to a room
    ///
    /// A `message` that is not a string is kept as its JSON text.
    Error {
        #[serde(
            default,
            deserialize_with = "lenient_message",
            skip_serializing_if = "Option::is_none"
        )]
        message: Option<String>,
    },
}

fn lenient_message<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(message)) => Some(message),
        Some(other) => Some(other.to_string()),
    })
}

/// A decoded inbound frame
///
/// Frames whose `type` is missing or unknown are kept as raw JSON so they
/// can still be delivered to `message` subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// A frame of a known type
    Frame(ServerFrame),
    /// Valid JSON that is not a known frame
    Unrecognized(Value),
}

/// Successful acknowledgement of a join or leave
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomAck {
    /// Always true for an acknowledgement
    pub success: bool,
    /// The acknowledged room
    pub room: String,
}

impl RoomAck {
    /// Create a successful acknowledgement for `room`
    pub fn success(room: impl Into<String>) -> Self {
        Self {
            success: true,
            room: room.into(),
        }
    }
}
