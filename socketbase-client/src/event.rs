//! Events delivered to subscribers
//!
//! Every subscriber registers for one [`EventKind`] and receives the
//! matching [`Event`] values. The kinds and their data:
//!
//! | kind | event |
//! |---|---|
//! | `open` | [`Event::Open`] |
//! | `close` | [`Event::Close`] with the close code/reason |
//! | `error` | [`Event::Error`] tagged `connection_error`, `parse_error` or `server_error` |
//! | `message` | [`Event::Message`], or [`Event::Unrecognized`] for frames of unknown type |
//! | `joined` | [`Event::Joined`] |
//! | `left` | [`Event::Left`] |
//! | `broadcast` | [`Event::Broadcast`] |

use crate::transport::CloseInfo;
use serde_json::Value;
use socketbase_core::{Error, ErrorKind};
use std::fmt;
use std::str::FromStr;

/// Name under which subscribers register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Open,
    Close,
    Error,
    Message,
    Joined,
    Left,
    Broadcast,
}

impl EventKind {
    /// All event kinds
    pub const ALL: [EventKind; 7] = [
        EventKind::Open,
        EventKind::Close,
        EventKind::Error,
        EventKind::Message,
        EventKind::Joined,
        EventKind::Left,
        EventKind::Broadcast,
    ];

    /// Event name
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Open => "open",
            EventKind::Close => "close",
            EventKind::Error => "error",
            EventKind::Message => "message",
            EventKind::Joined => "joined",
            EventKind::Left => "left",
            EventKind::Broadcast => "broadcast",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::Validation(format!("Unknown event '{}'", s)))
    }
}

/// Payload of an `error` event
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorEvent {
    /// Error category
    pub kind: ErrorKind,
    /// Human-readable detail
    pub message: String,
    /// The offending inbound text, for parse errors
    pub raw: Option<String>,
}

/// A message published to a room
#[derive(Debug, Clone, PartialEq)]
pub struct RoomMessage {
    pub room: String,
    pub payload: Value,
    pub from: Option<String>,
    pub timestamp: Option<f64>,
}

/// A project-wide broadcast
#[derive(Debug, Clone, PartialEq)]
pub struct BroadcastMessage {
    pub payload: Value,
    pub from: Option<String>,
}

/// Event delivered to subscribers
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// The transport opened
    Open,
    /// The transport closed
    Close(CloseInfo),
    /// A transport, parse or server error
    Error(ErrorEvent),
    /// A room message
    Message(RoomMessage),
    /// An inbound frame of unknown type, delivered as a `message`
    Unrecognized(Value),
    /// A join was acknowledged
    Joined { room: String },
    /// A leave was acknowledged
    Left { room: String },
    /// A broadcast arrived
    Broadcast(BroadcastMessage),
}

impl Event {
    /// The kind subscribers register for to receive this event
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Open => EventKind::Open,
            Event::Close(_) => EventKind::Close,
            Event::Error(_) => EventKind::Error,
            Event::Message(_) | Event::Unrecognized(_) => EventKind::Message,
            Event::Joined { .. } => EventKind::Joined,
            Event::Left { .. } => EventKind::Left,
            Event::Broadcast(_) => EventKind::Broadcast,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_names_round_trip() {
        for kind in EventKind::ALL {
            assert_eq!(kind.as_str().parse::<EventKind>().unwrap(), kind);
        }
        assert!("presence".parse::<EventKind>().is_err());
    }

    #[test]
    fn test_unrecognized_is_a_message() {
        let event = Event::Unrecognized(json!({"type": "presence"}));
        assert_eq!(event.kind(), EventKind::Message);
        assert_eq!(event.kind().to_string(), "message");
    }

    #[test]
    fn test_event_kinds() {
        assert_eq!(Event::Open.kind(), EventKind::Open);
        assert_eq!(Event::Close(CloseInfo::abnormal()).kind(), EventKind::Close);
        assert_eq!(
            Event::Joined {
                room: "r".to_string()
            }
            .kind(),
            EventKind::Joined
        );
    }
}
