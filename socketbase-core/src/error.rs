//! Error types for socketbase
//!
//! Every fallible operation in the workspace returns [`Result`], whose error
//! side is the single [`Error`] enum defined here. The variants follow the
//! error taxonomy of the client:
//!
//! - **Configuration errors**: missing `hash`/`jwt`, unusable base URL
//! - **Validation errors**: empty room name, null payload
//! - **Transport errors**: WebSocket failures, connection closed
//! - **Protocol errors**: serialization failures, server-reported errors
//! - **Operational errors**: not connected, timeout, superseded request
//!
//! Errors that are reported to event subscribers instead of being returned
//! are tagged with an [`ErrorKind`], whose wire names (`connection_error`,
//! `parse_error`, `server_error`) are what applications match on.
//!
//! # Examples
//!
//! ```rust
//! use socketbase_core::Error;
//!
//! let error = Error::Validation("Room name required".into());
//! assert_eq!(error.to_string(), "Room name required");
//! assert!(error.is_validation());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for socketbase operations
pub type Result<T> = std::result::Result<T, Error>;

/// Application-level error type for socketbase operations
///
/// The enum is `Clone` so that a single server-reported failure can be
/// delivered to every pending request it rejects.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Invalid or incomplete client configuration
    ///
    /// Raised at construction time, for example when `hash` or `jwt` is
    /// missing. Fatal to that construction attempt.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid argument passed to an operation
    ///
    /// Empty room names and null payloads are rejected before anything is
    /// written to the transport. The message is shown as-is.
    #[error("{0}")]
    Validation(String),

    /// The client is not connected and automatic reconnection is disabled
    #[error("Not connected")]
    NotConnected,

    /// WebSocket transport layer error
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Serialization or deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Error frame reported by the server
    ///
    /// Fails every pending join and leave request at once.
    #[error("Server error: {0}")]
    Server(String),

    /// The connection was closed while the operation was in flight
    #[error("Connection closed")]
    ConnectionClosed,

    /// The server did not acknowledge a join/leave within the configured timeout
    #[error("Request timeout")]
    Timeout,

    /// A newer join/leave for the same room replaced this pending request
    #[error("Request for room '{room}' superseded by a newer one")]
    Superseded {
        /// The room both requests targeted
        room: String,
    },

    /// Unexpected internal failure
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns true for argument validation failures
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    /// Returns true for configuration failures
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Category of an error delivered through the `error` event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The transport failed to open or reported an error
    ConnectionError,
    /// An inbound frame was not valid JSON
    ParseError,
    /// The server sent an `error` frame
    ServerError,
}

impl ErrorKind {
    /// Wire name of the kind, as used in `{type: ...}` of error events
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ConnectionError => "connection_error",
            ErrorKind::ParseError => "parse_error",
            ErrorKind::ServerError => "server_error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
