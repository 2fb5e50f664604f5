//! Codec for socketbase frames
//!
//! Thin layer over `serde_json` that maps failures onto [`Error`] and
//! implements the inbound fallback rule: anything that parses as JSON but is
//! not a known [`ServerFrame`] becomes [`Inbound::Unrecognized`] instead of
//! an error. Only text that is not JSON at all fails to decode.
//!
//! # Examples
//!
//! ```rust
//! use socketbase_core::{codec, ClientFrame, Inbound, ServerFrame};
//!
//! let text = codec::encode(&ClientFrame::Join { room: "lobby".into() }).unwrap();
//! assert_eq!(text, r#"{"type":"join","room":"lobby"}"#);
//!
//! let inbound = codec::decode(r#"{"type":"joined","room":"lobby"}"#).unwrap();
//! assert_eq!(inbound, Inbound::Frame(ServerFrame::Joined { room: "lobby".into() }));
//! ```

use crate::error::{Error, Result};
use crate::types::{ClientFrame, Inbound, ServerFrame};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Encode any serializable frame to a JSON string
pub fn encode<T: Serialize>(frame: &T) -> Result<String> {
    serde_json::to_string(frame).map_err(|e| Error::Serialization(e.to_string()))
}

/// Encode an outbound frame
pub fn encode_frame(frame: &ClientFrame) -> Result<String> {
    encode(frame)
}

/// Decode an inbound text frame
///
/// # Errors
///
/// Returns `Error::Serialization` only when `data` is not valid JSON. A JSON
/// value that is not a recognized frame decodes to
/// [`Inbound::Unrecognized`].
pub fn decode(data: &str) -> Result<Inbound> {
    let value: Value =
        serde_json::from_str(data).map_err(|e| Error::Serialization(e.to_string()))?;

    match ServerFrame::deserialize(&value) {
        Ok(frame) => Ok(Inbound::Frame(frame)),
        Err(_) => Ok(Inbound::Unrecognized(value)),
    }
}
