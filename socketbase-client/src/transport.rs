//! Transport abstraction
//!
//! The client does not care how text frames travel, only that it can open a
//! connection to a URL, write frames to it, and observe what comes back.
//! [`Transport`] captures that contract; [`WebSocketTransport`] implements
//! it over `tokio-tungstenite`.
//!
//! An open connection is split like a WebSocket stream: a [`FrameSink`] for
//! outbound text and an [`EventStream`] of [`TransportEvent`]s. The stream
//! ending without a `Closed` event is treated as an abnormal closure.

use futures::future::{self, BoxFuture};
use futures::stream::BoxStream;
use futures::{FutureExt, Sink, SinkExt, StreamExt};
use socketbase_core::{Error, Result};
use std::pin::Pin;
use tokio_tungstenite::{connect_async, tungstenite, tungstenite::Message};
use url::Url;

/// Close code reported when the transport vanished without a close frame
pub const ABNORMAL_CLOSURE: u16 = 1006;

/// Why a transport closed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseInfo {
    /// WebSocket close code, when the peer sent one
    pub code: Option<u16>,
    /// Close reason, possibly empty
    pub reason: String,
}

impl CloseInfo {
    /// Create a close description
    pub fn new(code: Option<u16>, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    /// Closure without a close handshake
    pub fn abnormal() -> Self {
        Self::new(Some(ABNORMAL_CLOSURE), "connection lost")
    }
}

/// Something observed on an open transport
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// A text frame
    Frame(String),
    /// A transport-level error; the connection may still be usable
    Error(String),
    /// The peer closed the connection
    Closed(CloseInfo),
}

/// Outbound half of a connection
pub type FrameSink = Pin<Box<dyn Sink<String, Error = Error> + Send>>;

/// Inbound half of a connection
pub type EventStream = BoxStream<'static, TransportEvent>;

/// An open transport connection
pub struct TransportConnection {
    /// Writes text frames
    pub sink: FrameSink,
    /// Yields inbound frames and lifecycle events
    pub events: EventStream,
}

/// Opens connections for the client
///
/// The returned future resolves once the connection is open, or fails if it
/// could not be established.
pub trait Transport: Send + Sync + 'static {
    /// Open a connection to `url`
    fn open(&self, url: &Url) -> BoxFuture<'static, Result<TransportConnection>>;
}

/// WebSocket transport backed by `tokio-tungstenite`
///
/// Binary, ping and pong frames are not part of the protocol and are
/// skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketTransport;

impl WebSocketTransport {
    /// Create the transport
    pub fn new() -> Self {
        Self
    }
}

impl Transport for WebSocketTransport {
    fn open(&self, url: &Url) -> BoxFuture<'static, Result<TransportConnection>> {
        let url = url.as_str().to_string();

        async move {
            let (ws_stream, _) = connect_async(url)
                .await
                .map_err(|e| Error::WebSocket(e.to_string()))?;

            let (sender, receiver) = ws_stream.split();

            let sink = sender
                .with(|text: String| {
                    future::ready(Ok::<_, tungstenite::Error>(Message::Text(text)))
                })
                .sink_map_err(|e| Error::WebSocket(e.to_string()));

            let events = receiver.filter_map(|message| {
                future::ready(match message {
                    Ok(Message::Text(text)) => Some(TransportEvent::Frame(text)),
                    Ok(Message::Close(frame)) => Some(TransportEvent::Closed(match frame {
                        Some(frame) => CloseInfo::new(Some(u16::from(frame.code)), frame.reason),
                        None => CloseInfo::new(None, ""),
                    })),
                    Ok(_) => None,
                    Err(e) => Some(TransportEvent::Error(e.to_string())),
                })
            });

            Ok(TransportConnection {
                sink: Box::pin(sink),
                events: events.boxed(),
            })
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abnormal_close_info() {
        let info = CloseInfo::abnormal();
        assert_eq!(info.code, Some(1006));
        assert!(!info.reason.is_empty());
    }

    #[tokio::test]
    async fn test_open_unreachable_host_fails() {
        let url = Url::parse("ws://127.0.0.1:1/ws/proj?jwt=t").unwrap();
        let result = WebSocketTransport::new().open(&url).await;
        assert!(matches!(result, Err(Error::WebSocket(_))));
    }
}
