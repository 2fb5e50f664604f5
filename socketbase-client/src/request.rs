//! Pending join/leave tracking
//!
//! A `join` or `leave` is only complete once the server acknowledges it
//! with a `joined`/`left` frame naming the same room. Between the two, the
//! caller's continuation sits in this table, keyed by request kind and room.
//!
//! # Request Lifecycle
//!
//! 1. **Register**: create a oneshot channel for `(kind, room)`
//! 2. **Send**: the join/leave frame goes out (or is queued)
//! 3. **Wait**: the caller awaits the receiver
//! 4. **Resolve**: a matching ack completes it, an `error` frame fails
//!    every entry, `close()` drops every entry
//!
//! Only one request per `(kind, room)` can be pending. Registering a second
//! one rejects the first with `Error::Superseded` rather than leaving it
//! waiting forever.

use socketbase_core::{Error, RoomAck, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};

/// Which acknowledgement a pending request waits for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// Waits for `joined`
    Join,
    /// Waits for `left`
    Leave,
}

impl RequestKind {
    /// Lowercase name used in logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Join => "join",
            RequestKind::Leave => "leave",
        }
    }
}

/// Pending request waiting for an acknowledgement
struct PendingRequest {
    id: u64,
    tx: oneshot::Sender<Result<RoomAck>>,
}

/// Receiver side of a registered request
pub struct PendingHandle {
    /// Identifies this registration among successive ones for the same room
    pub id: u64,
    /// Resolves with the acknowledgement or the failure
    pub rx: oneshot::Receiver<Result<RoomAck>>,
}

/// Manager for tracking pending join/leave requests
#[derive(Clone, Default)]
pub struct RequestManager {
    pending: Arc<Mutex<HashMap<(RequestKind, String), PendingRequest>>>,
    counter: Arc<AtomicU64>,
}

impl RequestManager {
    /// Create an empty request manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pending request for `room`
    ///
    /// An earlier request of the same kind for the same room is failed with
    /// `Error::Superseded`.
    pub async fn register(&self, kind: RequestKind, room: &str) -> PendingHandle {
        let (tx, rx) = oneshot::channel();
        let id = self.counter.fetch_add(1, Ordering::Relaxed);

        let previous = self
            .pending
            .lock()
            .await
            .insert((kind, room.to_string()), PendingRequest { id, tx });

        if let Some(previous) = previous {
            tracing::warn!(kind = kind.as_str(), room = %room, "Pending request superseded");
            let _ = previous.tx.send(Err(Error::Superseded {
                room: room.to_string(),
            }));
        }

        PendingHandle { id, rx }
    }

    /// Complete the pending request for `room` with a successful ack
    ///
    /// Returns false when nothing was pending.
    pub async fn complete(&self, kind: RequestKind, room: &str) -> bool {
        let entry = self.pending.lock().await.remove(&(kind, room.to_string()));
        match entry {
            Some(pending) => {
                let _ = pending.tx.send(Ok(RoomAck::success(room)));
                true
            }
            None => false,
        }
    }

    /// Drop the request registered as `id`, if it is still the current one
    pub async fn remove(&self, kind: RequestKind, room: &str, id: u64) -> bool {
        let mut pending = self.pending.lock().await;
        let key = (kind, room.to_string());
        match pending.get(&key) {
            Some(entry) if entry.id == id => pending.remove(&key).is_some(),
            _ => false,
        }
    }

    /// Fail every pending request, of both kinds
    ///
    /// Returns how many requests were failed.
    pub async fn fail_all(&self, error: Error) -> usize {
        let mut pending = self.pending.lock().await;
        let count = pending.len();
        for (_, req) in pending.drain() {
            let _ = req.tx.send(Err(error.clone()));
        }
        count
    }

    /// Forget every pending request without resolving it
    ///
    /// Awaiting callers observe a closed channel.
    pub async fn clear(&self) -> usize {
        let mut pending = self.pending.lock().await;
        let count = pending.len();
        pending.clear();
        count
    }

    /// Number of pending requests of both kinds
    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }

    /// Whether a request of `kind` is pending for `room`
    pub async fn is_pending(&self, kind: RequestKind, room: &str) -> bool {
        self.pending
            .lock()
            .await
            .contains_key(&(kind, room.to_string()))
    }
}
