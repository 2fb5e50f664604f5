//! Outbound frame queue
//!
//! Frames written while the transport is not open are encoded and parked
//! here when auto-reconnect is on. The next successful open drains the
//! queue in FIFO order before anything else is written.

use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;

/// FIFO of encoded frames waiting for an open transport
#[derive(Clone, Default)]
pub struct OutboundQueue {
    frames: Arc<Mutex<VecDeque<String>>>,
}

impl OutboundQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a frame, returning the new queue length
    pub async fn push(&self, frame: String) -> usize {
        let mut frames = self.frames.lock().await;
        frames.push_back(frame);
        frames.len()
    }

    /// Take every queued frame, oldest first
    pub async fn drain(&self) -> Vec<String> {
        self.frames.lock().await.drain(..).collect()
    }

    /// Put frames back at the front, keeping their order
    ///
    /// Used when a drain is interrupted by a write failure.
    pub async fn restore(&self, unsent: Vec<String>) {
        let mut frames = self.frames.lock().await;
        for frame in unsent.into_iter().rev() {
            frames.push_front(frame);
        }
    }

    /// Number of queued frames
    pub async fn len(&self) -> usize {
        self.frames.lock().await.len()
    }

    /// True when nothing is queued
    pub async fn is_empty(&self) -> bool {
        self.frames.lock().await.is_empty()
    }

    /// Discard every queued frame
    pub async fn clear(&self) {
        self.frames.lock().await.clear();
    }
}
