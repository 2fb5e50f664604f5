//! Connection state management
//!
//! Tracks where the single transport is in its lifecycle and owns the
//! reconnect-attempt counter together with the [`ReconnectionStrategy`]
//! that turns it into delays.
//!
//! # Connection States
//!
//! - **Idle**: created, never connected
//! - **Connecting**: a transport is being opened
//! - **Open**: transport open, frames are written directly
//! - **Closed**: transport gone, either unexpectedly or through `close()`
//!
//! # State Transitions
//!
//! ```text
//! Idle → Connecting → Open → Closed
//!            ↑                  │
//!            └── reconnect ─────┘
//! ```
//!
//! `Connecting` doubles as the idempotency guard for `connect()`: only the
//! caller that moves the state out of `Idle`/`Closed` opens a transport.

use crate::reconnect::ReconnectionStrategy;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Never connected
    Idle,
    /// Opening a transport
    Connecting,
    /// Transport open
    Open,
    /// Transport closed
    Closed,
}

impl ConnectionState {
    /// True only for `Open`
    pub fn is_connected(self) -> bool {
        self == ConnectionState::Open
    }

    /// True only for `Connecting`
    pub fn is_connecting(self) -> bool {
        self == ConnectionState::Connecting
    }

    /// Numeric code reported by the connection state gauge
    pub fn as_metric(self) -> i64 {
        match self {
            ConnectionState::Idle => 0,
            ConnectionState::Connecting => 1,
            ConnectionState::Open => 2,
            ConnectionState::Closed => 3,
        }
    }
}

struct ReconnectState {
    strategy: Box<dyn ReconnectionStrategy>,
    attempts: u32,
}

/// Manages connection state and reconnection bookkeeping
pub struct ConnectionManager {
    state: RwLock<ConnectionState>,
    reconnect: Mutex<ReconnectState>,
}

impl ConnectionManager {
    /// Create a manager in the `Idle` state
    pub fn new(strategy: Box<dyn ReconnectionStrategy>) -> Self {
        Self {
            state: RwLock::new(ConnectionState::Idle),
            reconnect: Mutex::new(ReconnectState {
                strategy,
                attempts: 0,
            }),
        }
    }

    /// Get the current connection state
    pub async fn state(&self) -> ConnectionState {
        *self.state.read().await
    }

    /// True when the state is exactly `Open`
    pub async fn is_open(&self) -> bool {
        self.state().await.is_connected()
    }

    /// Move to `Connecting` unless a connection is already open or opening
    ///
    /// Returns false when the caller must not open another transport.
    pub async fn begin_connecting(&self) -> bool {
        let mut state = self.state.write().await;
        match *state {
            ConnectionState::Connecting | ConnectionState::Open => false,
            ConnectionState::Idle | ConnectionState::Closed => {
                *state = ConnectionState::Connecting;
                true
            }
        }
    }

    /// Transition to `Open` and reset the reconnect counter
    ///
    /// Returns the number of reconnect attempts that preceded this open.
    pub async fn opened(&self) -> u32 {
        *self.state.write().await = ConnectionState::Open;

        let mut reconnect = self.reconnect.lock().await;
        let previous = reconnect.attempts;
        reconnect.attempts = 0;
        reconnect.strategy.reset();
        previous
    }

    /// Transition to `Closed`
    pub async fn closed(&self) {
        *self.state.write().await = ConnectionState::Closed;
    }

    /// Consume one reconnect attempt
    ///
    /// Returns the 1-based attempt number and the delay to wait before it,
    /// or `None` when the strategy gives up.
    pub async fn next_reconnect_delay(&self) -> Option<(u32, Duration)> {
        let mut reconnect = self.reconnect.lock().await;
        let attempt = reconnect.attempts;
        let delay = reconnect.strategy.next_delay(attempt)?;
        reconnect.attempts = attempt + 1;
        Some((reconnect.attempts, delay))
    }

    /// Reconnect attempts made since the last successful open
    pub async fn attempts(&self) -> u32 {
        self.reconnect.lock().await.attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconnect::LinearBackoff;

    fn manager(max_attempts: u32) -> ConnectionManager {
        let strategy =
            LinearBackoff::new(Duration::from_millis(100)).with_max_attempts(max_attempts);
        ConnectionManager::new(Box::new(strategy))
    }

    #[tokio::test]
    async fn test_connection_state_transitions() {
        let manager = manager(3);
        assert_eq!(manager.state().await, ConnectionState::Idle);

        assert!(manager.begin_connecting().await);
        assert_eq!(manager.state().await, ConnectionState::Connecting);
        assert!(!manager.is_open().await);

        manager.opened().await;
        assert!(manager.is_open().await);

        manager.closed().await;
        assert_eq!(manager.state().await, ConnectionState::Closed);
    }

    #[tokio::test]
    async fn test_begin_connecting_is_exclusive() {
        let manager = manager(3);
        assert!(manager.begin_connecting().await);
        assert!(!manager.begin_connecting().await);

        manager.opened().await;
        assert!(!manager.begin_connecting().await);

        manager.closed().await;
        assert!(manager.begin_connecting().await);
    }

    #[tokio::test]
    async fn test_reconnection_attempts() {
        let manager = manager(3);

        assert_eq!(
            manager.next_reconnect_delay().await,
            Some((1, Duration::from_millis(100)))
        );
        assert_eq!(
            manager.next_reconnect_delay().await,
            Some((2, Duration::from_millis(200)))
        );
        assert_eq!(
            manager.next_reconnect_delay().await,
            Some((3, Duration::from_millis(300)))
        );
        assert_eq!(manager.next_reconnect_delay().await, None);
        assert_eq!(manager.attempts().await, 3);
    }

    #[tokio::test]
    async fn test_attempts_reset_on_open() {
        let manager = manager(3);
        manager.next_reconnect_delay().await;
        manager.next_reconnect_delay().await;

        assert_eq!(manager.opened().await, 2);
        assert_eq!(manager.attempts().await, 0);
        assert_eq!(
            manager.next_reconnect_delay().await,
            Some((1, Duration::from_millis(100)))
        );
    }

    #[test]
    fn test_state_views() {
        assert!(ConnectionState::Open.is_connected());
        assert!(!ConnectionState::Connecting.is_connected());
        assert!(ConnectionState::Connecting.is_connecting());
        assert_eq!(ConnectionState::Closed.as_metric(), 3);
    }
}
