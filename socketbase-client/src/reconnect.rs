//! Reconnection strategies for automatic reconnection
//!
//! When the transport closes unexpectedly and auto-reconnect is enabled, the
//! client asks its strategy how long to wait before the next attempt, or
//! whether to give up.
//!
//! # Built-in Strategy
//!
//! - **LinearBackoff**: waits `base_delay * attempt` (1st retry after one
//!   base delay, 2nd after two, ...), with an attempt budget and no cap or
//!   jitter. This is what `ClientConfig::reconnect_delay` and
//!   `ClientConfig::max_reconnect_attempts` configure.
//!
//! Implement [`ReconnectionStrategy`] for anything else and pass it to
//! `ClientBuilder::with_reconnect`.
//!
//! # Examples
//!
//! ```rust
//! use socketbase_client::{LinearBackoff, ReconnectionStrategy};
//! use std::time::Duration;
//!
//! let mut strategy = LinearBackoff::new(Duration::from_millis(500)).with_max_attempts(3);
//! assert_eq!(strategy.next_delay(0), Some(Duration::from_millis(500)));
//! assert_eq!(strategy.next_delay(1), Some(Duration::from_millis(1000)));
//! assert_eq!(strategy.next_delay(3), None);
//! ```

use std::time::Duration;

/// Trait for reconnection strategies
///
/// `reset()` is called after every successful open so that the next
/// disconnect starts a fresh series.
pub trait ReconnectionStrategy: Send + Sync {
    /// Returns the delay before the next reconnection attempt
    ///
    /// `attempt` is the number of attempts already made since the last
    /// successful open (0 for the first retry). `None` means give up.
    fn next_delay(&mut self, attempt: u32) -> Option<Duration>;

    /// Reset the strategy state after a successful connection
    fn reset(&mut self);
}

/// Linear backoff: the n-th retry waits `base_delay * n`
#[derive(Debug, Clone)]
pub struct LinearBackoff {
    base_delay: Duration,
    max_attempts: Option<u32>,
}

impl LinearBackoff {
    /// Create an unlimited linear backoff
    pub fn new(base_delay: Duration) -> Self {
        Self {
            base_delay,
            max_attempts: None,
        }
    }

    /// Set the maximum number of attempts before giving up
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Delay unit
    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Attempt budget, `None` when unlimited
    pub fn max_attempts(&self) -> Option<u32> {
        self.max_attempts
    }
}

impl Default for LinearBackoff {
    fn default() -> Self {
        Self::new(Duration::from_millis(crate::config::DEFAULT_RECONNECT_DELAY_MS))
            .with_max_attempts(crate::config::DEFAULT_MAX_RECONNECT_ATTEMPTS)
    }
}

impl ReconnectionStrategy for LinearBackoff {
    fn next_delay(&mut self, attempt: u32) -> Option<Duration> {
        if let Some(max) = self.max_attempts {
            if attempt >= max {
                return None;
            }
        }

        Some(self.base_delay.saturating_mul(attempt.saturating_add(1)))
    }

    fn reset(&mut self) {
        // Delays depend only on the attempt number
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_backoff_delays() {
        let mut strategy = LinearBackoff::new(Duration::from_millis(1000)).with_max_attempts(5);

        assert_eq!(strategy.next_delay(0), Some(Duration::from_millis(1000)));
        assert_eq!(strategy.next_delay(1), Some(Duration::from_millis(2000)));
        assert_eq!(strategy.next_delay(2), Some(Duration::from_millis(3000)));
        assert_eq!(strategy.next_delay(4), Some(Duration::from_millis(5000)));
    }

    #[test]
    fn test_linear_backoff_max_attempts() {
        let mut strategy = LinearBackoff::new(Duration::from_millis(10)).with_max_attempts(2);

        assert!(strategy.next_delay(0).is_some());
        assert!(strategy.next_delay(1).is_some());
        assert!(strategy.next_delay(2).is_none());
    }

    #[test]
    fn test_zero_attempts_never_reconnects() {
        let mut strategy = LinearBackoff::new(Duration::from_millis(10)).with_max_attempts(0);
        assert!(strategy.next_delay(0).is_none());
    }

    #[test]
    fn test_unlimited_has_no_cap() {
        let mut strategy = LinearBackoff::new(Duration::from_secs(1));
        assert_eq!(strategy.next_delay(99), Some(Duration::from_secs(100)));
    }

    #[test]
    fn test_default_matches_config_defaults() {
        let strategy = LinearBackoff::default();
        assert_eq!(strategy.base_delay(), Duration::from_millis(1000));
        assert_eq!(strategy.max_attempts(), Some(5));
    }
}
