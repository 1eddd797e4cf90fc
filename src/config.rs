//! Client configuration.

use std::time::Duration;

use crate::error::{Result, WsError};
use crate::liveness::{LivenessMonitor, DEFAULT_PING_INTERVAL, DEFAULT_PONG_TIMEOUT};
use crate::reconnect::{
    Reconnector, DEFAULT_BACKOFF, DEFAULT_MAX_ATTEMPTS, DEFAULT_MIN_ATTEMPT_SPACING,
};
use crate::transport::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_TIMEOUT};

/// Default number of frames read per poll.
pub const DEFAULT_DRAIN_LIMIT: usize = 5;

/// Tunables for a [`Client`](crate::Client).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Interval between heartbeat pings. Default: 15 seconds
    pub ping_interval: Duration,
    /// Time allowed for a pong before the peer is declared dead. Default: 20 seconds
    pub pong_timeout: Duration,
    /// Failed reconnects tolerated before giving up. Default: 1000
    pub max_reconnect_attempts: u32,
    /// Delay before the first reconnect after a loss. Default: 5 seconds
    pub reconnect_backoff: Duration,
    /// Minimum spacing between reconnect attempts. Default: 5 seconds
    pub min_attempt_spacing: Duration,
    /// Per-read timeout. Default: 100 ms
    pub read_timeout: Duration,
    /// Connect, handshake and write timeout. Default: 5 seconds
    pub connect_timeout: Duration,
    /// Frames read per poll at most. Default: 5
    pub drain_limit: usize,
    /// Text message sent after every successful connect.
    pub identify: Option<String>,
}

impl Config {
    /// Reject settings the client cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.drain_limit == 0 {
            return Err(WsError::InvalidConfig(
                "drain_limit must be at least 1".to_string(),
            ));
        }
        if self.read_timeout.is_zero() {
            return Err(WsError::InvalidConfig(
                "read_timeout must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) fn liveness(&self) -> LivenessMonitor {
        LivenessMonitor::new(self.ping_interval, self.pong_timeout)
    }

    pub(crate) fn reconnector(&self) -> Reconnector {
        let reconnector = Reconnector::new(
            self.max_reconnect_attempts,
            self.reconnect_backoff,
            self.min_attempt_spacing,
        );
        match &self.identify {
            Some(message) => reconnector.with_identify(message.clone()),
            None => reconnector,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ping_interval: DEFAULT_PING_INTERVAL,
            pong_timeout: DEFAULT_PONG_TIMEOUT,
            max_reconnect_attempts: DEFAULT_MAX_ATTEMPTS,
            reconnect_backoff: DEFAULT_BACKOFF,
            min_attempt_spacing: DEFAULT_MIN_ATTEMPT_SPACING,
            read_timeout: DEFAULT_READ_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            drain_limit: DEFAULT_DRAIN_LIMIT,
            identify: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.ping_interval, Duration::from_secs(15));
        assert_eq!(config.pong_timeout, Duration::from_secs(20));
        assert_eq!(config.max_reconnect_attempts, 1000);
        assert_eq!(config.reconnect_backoff, Duration::from_secs(5));
        assert_eq!(config.read_timeout, Duration::from_millis(100));
        assert_eq!(config.drain_limit, 5);
        assert!(config.identify.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_drain_limit() {
        let config = Config {
            drain_limit: 0,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(WsError::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_rejects_zero_read_timeout() {
        let config = Config {
            read_timeout: Duration::ZERO,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(WsError::InvalidConfig(_))));
    }
}
