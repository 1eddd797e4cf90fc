//! Heartbeat (keepalive) monitor.
//!
//! The monitor decides from the session's liveness timestamps whether a
//! heartbeat ping is due or whether the peer has stopped answering:
//!
//! - A ping is *outstanding* when one was sent and no pong arrived since.
//! - Outstanding for longer than `pong_timeout` -> [`Health::Dead`].
//! - Not outstanding and `ping_interval` elapsed since the last ping ->
//!   [`Health::SendHeartbeat`].
//!
//! No new ping is sent while one is outstanding, so the pong deadline is
//! never pushed out by later heartbeats. Since the handshake stamps both
//! timestamps, a silent peer is declared dead on the first check after
//! `connect + ping_interval + pong_timeout`.

use std::time::Duration;

use tokio::time::Instant;

use crate::protocol::OpCode;
use crate::transport::{Connector, LivenessStamps, Session};

/// Default interval between heartbeat pings.
pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(15);

/// Default time to wait for a pong before declaring the peer dead.
pub const DEFAULT_PONG_TIMEOUT: Duration = Duration::from_secs(20);

/// Payload carried by heartbeat pings.
pub const HEARTBEAT_PAYLOAD: &[u8] = b"heartbeat";

/// Outcome of a health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Health {
    /// Nothing to do.
    Healthy,
    /// A heartbeat ping should be sent now.
    SendHeartbeat,
    /// The peer stopped answering, or the heartbeat could not be sent.
    Dead,
}

/// Decides connection health from ping/pong timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LivenessMonitor {
    ping_interval: Duration,
    pong_timeout: Duration,
}

impl LivenessMonitor {
    /// Create a monitor with the given cadence.
    pub fn new(ping_interval: Duration, pong_timeout: Duration) -> Self {
        Self {
            ping_interval,
            pong_timeout,
        }
    }

    /// Interval between heartbeat pings.
    pub fn ping_interval(&self) -> Duration {
        self.ping_interval
    }

    /// Time allowed for a pong to arrive.
    pub fn pong_timeout(&self) -> Duration {
        self.pong_timeout
    }

    /// Pure health decision for `stamps` at `now`.
    pub fn check_health(&self, now: Instant, stamps: &LivenessStamps) -> Health {
        let Some(ping_at) = stamps.last_ping_sent_at else {
            return Health::SendHeartbeat;
        };

        let outstanding = match stamps.last_pong_received_at {
            Some(pong_at) => pong_at < ping_at,
            None => true,
        };
        let since_ping = now.saturating_duration_since(ping_at);

        if outstanding {
            if since_ping > self.pong_timeout {
                return Health::Dead;
            }
            return Health::Healthy;
        }

        if since_ping > self.ping_interval {
            Health::SendHeartbeat
        } else {
            Health::Healthy
        }
    }

    /// Run one check against `session` and act on it.
    ///
    /// Sends the heartbeat when due and records the send time on success.
    /// A failed heartbeat send is reported as `Dead`, as is a session that
    /// is not open. Never returns `SendHeartbeat`.
    pub async fn run<C: Connector>(&self, session: &mut Session<C>, now: Instant) -> Health {
        if !session.is_open() {
            return Health::Dead;
        }

        match self.check_health(now, &session.stamps()) {
            Health::SendHeartbeat => match session.send(OpCode::Ping, HEARTBEAT_PAYLOAD).await {
                Ok(()) => {
                    session.record_ping_sent(now);
                    Health::Healthy
                }
                Err(e) => {
                    tracing::warn!("Heartbeat send failed: {}", e);
                    Health::Dead
                }
            },
            Health::Dead => {
                tracing::warn!("Pong timeout - connection may be dead");
                Health::Dead
            }
            Health::Healthy => Health::Healthy,
        }
    }
}

impl Default for LivenessMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_PING_INTERVAL, DEFAULT_PONG_TIMEOUT)
    }
}
