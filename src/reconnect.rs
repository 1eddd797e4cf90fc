//! Reconnection controller.
//!
//! After a connection loss the controller re-handshakes on a fixed back-off
//! until it succeeds or the attempt budget is spent:
//!
//! ```text
//! Connected ──connection_lost()──► Reconnecting ──success──► Connected
//!                                      │
//!                         (failures > max_attempts)
//!                                      ▼
//!                                   GivenUp (terminal)
//! ```
//!
//! Attempts are spaced by `max(backoff, min_attempt_spacing)`. Once given
//! up, every call reports [`WsError::GivenUp`] and no further connect is
//! made; deciding what happens next is left to the caller.

use std::time::Duration;

use tokio::time::Instant;

use crate::error::{Result, WsError};
use crate::transport::{Connector, Session};

/// Default number of failed attempts tolerated before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 1000;

/// Default delay before the first attempt after a loss.
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(5);

/// Default minimum spacing between two attempts.
pub const DEFAULT_MIN_ATTEMPT_SPACING: Duration = Duration::from_secs(5);

/// Controller phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectPhase {
    /// Session is up, or was never lost.
    Connected,
    /// Waiting for or making re-handshake attempts.
    Reconnecting,
    /// Attempt budget spent; no further attempts are made.
    GivenUp,
}

/// Result of a [`Reconnector::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectStatus {
    /// Nothing attempted: connected, or the next attempt is not due yet.
    Waiting,
    /// The session is open again.
    Reconnected,
    /// Attempt number `attempt` failed; another one will follow.
    Failed { attempt: u32 },
}

/// Drives re-handshakes of a [`Session`] after connection loss.
#[derive(Debug, Clone)]
pub struct Reconnector {
    max_attempts: u32,
    backoff: Duration,
    min_attempt_spacing: Duration,
    identify: Option<String>,
    phase: ReconnectPhase,
    failures: u32,
    next_attempt_at: Option<Instant>,
}

impl Reconnector {
    /// Create a controller in the `Connected` phase.
    pub fn new(max_attempts: u32, backoff: Duration, min_attempt_spacing: Duration) -> Self {
        Self {
            max_attempts,
            backoff,
            min_attempt_spacing,
            identify: None,
            phase: ReconnectPhase::Connected,
            failures: 0,
            next_attempt_at: None,
        }
    }

    /// Text message sent after every successful connect.
    pub fn with_identify(mut self, message: impl Into<String>) -> Self {
        self.identify = Some(message.into());
        self
    }

    /// Current phase.
    pub fn phase(&self) -> ReconnectPhase {
        self.phase
    }

    /// Consecutive failed attempts since the last success.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// When the next attempt becomes eligible, while reconnecting.
    pub fn next_attempt_at(&self) -> Option<Instant> {
        match self.phase {
            ReconnectPhase::Reconnecting => self.next_attempt_at,
            _ => None,
        }
    }

    /// Whether the attempt budget is spent.
    pub fn is_given_up(&self) -> bool {
        self.phase == ReconnectPhase::GivenUp
    }

    fn given_up(&self) -> WsError {
        WsError::GivenUp {
            attempts: self.failures,
        }
    }

    fn retry_delay(&self) -> Duration {
        self.backoff.max(self.min_attempt_spacing)
    }

    /// Initial connect.
    ///
    /// On failure the controller starts reconnecting, with the first
    /// attempt due after the back-off, and the handshake error is returned.
    pub async fn establish<C: Connector>(
        &mut self,
        session: &mut Session<C>,
        now: Instant,
    ) -> Result<()> {
        if self.is_given_up() {
            return Err(self.given_up());
        }

        match session.connect().await {
            Ok(()) => {
                self.on_connected(session).await;
                Ok(())
            }
            Err(e) => {
                self.phase = ReconnectPhase::Reconnecting;
                self.next_attempt_at = Some(now + self.backoff);
                Err(e)
            }
        }
    }

    /// Record a connection loss.
    ///
    /// Closes the session if it is still up and schedules the first
    /// attempt after the back-off. Has no effect while already
    /// reconnecting or after giving up.
    pub fn connection_lost<C: Connector>(&mut self, session: &mut Session<C>, now: Instant) {
        if self.phase != ReconnectPhase::Connected {
            return;
        }
        session.abort();
        self.phase = ReconnectPhase::Reconnecting;
        self.next_attempt_at = Some(now + self.backoff);
        tracing::info!(
            "Connection to {} lost, reconnecting in {:?}",
            session.endpoint(),
            self.backoff
        );
    }

    /// Make one attempt if it is due.
    pub async fn tick<C: Connector>(
        &mut self,
        session: &mut Session<C>,
        now: Instant,
    ) -> Result<ReconnectStatus> {
        match self.phase {
            ReconnectPhase::GivenUp => Err(self.given_up()),
            ReconnectPhase::Connected => Ok(ReconnectStatus::Waiting),
            ReconnectPhase::Reconnecting => {
                if let Some(due) = self.next_attempt_at {
                    if now < due {
                        return Ok(ReconnectStatus::Waiting);
                    }
                }
                self.attempt(session, now).await
            }
        }
    }

    /// Re-handshake immediately, ignoring the attempt spacing.
    ///
    /// Drops the current stream first. The attempt counts against the
    /// budget like any other.
    pub async fn reconnect_now<C: Connector>(
        &mut self,
        session: &mut Session<C>,
    ) -> Result<ReconnectStatus> {
        if self.is_given_up() {
            return Err(self.given_up());
        }
        session.abort();
        self.phase = ReconnectPhase::Reconnecting;
        self.attempt(session, Instant::now()).await
    }

    /// Sleep until the next attempt is due, then [`tick`](Self::tick).
    pub async fn wait_and_reconnect<C: Connector>(
        &mut self,
        session: &mut Session<C>,
    ) -> Result<ReconnectStatus> {
        if let Some(due) = self.next_attempt_at() {
            tokio::time::sleep_until(due).await;
        }
        self.tick(session, Instant::now()).await
    }

    async fn attempt<C: Connector>(
        &mut self,
        session: &mut Session<C>,
        now: Instant,
    ) -> Result<ReconnectStatus> {
        tracing::info!(
            "Reconnecting to {} (attempt {})",
            session.endpoint(),
            self.failures + 1
        );

        match session.connect().await {
            Ok(()) => {
                self.on_connected(session).await;
                Ok(ReconnectStatus::Reconnected)
            }
            Err(e) => {
                self.failures += 1;
                if self.failures > self.max_attempts {
                    self.phase = ReconnectPhase::GivenUp;
                    self.next_attempt_at = None;
                    tracing::error!(
                        "Giving up on {} after {} failed attempts",
                        session.endpoint(),
                        self.failures
                    );
                    return Err(self.given_up());
                }

                let delay = self.retry_delay();
                self.next_attempt_at = Some(now + delay);
                tracing::warn!("Reconnect failed: {}, retrying in {:?}", e, delay);
                Ok(ReconnectStatus::Failed {
                    attempt: self.failures,
                })
            }
        }
    }

    async fn on_connected<C: Connector>(&mut self, session: &mut Session<C>) {
        self.phase = ReconnectPhase::Connected;
        self.failures = 0;
        self.next_attempt_at = None;

        if let Some(message) = &self.identify {
            // A failed send closes the session; the next poll reports the loss
            if let Err(e) = session.send_text(message).await {
                tracing::warn!("Identify message not sent: {}", e);
            }
        }
    }
}

impl Default for Reconnector {
    fn default() -> Self {
        Self::new(
            DEFAULT_MAX_ATTEMPTS,
            DEFAULT_BACKOFF,
            DEFAULT_MIN_ATTEMPT_SPACING,
        )
    }
}
