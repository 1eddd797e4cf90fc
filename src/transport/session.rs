//! A single WebSocket session over one stream.
//!
//! The [`Session`] owns the stream exclusively. It performs the handshake,
//! writes masked frames, reads frames under a per-read timeout, answers
//! pings, and keeps the liveness timestamps the heartbeat monitor works
//! from.
//!
//! ```text
//! Disconnected ──connect()──► Handshaking ──101──► Open
//!      ▲                          │                  │
//!      │                     (failure)     (close frame / I/O loss)
//!      │                          ▼                  ▼
//!      └──────── close() ◄── Disconnected          Closed
//! ```
//!
//! The stream exists only while the state is `Handshaking` or `Open`.

use std::io;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::time::Instant;

use super::connector::{Connector, Endpoint};
use super::handshake;
use crate::error::{Result, WsError};
use crate::protocol::{encode_frame, Frame, FrameBuffer, OpCode, ReadOutcome};

/// Default per-read timeout.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Default connect/handshake timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Close status sent on a local close.
const NORMAL_CLOSURE: u16 = 1000;

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No stream; never connected, closed locally, or handshake failed.
    Disconnected,
    /// Stream open, upgrade in progress.
    Handshaking,
    /// Upgrade accepted; frames flow.
    Open,
    /// Lost: peer close, I/O failure, fatal protocol error, or dead heartbeat.
    Closed,
}

/// Heartbeat timestamps. `None` means "never".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LivenessStamps {
    /// When the last heartbeat ping was written.
    pub last_ping_sent_at: Option<Instant>,
    /// When the last pong arrived.
    pub last_pong_received_at: Option<Instant>,
}

/// Application payload of a data frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Text frame, UTF-8 validated.
    Text(String),
    /// Binary frame.
    Binary(Bytes),
}

impl Payload {
    /// Raw payload bytes.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Payload::Text(text) => text.as_bytes(),
            Payload::Binary(bytes) => bytes,
        }
    }
}

/// Result of one receive attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    /// A data frame for the application.
    Message(Payload),
    /// Nothing for the application: idle, a control frame handled
    /// internally, or a dropped malformed frame.
    NoData,
    /// The session is no longer open.
    ConnectionLost,
}

/// One WebSocket connection to one endpoint.
pub struct Session<C: Connector> {
    endpoint: Endpoint,
    connector: C,
    stream: Option<C::Stream>,
    state: ConnectionState,
    buffer: FrameBuffer,
    stamps: LivenessStamps,
    read_timeout: Duration,
    connect_timeout: Duration,
}

impl<C: Connector> Session<C> {
    /// Create a disconnected session.
    pub fn new(endpoint: Endpoint, connector: C) -> Self {
        Self {
            endpoint,
            connector,
            stream: None,
            state: ConnectionState::Disconnected,
            buffer: FrameBuffer::new(),
            stamps: LivenessStamps::default(),
            read_timeout: DEFAULT_READ_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Set the per-read timeout.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set the connect, handshake and write timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Endpoint this session connects to.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether frames can be sent and received.
    #[inline]
    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }

    /// Current heartbeat timestamps.
    pub fn stamps(&self) -> LivenessStamps {
        self.stamps
    }

    /// Whether received bytes are waiting to be decoded.
    pub fn has_buffered_data(&self) -> bool {
        self.buffer.has_pending()
    }

    /// Record that a heartbeat ping went out at `at`.
    pub fn record_ping_sent(&mut self, at: Instant) {
        self.stamps.last_ping_sent_at = Some(at);
    }

    /// Get a reference to the connector.
    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Get a mutable reference to the connector.
    pub fn connector_mut(&mut self) -> &mut C {
        &mut self.connector
    }

    /// Open a stream and perform the opening handshake.
    ///
    /// Any previous stream is dropped first. On success the state is
    /// `Open` and both liveness timestamps are set to now; on failure the
    /// stream is released and the state is `Disconnected`.
    pub async fn connect(&mut self) -> Result<()> {
        self.release(ConnectionState::Disconnected);
        self.buffer.clear();

        let connecting = self.connector.connect(&self.endpoint);
        let mut stream = match tokio::time::timeout(self.connect_timeout, connecting).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                tracing::warn!("Connect to {} failed: {}", self.endpoint, e);
                return Err(WsError::HandshakeFailed(format!("connect: {}", e)));
            }
            Err(_) => {
                tracing::warn!("Connect to {} timed out", self.endpoint);
                return Err(WsError::HandshakeFailed("connect timed out".to_string()));
            }
        };

        self.state = ConnectionState::Handshaking;
        match handshake::perform(&mut stream, &self.endpoint, self.connect_timeout).await {
            Ok(leftover) => {
                self.buffer.extend(&leftover);
                self.stream = Some(stream);
                self.state = ConnectionState::Open;

                let now = Instant::now();
                self.stamps = LivenessStamps {
                    last_ping_sent_at: Some(now),
                    last_pong_received_at: Some(now),
                };

                tracing::info!("WebSocket connected to {}", self.endpoint);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Handshake with {} failed: {}", self.endpoint, e);
                drop(stream);
                self.release(ConnectionState::Disconnected);
                Err(e)
            }
        }
    }

    /// Send one frame.
    ///
    /// Fails with `NotOpen` without touching the socket unless the session
    /// is open. A write failure closes the session and returns `SendFailed`.
    pub async fn send(&mut self, opcode: OpCode, payload: &[u8]) -> Result<()> {
        if !self.is_open() {
            return Err(WsError::NotOpen);
        }

        let bytes = encode_frame(opcode, payload)?;

        let stream = self.stream.as_mut().ok_or(WsError::NotOpen)?;
        let result = match tokio::time::timeout(self.connect_timeout, write_flush(stream, &bytes)).await {
            Ok(result) => result,
            Err(_) => Err(io::Error::new(io::ErrorKind::TimedOut, "write timed out")),
        };

        if let Err(e) = result {
            tracing::warn!("Send error: {}", e);
            self.release(ConnectionState::Closed);
            return Err(WsError::SendFailed(e.to_string()));
        }

        match opcode {
            OpCode::Ping => tracing::debug!("Ping sent"),
            OpCode::Pong => tracing::debug!("Pong sent"),
            _ => {}
        }
        Ok(())
    }

    /// Send a text frame.
    pub async fn send_text(&mut self, text: &str) -> Result<()> {
        self.send(OpCode::Text, text.as_bytes()).await
    }

    /// Receive at most one frame, waiting up to the read timeout per read.
    ///
    /// Control frames are handled here and surface as `NoData`:
    /// - Ping: answered with a Pong carrying the same payload
    /// - Pong: updates `last_pong_received_at`
    /// - Close: the session becomes `Closed` and `ConnectionLost` is returned
    pub async fn receive_one(&mut self) -> Received {
        if !self.is_open() {
            return Received::ConnectionLost;
        }
        let Some(stream) = self.stream.as_mut() else {
            return Received::ConnectionLost;
        };

        let outcome = match self.buffer.read_frame(stream, self.read_timeout).await {
            Ok(outcome) => outcome,
            Err(e) if e.is_recoverable() => {
                tracing::warn!("Dropping frame: {}", e);
                return Received::NoData;
            }
            Err(e) => {
                tracing::warn!("Unrecoverable stream error: {}", e);
                self.release(ConnectionState::Closed);
                return Received::ConnectionLost;
            }
        };

        match outcome {
            ReadOutcome::NoData => Received::NoData,
            ReadOutcome::ConnectionLost => {
                self.release(ConnectionState::Closed);
                Received::ConnectionLost
            }
            ReadOutcome::Frame(frame) => self.handle_frame(frame).await,
        }
    }

    async fn handle_frame(&mut self, frame: Frame) -> Received {
        match frame.opcode {
            OpCode::Close => {
                tracing::info!("Received close frame");
                // Echo the status code, best effort
                let status = &frame.payload()[..frame.payload_len().min(2)];
                let _ = self.send(OpCode::Close, status).await;
                self.release(ConnectionState::Closed);
                Received::ConnectionLost
            }
            OpCode::Ping => {
                tracing::debug!("Received ping, sending pong");
                match self.send(OpCode::Pong, frame.payload()).await {
                    Ok(()) => Received::NoData,
                    Err(_) => Received::ConnectionLost,
                }
            }
            OpCode::Pong => {
                tracing::debug!("Received pong");
                self.stamps.last_pong_received_at = Some(Instant::now());
                Received::NoData
            }
            OpCode::Text => match String::from_utf8(frame.payload.to_vec()) {
                Ok(text) => Received::Message(Payload::Text(text)),
                Err(_) => {
                    tracing::warn!("Dropping text frame with invalid UTF-8");
                    Received::NoData
                }
            },
            OpCode::Binary => Received::Message(Payload::Binary(frame.payload)),
            OpCode::Continuation => Received::NoData,
        }
    }

    /// Mark the session lost without a closing exchange.
    ///
    /// Used when the peer stopped answering heartbeats.
    pub fn abort(&mut self) {
        if self.stream.is_some() {
            tracing::info!("Aborting connection to {}", self.endpoint);
        }
        self.release(ConnectionState::Closed);
    }

    /// Close the session. Best effort, idempotent, always ends `Disconnected`.
    pub async fn close(&mut self) {
        if self.is_open() {
            if let (Some(stream), Ok(bytes)) = (
                self.stream.as_mut(),
                encode_frame(OpCode::Close, &NORMAL_CLOSURE.to_be_bytes()),
            ) {
                let _ = tokio::time::timeout(self.read_timeout, async {
                    write_flush(stream, &bytes).await?;
                    stream.shutdown().await
                })
                .await;
            }
        }
        self.release(ConnectionState::Disconnected);
    }

    /// Drop the stream and enter `state`.
    fn release(&mut self, state: ConnectionState) {
        self.stream = None;
        self.state = state;
        self.stamps = LivenessStamps::default();
    }
}

async fn write_flush<S: AsyncWrite + Unpin>(stream: &mut S, bytes: &[u8]) -> io::Result<()> {
    stream.write_all(bytes).await?;
    stream.flush().await
}
