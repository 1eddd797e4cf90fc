//! Client builder and poll loop.
//!
//! The [`ClientBuilder`] provides a fluent API for configuring timeouts,
//! heartbeat cadence and reconnection. The [`Client`] is driven by the
//! caller at a fixed cadence:
//! 1. [`Client::poll`] drains a few frames and runs the heartbeat check
//! 2. On [`Event::ConnectionLost`], [`Client::recover`] re-handshakes on
//!    the configured back-off
//! 3. A [`WsError::GivenUp`] from either is terminal
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use wslink::{Client, Endpoint, Event};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> wslink::Result<()> {
//!     let mut client = Client::builder()
//!         .identify(r#"{"client":"Robot"}"#)
//!         .build_tcp(Endpoint::with_default_path("192.168.86.69", 8080))?;
//!     let _ = client.connect().await;
//!
//!     loop {
//!         match client.poll::<serde_json::Value>().await? {
//!             Event::Message(command) => println!("{}", command),
//!             Event::NoData => {}
//!             Event::ConnectionLost => {
//!                 client.recover().await?;
//!             }
//!         }
//!         tokio::time::sleep(Duration::from_millis(100)).await;
//!     }
//! }
//! ```

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::time::Instant;

use crate::codec::{JsonCodec, MsgPackCodec};
use crate::config::Config;
use crate::error::{Result, WsError};
use crate::liveness::{Health, LivenessMonitor};
use crate::protocol::OpCode;
use crate::reconnect::{ReconnectPhase, ReconnectStatus, Reconnector};
use crate::transport::{
    ConnectionState, Connector, Endpoint, Payload, Received, Session, TcpConnector,
};

/// What a [`Client::poll`] produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Event<T> {
    /// A decoded application message.
    Message(T),
    /// Nothing for the application this cycle.
    NoData,
    /// The connection is gone; call [`Client::recover`].
    ConnectionLost,
}

/// Builder for configuring and creating a client.
#[derive(Debug, Clone, Default)]
pub struct ClientBuilder {
    config: Config,
}

impl ClientBuilder {
    /// Create a builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Set the heartbeat interval.
    ///
    /// Default: 15 seconds
    pub fn ping_interval(mut self, interval: Duration) -> Self {
        self.config.ping_interval = interval;
        self
    }

    /// Set how long to wait for a pong before declaring the peer dead.
    ///
    /// Default: 20 seconds
    pub fn pong_timeout(mut self, timeout: Duration) -> Self {
        self.config.pong_timeout = timeout;
        self
    }

    /// Set the number of failed reconnects tolerated before giving up.
    ///
    /// Default: 1000
    pub fn max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.config.max_reconnect_attempts = attempts;
        self
    }

    /// Set the delay before the first reconnect after a loss.
    ///
    /// Default: 5 seconds
    pub fn reconnect_backoff(mut self, backoff: Duration) -> Self {
        self.config.reconnect_backoff = backoff;
        self
    }

    /// Set the minimum spacing between reconnect attempts.
    ///
    /// Default: 5 seconds
    pub fn min_attempt_spacing(mut self, spacing: Duration) -> Self {
        self.config.min_attempt_spacing = spacing;
        self
    }

    /// Set the per-read timeout.
    ///
    /// Default: 100 ms
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = timeout;
        self
    }

    /// Set the connect, handshake and write timeout.
    ///
    /// Default: 5 seconds
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set how many frames a single poll reads at most.
    ///
    /// Default: 5
    pub fn drain_limit(mut self, limit: usize) -> Self {
        self.config.drain_limit = limit;
        self
    }

    /// Send `message` as a text frame after every successful connect.
    pub fn identify(mut self, message: impl Into<String>) -> Self {
        self.config.identify = Some(message.into());
        self
    }

    /// Build a client that opens streams through `connector`.
    ///
    /// No connection is made until [`Client::connect`].
    pub fn build<C: Connector>(self, endpoint: Endpoint, connector: C) -> Result<Client<C>> {
        self.config.validate()?;

        let session = Session::new(endpoint, connector)
            .with_read_timeout(self.config.read_timeout)
            .with_connect_timeout(self.config.connect_timeout);

        Ok(Client {
            liveness: self.config.liveness(),
            reconnector: self.config.reconnector(),
            drain_limit: self.config.drain_limit,
            session,
        })
    }

    /// Build a client over plain TCP.
    pub fn build_tcp(self, endpoint: Endpoint) -> Result<Client<TcpConnector>> {
        self.build(endpoint, TcpConnector)
    }
}

/// A WebSocket client with heartbeat and reconnection.
pub struct Client<C: Connector = TcpConnector> {
    session: Session<C>,
    liveness: LivenessMonitor,
    reconnector: Reconnector,
    drain_limit: usize,
}

impl Client<TcpConnector> {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }
}

impl<C: Connector> Client<C> {
    /// Open the connection and send the identify message, if configured.
    ///
    /// On failure the client is already scheduled to retry through
    /// [`recover`](Self::recover).
    pub async fn connect(&mut self) -> Result<()> {
        self.reconnector
            .establish(&mut self.session, Instant::now())
            .await
    }

    /// Run one receive cycle.
    ///
    /// Reads up to `drain_limit` frames and stops at the first payload that
    /// decodes into `T`: text frames as JSON, binary frames as MessagePack.
    /// Payloads that do not decode are dropped. The heartbeat check runs
    /// once per call; a dead peer closes the connection.
    ///
    /// Connection trouble is reported as [`Event::ConnectionLost`]. The only
    /// error is [`WsError::GivenUp`] once reconnection has been abandoned.
    pub async fn poll<T: DeserializeOwned>(&mut self) -> Result<Event<T>> {
        if self.reconnector.is_given_up() {
            return Err(self.given_up());
        }
        if !self.session.is_open() {
            return Ok(Event::ConnectionLost);
        }

        let mut message = None;
        for _ in 0..self.drain_limit {
            match self.session.receive_one().await {
                Received::ConnectionLost => return Ok(Event::ConnectionLost),
                Received::Message(payload) => match decode::<T>(&payload) {
                    Ok(value) => {
                        message = Some(value);
                        break;
                    }
                    Err(e) => tracing::debug!("Dropping malformed payload: {}", e),
                },
                Received::NoData => {
                    if !self.session.has_buffered_data() {
                        break;
                    }
                }
            }
        }

        if self.liveness.run(&mut self.session, Instant::now()).await == Health::Dead {
            self.session.abort();
            if message.is_none() {
                return Ok(Event::ConnectionLost);
            }
        }

        Ok(match message {
            Some(value) => Event::Message(value),
            None => Event::NoData,
        })
    }

    /// Drive reconnection after a loss.
    ///
    /// Returns `Waiting` while connected or while the next attempt is not
    /// due yet, so it is safe to call on every cycle.
    pub async fn recover(&mut self) -> Result<ReconnectStatus> {
        let now = Instant::now();
        if self.session.is_open() && self.reconnector.phase() == ReconnectPhase::Connected {
            return Ok(ReconnectStatus::Waiting);
        }
        self.reconnector.connection_lost(&mut self.session, now);
        self.reconnector.tick(&mut self.session, now).await
    }

    /// Drop the current connection and re-handshake immediately.
    pub async fn force_reconnect(&mut self) -> Result<ReconnectStatus> {
        self.reconnector.reconnect_now(&mut self.session).await
    }

    /// Send a text frame.
    pub async fn send_text(&mut self, text: &str) -> Result<()> {
        self.session.send_text(text).await
    }

    /// Send a binary frame.
    pub async fn send_binary(&mut self, data: &[u8]) -> Result<()> {
        self.session.send(OpCode::Binary, data).await
    }

    /// Send `value` as JSON in a text frame.
    pub async fn send_json<T: Serialize>(&mut self, value: &T) -> Result<()> {
        let text = JsonCodec::encode(value)?;
        self.session.send_text(&text).await
    }

    /// Send `value` as MessagePack in a binary frame.
    pub async fn send_msgpack<T: Serialize>(&mut self, value: &T) -> Result<()> {
        let bytes = MsgPackCodec::encode(value)?;
        self.session.send(OpCode::Binary, &bytes).await
    }

    /// Close the connection with status 1000. Idempotent.
    pub async fn close(&mut self) {
        self.session.close().await;
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.session.state()
    }

    /// Current reconnection phase.
    pub fn reconnect_phase(&self) -> ReconnectPhase {
        self.reconnector.phase()
    }

    /// Endpoint this client connects to.
    pub fn endpoint(&self) -> &Endpoint {
        self.session.endpoint()
    }

    fn given_up(&self) -> WsError {
        WsError::GivenUp {
            attempts: self.reconnector.failures(),
        }
    }
}

fn decode<T: DeserializeOwned>(payload: &Payload) -> Result<T> {
    match payload {
        Payload::Text(text) => JsonCodec::decode(text),
        Payload::Binary(bytes) => MsgPackCodec::decode(bytes),
    }
}
