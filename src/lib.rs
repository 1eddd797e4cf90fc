//! # wslink
//!
//! Minimal WebSocket (RFC 6455) client over a raw stream socket, with
//! heartbeat supervision and automatic reconnection.
//!
//! Built for small, long-running devices that talk to one server: a robot
//! receiving drive commands and sending telemetry back.
//!
//! ## Architecture
//!
//! - **Protocol**: frame encoding (masked, FIN-only) and resumable decoding
//! - **Transport**: connector, HTTP Upgrade handshake, session lifecycle
//! - **Liveness**: ping/pong heartbeat with a pong deadline
//! - **Reconnect**: fixed back-off with an attempt budget
//! - **Client**: the poll loop tying them together
//!
//! Everything runs on the caller's task; there are no background tasks and
//! no shared state.
//!
//! ## Example
//!
//! ```ignore
//! use wslink::{Client, Endpoint, Event};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> wslink::Result<()> {
//!     let mut client = Client::builder()
//!         .build_tcp(Endpoint::new("192.168.86.69", 8080, "/ws"))?;
//!     client.connect().await?;
//!
//!     while let Event::Message(text) = client.poll::<String>().await? {
//!         client.send_text(&text).await?;
//!     }
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod error;
pub mod liveness;
pub mod protocol;
pub mod reconnect;
pub mod transport;

mod client;
mod config;

pub use client::{Client, ClientBuilder, Event};
pub use config::{Config, DEFAULT_DRAIN_LIMIT};
pub use error::{Result, WsError};
pub use liveness::{Health, LivenessMonitor};
pub use reconnect::{ReconnectPhase, ReconnectStatus, Reconnector};
pub use transport::{ConnectionState, Connector, Endpoint, TcpConnector};
