//! Transport module - connection, handshake and session handling.
//!
//! Provides:
//! - [`Connector`] abstraction over the byte stream (TCP in production)
//! - The HTTP/1.1 Upgrade handshake
//! - [`Session`]: one WebSocket connection with its lifecycle state

mod connector;
mod handshake;
mod session;

pub use connector::{Connector, Endpoint, TcpConnector, DEFAULT_PATH};
pub use handshake::{build_request, check_response, generate_key, SWITCHING_PROTOCOLS};
pub use session::{
    ConnectionState, LivenessStamps, Payload, Received, Session, DEFAULT_CONNECT_TIMEOUT,
    DEFAULT_READ_TIMEOUT,
};

#[cfg(test)]
pub(crate) mod mock;
