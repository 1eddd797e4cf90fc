//! Stream connectors.
//!
//! A [`Connector`] produces the byte stream a session runs over. The
//! production implementation is [`TcpConnector`]; anything that is
//! `AsyncRead + AsyncWrite + Unpin` works, which is how the tests drive a
//! session over in-memory pipes.

use std::fmt;
use std::future::Future;
use std::io;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

/// Default WebSocket path.
pub const DEFAULT_PATH: &str = "/ws";

/// Identity of a WebSocket endpoint: `host:port` plus request path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    host: String,
    port: u16,
    path: String,
}

impl Endpoint {
    /// Create an endpoint. A path without a leading `/` gets one.
    pub fn new(host: impl Into<String>, port: u16, path: impl Into<String>) -> Self {
        let mut path = path.into();
        if !path.starts_with('/') {
            path.insert(0, '/');
        }
        Self {
            host: host.into(),
            port,
            path,
        }
    }

    /// Endpoint with the default `/ws` path.
    pub fn with_default_path(host: impl Into<String>, port: u16) -> Self {
        Self::new(host, port, DEFAULT_PATH)
    }

    /// Host name or address.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// TCP port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Request path.
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ws://{}:{}{}", self.host, self.port, self.path)
    }
}

/// Opens byte streams to an endpoint.
///
/// The session applies the connect timeout around [`Connector::connect`].
pub trait Connector {
    /// Stream type produced by this connector.
    type Stream: AsyncRead + AsyncWrite + Unpin;

    /// Open a new stream to `endpoint`.
    fn connect(&mut self, endpoint: &Endpoint) -> impl Future<Output = io::Result<Self::Stream>>;
}

/// Plain TCP connector.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    type Stream = TcpStream;

    async fn connect(&mut self, endpoint: &Endpoint) -> io::Result<TcpStream> {
        let stream = TcpStream::connect((endpoint.host(), endpoint.port())).await?;
        // Disable Nagle's algorithm: frames are small and latency-sensitive
        let _ = stream.set_nodelay(true);
        Ok(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_accessors() {
        let endpoint = Endpoint::new("192.168.86.69", 8080, "/ws");
        assert_eq!(endpoint.host(), "192.168.86.69");
        assert_eq!(endpoint.port(), 8080);
        assert_eq!(endpoint.path(), "/ws");
        assert_eq!(endpoint.to_string(), "ws://192.168.86.69:8080/ws");
    }

    #[test]
    fn test_endpoint_path_normalized() {
        assert_eq!(Endpoint::new("h", 1, "robot").path(), "/robot");
        assert_eq!(Endpoint::with_default_path("h", 1).path(), "/ws");
    }

    #[tokio::test]
    async fn test_tcp_connector_refused() {
        // Bind then drop to obtain a port nobody listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut connector = TcpConnector;
        let result = connector
            .connect(&Endpoint::with_default_path("127.0.0.1", port))
            .await;
        assert!(result.is_err());
    }
}
