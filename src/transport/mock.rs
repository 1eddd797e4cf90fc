//! In-memory connector and scripted peer for unit tests.

use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

use super::connector::{Connector, Endpoint};
use crate::protocol::{Frame, FrameBuffer};

const PIPE_CAPACITY: usize = 256 * 1024;
const SETTLE: Duration = Duration::from_millis(10);
const SWITCHING_RESPONSE: &[u8] =
    b"HTTP/1.1 101 Switching Protocols\r\nUpgrade: websocket\r\nConnection: Upgrade\r\n\r\n";

/// How the next `connect` call behaves.
pub(crate) enum MockReply {
    /// Stream opens and the peer accepts the upgrade.
    Accept,
    /// Accepts, with extra bytes right after the response headers.
    AcceptWith(Vec<u8>),
    /// Stream opens and the peer answers with this text.
    Reject(&'static str),
    /// Stream cannot be opened.
    Refuse,
}

/// Connector handing out duplex pipes with a pre-written handshake response.
///
/// Once the script runs out, every further attempt is refused.
pub(crate) struct MockConnector {
    replies: VecDeque<MockReply>,
    peers: Vec<Option<MockPeer>>,
    attempts: usize,
}

impl MockConnector {
    pub(crate) fn new(replies: Vec<MockReply>) -> Self {
        Self {
            replies: replies.into(),
            peers: Vec::new(),
            attempts: 0,
        }
    }

    /// Number of `connect` calls so far.
    pub(crate) fn attempts(&self) -> usize {
        self.attempts
    }

    /// Server side of the `index`-th opened stream.
    pub(crate) fn peer(&mut self, index: usize) -> &mut MockPeer {
        self.peers[index].as_mut().expect("peer dropped")
    }

    /// Drop the server side, simulating the peer vanishing.
    pub(crate) fn drop_peer(&mut self, index: usize) {
        self.peers[index] = None;
    }
}

impl Connector for MockConnector {
    type Stream = DuplexStream;

    async fn connect(&mut self, _endpoint: &Endpoint) -> io::Result<DuplexStream> {
        self.attempts += 1;

        let response = match self.replies.pop_front().unwrap_or(MockReply::Refuse) {
            MockReply::Refuse => {
                return Err(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"))
            }
            MockReply::Accept => SWITCHING_RESPONSE.to_vec(),
            MockReply::AcceptWith(extra) => {
                let mut response = SWITCHING_RESPONSE.to_vec();
                response.extend_from_slice(&extra);
                response
            }
            MockReply::Reject(text) => text.as_bytes().to_vec(),
        };

        let (client, mut server) = tokio::io::duplex(PIPE_CAPACITY);
        server.write_all(&response).await?;
        self.peers.push(Some(MockPeer::new(server)));
        Ok(client)
    }
}

/// Server half of a mock connection.
pub(crate) struct MockPeer {
    stream: DuplexStream,
    inbound: BytesMut,
    request: Option<String>,
    decoder: FrameBuffer,
}

impl MockPeer {
    fn new(stream: DuplexStream) -> Self {
        Self {
            stream,
            inbound: BytesMut::new(),
            request: None,
            decoder: FrameBuffer::new(),
        }
    }

    /// Read whatever the client wrote. Returns true once the client hung up.
    async fn fill(&mut self) -> bool {
        loop {
            match tokio::time::timeout(SETTLE, self.stream.read_buf(&mut self.inbound)).await {
                Err(_) => return false,
                Ok(Ok(0)) | Ok(Err(_)) => return true,
                Ok(Ok(_)) => continue,
            }
        }
    }

    fn take_request(&mut self) {
        if self.request.is_some() {
            return;
        }
        if let Some(pos) = self.inbound.windows(4).position(|w| w == b"\r\n\r\n") {
            let raw = self.inbound.split_to(pos + 4);
            self.request = Some(String::from_utf8_lossy(&raw).into_owned());
        }
    }

    /// The Upgrade request the client sent.
    pub(crate) async fn request(&mut self) -> String {
        self.fill().await;
        self.take_request();
        self.request.clone().unwrap_or_default()
    }

    /// Frames the client sent since the last call, unmasked.
    pub(crate) async fn frames(&mut self) -> Vec<Frame> {
        self.fill().await;
        self.take_request();
        let bytes = self.inbound.split();
        self.decoder.extend(&bytes);

        let mut frames = Vec::new();
        while let Ok(Some(frame)) = self.decoder.next_frame() {
            frames.push(frame);
        }
        frames
    }

    /// Whether the client side has been dropped.
    pub(crate) async fn is_closed(&mut self) -> bool {
        self.fill().await
    }

    /// Write an unmasked server frame with byte 0 = `first`.
    pub(crate) async fn send(&mut self, first: u8, payload: &[u8]) {
        let mut bytes = vec![first];
        if payload.len() <= 125 {
            bytes.push(payload.len() as u8);
        } else {
            bytes.push(126);
            bytes.extend_from_slice(&(payload.len() as u16).to_be_bytes());
        }
        bytes.extend_from_slice(payload);
        self.write_raw(&bytes).await;
    }

    /// Write raw bytes to the client.
    pub(crate) async fn write_raw(&mut self, bytes: &[u8]) {
        let _ = self.stream.write_all(bytes).await;
    }
}
