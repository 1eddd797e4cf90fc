//! Frame buffer for accumulating partial reads.
//!
//! Uses `bytes::BytesMut` for zero-copy buffer management.
//! Implements a state machine for handling fragmented reads:
//! - `WaitingForHeader`: Need the 2 fixed bytes, the extended length and the mask key
//! - `WaitingForPayload`: Header parsed, need N more payload bytes
//!
//! Bytes stay buffered across read timeouts, so a frame that arrives in
//! pieces over several polls is still decoded on a frame boundary.
//!
//! # Example
//!
//! ```
//! use wslink::protocol::{FrameBuffer, OpCode};
//!
//! let mut buffer = FrameBuffer::new();
//!
//! // Unmasked server frame "hi", delivered one byte at a time
//! for byte in [0x81, 0x02, b'h', b'i'] {
//!     buffer.extend(&[byte]);
//! }
//!
//! let frame = buffer.next_frame().unwrap().unwrap();
//! assert_eq!(frame.opcode, OpCode::Text);
//! assert_eq!(frame.payload(), b"hi");
//! ```

use std::io::ErrorKind;
use std::time::Duration;

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

use super::frame::Frame;
use super::wire_format::{
    apply_mask, base_header_len, OpCode, FIN_BIT, LEN16_MARKER, LEN7_MASK, MASK_BIT,
    MASK_KEY_LEN, MAX_CONTROL_PAYLOAD_LEN, OPCODE_MASK, RSV_MASK,
};
use crate::error::{Result, WsError};

/// Initial buffer capacity.
const DEFAULT_CAPACITY: usize = 8 * 1024;

/// Bytes reserved ahead of each socket read.
const READ_CHUNK: usize = 4 * 1024;

/// Parsed frame header, prior to opcode validation.
#[derive(Debug, Clone, Copy)]
struct FrameHeader {
    /// Raw byte 0 (FIN, RSV, opcode).
    first: u8,
    /// Mask key if the peer set the MASK bit.
    mask: Option<[u8; MASK_KEY_LEN]>,
    /// Declared payload length.
    payload_len: usize,
}

/// State machine for frame parsing.
#[derive(Debug, Clone)]
enum State {
    /// Waiting for a complete header.
    WaitingForHeader,
    /// Header parsed, waiting for payload bytes.
    WaitingForPayload { header: FrameHeader },
}

/// Result of a bounded read attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A complete frame was decoded.
    Frame(Frame),
    /// Nothing complete arrived within the read timeout.
    NoData,
    /// The peer closed the stream or the socket failed.
    ConnectionLost,
}

/// Buffer for accumulating incoming bytes and extracting complete frames.
pub struct FrameBuffer {
    /// Accumulated bytes from socket reads.
    buffer: BytesMut,
    /// Current parsing state.
    state: State,
}

impl FrameBuffer {
    /// Create a new frame buffer with default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a new frame buffer with custom capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
            state: State::WaitingForHeader,
        }
    }

    /// Append data to the buffer without extracting frames.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Try to extract a single frame from the buffer.
    ///
    /// Returns:
    /// - `Ok(Some(frame))` if a complete frame was extracted
    /// - `Ok(None)` if more data is needed
    /// - `Err(Protocol)` if a complete but unacceptable frame was consumed;
    ///   the buffer is positioned on the next frame
    /// - `Err(UnsupportedLength)` on a 64-bit length marker; the buffer
    ///   cannot be resynchronised and must be discarded
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        match self.state {
            State::WaitingForHeader => {
                let header = match self.parse_header()? {
                    Some(header) => header,
                    None => return Ok(None),
                };

                self.state = State::WaitingForPayload { header };

                // Try to get payload immediately
                self.next_frame()
            }

            State::WaitingForPayload { header } => {
                if self.buffer.len() < header.payload_len {
                    return Ok(None);
                }

                let mut payload = self.buffer.split_to(header.payload_len);
                self.state = State::WaitingForHeader;

                if let Some(key) = header.mask {
                    tracing::warn!("Peer sent a masked frame, unmasking");
                    apply_mask(&mut payload, key);
                }

                let opcode = Self::validate(&header)?;
                Ok(Some(Frame::new(opcode, payload.freeze())))
            }
        }
    }

    /// Parse and consume a header if enough bytes are buffered.
    fn parse_header(&mut self) -> Result<Option<FrameHeader>> {
        if self.buffer.len() < 2 {
            return Ok(None);
        }

        let first = self.buffer[0];
        let second = self.buffer[1];
        let len7 = second & LEN7_MASK;
        let masked = second & MASK_BIT != 0;

        let base_len = base_header_len(len7)?;
        let header_len = if masked {
            base_len + MASK_KEY_LEN
        } else {
            base_len
        };

        if self.buffer.len() < header_len {
            return Ok(None);
        }

        let payload_len = if len7 == LEN16_MARKER {
            u16::from_be_bytes([self.buffer[2], self.buffer[3]]) as usize
        } else {
            len7 as usize
        };

        let mask = masked.then(|| {
            let mut key = [0u8; MASK_KEY_LEN];
            key.copy_from_slice(&self.buffer[base_len..header_len]);
            key
        });

        self.buffer.advance(header_len);

        Ok(Some(FrameHeader {
            first,
            mask,
            payload_len,
        }))
    }

    /// Check a fully consumed frame against what this client accepts.
    fn validate(header: &FrameHeader) -> Result<OpCode> {
        let opcode = OpCode::from_u8(header.first & OPCODE_MASK)?;

        if header.first & RSV_MASK != 0 {
            return Err(WsError::Protocol(format!(
                "Reserved bits set on {:?} frame",
                opcode
            )));
        }

        if header.first & FIN_BIT == 0 || opcode == OpCode::Continuation {
            return Err(WsError::Protocol(
                "Fragmented messages are not supported".to_string(),
            ));
        }

        if opcode.is_control() && header.payload_len > MAX_CONTROL_PAYLOAD_LEN {
            return Err(WsError::Protocol(format!(
                "Control frame payload {} exceeds {}",
                header.payload_len, MAX_CONTROL_PAYLOAD_LEN
            )));
        }

        Ok(opcode)
    }

    /// Decode the next frame from `reader`, waiting at most `read_timeout`
    /// for each individual read.
    ///
    /// A timeout is the expected idle outcome and yields `NoData`; partial
    /// frame bytes stay buffered for the next call.
    pub async fn read_frame<R>(&mut self, reader: &mut R, read_timeout: Duration) -> Result<ReadOutcome>
    where
        R: AsyncRead + Unpin,
    {
        loop {
            if let Some(frame) = self.next_frame()? {
                return Ok(ReadOutcome::Frame(frame));
            }

            self.buffer.reserve(READ_CHUNK);
            match tokio::time::timeout(read_timeout, reader.read_buf(&mut self.buffer)).await {
                Err(_elapsed) => return Ok(ReadOutcome::NoData),
                Ok(Ok(0)) => {
                    tracing::debug!("Peer closed the stream");
                    return Ok(ReadOutcome::ConnectionLost);
                }
                Ok(Ok(_)) => continue,
                Ok(Err(e)) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    return Ok(ReadOutcome::NoData);
                }
                Ok(Err(e)) => {
                    tracing::debug!("Receive error: {}", e);
                    return Ok(ReadOutcome::ConnectionLost);
                }
            }
        }
    }

    /// Get the number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Whether bytes of a further frame are already buffered.
    pub fn has_pending(&self) -> bool {
        !self.buffer.is_empty() || !matches!(self.state, State::WaitingForHeader)
    }

    /// Clear the buffer and reset state.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.state = State::WaitingForHeader;
    }

    /// Get the current state for debugging.
    #[cfg(test)]
    fn state_name(&self) -> &'static str {
        match &self.state {
            State::WaitingForHeader => "WaitingForHeader",
            State::WaitingForPayload { .. } => "WaitingForPayload",
        }
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}
