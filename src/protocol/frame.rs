//! Frame struct and client-side frame encoding.
//!
//! Every frame this client writes has FIN set and carries a fresh
//! random masking key.
//!
//! # Example
//!
//! ```
//! use wslink::protocol::{encode_frame_with_mask, OpCode};
//!
//! let bytes = encode_frame_with_mask(OpCode::Text, b"Hello", [0x37, 0xFA, 0x21, 0x3D]).unwrap();
//! assert_eq!(
//!     &bytes[..],
//!     &[0x81, 0x85, 0x37, 0xFA, 0x21, 0x3D, 0x7F, 0x9F, 0x4D, 0x51, 0x58]
//! );
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use super::wire_format::{
    apply_mask, OpCode, FIN_BIT, LEN16_MARKER, MASK_BIT, MASK_KEY_LEN, MAX_DIRECT_LEN,
    MAX_HEADER_LEN, MAX_PAYLOAD_LEN,
};
use crate::error::{Result, WsError};

/// A complete, unmasked frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame opcode.
    pub opcode: OpCode,
    /// Payload bytes (zero-copy via `bytes::Bytes`).
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(opcode: OpCode, payload: Bytes) -> Self {
        Self { opcode, payload }
    }

    /// Get a reference to the payload bytes.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Get the payload length.
    #[inline]
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }
}

/// Draw a fresh masking key.
#[inline]
pub fn generate_mask_key() -> [u8; MASK_KEY_LEN] {
    rand::random()
}

/// Encode a single FIN frame with a freshly generated masking key.
///
/// # Errors
///
/// Returns `MessageTooLong` if the payload exceeds 65535 bytes.
pub fn encode_frame(opcode: OpCode, payload: &[u8]) -> Result<BytesMut> {
    encode_frame_with_mask(opcode, payload, generate_mask_key())
}

/// Encode a single FIN frame with the given masking key.
///
/// Callers must not reuse a key across frames on a live connection;
/// this variant exists for deterministic output.
pub fn encode_frame_with_mask(
    opcode: OpCode,
    payload: &[u8],
    mask_key: [u8; MASK_KEY_LEN],
) -> Result<BytesMut> {
    let len = payload.len();
    if len > MAX_PAYLOAD_LEN {
        return Err(WsError::MessageTooLong(len));
    }

    let mut buf = BytesMut::with_capacity(MAX_HEADER_LEN + len);
    buf.put_u8(FIN_BIT | opcode.as_u8());

    if len <= MAX_DIRECT_LEN {
        buf.put_u8(MASK_BIT | len as u8);
    } else {
        buf.put_u8(MASK_BIT | LEN16_MARKER);
        buf.put_u16(len as u16);
    }

    buf.put_slice(&mask_key);

    let start = buf.len();
    buf.put_slice(payload);
    apply_mask(&mut buf[start..], mask_key);

    Ok(buf)
}
