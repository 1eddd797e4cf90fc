//! Wire format constants and header bit layout.
//!
//! RFC 6455 client subset:
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-------+-+-------------+-------------------------------+
//! |F|R|R|R| opcode|M| Payload len |    Extended payload length    |
//! |I|S|S|S|  (4)  |A|     (7)     |        (16, if len == 126)    |
//! |N|V|V|V|       |S|             |                               |
//! +-+-+-+-+-------+-+-------------+ - - - - - - - - - - - - - - - +
//! |     Masking key (client frames only, 4 bytes)                 |
//! +---------------------------------------------------------------+
//! |     Payload data, XORed with the masking key                  |
//! +---------------------------------------------------------------+
//! ```
//!
//! Extended lengths are Big Endian. The 64-bit length form (marker 127)
//! is not supported.

use crate::error::{Result, WsError};

/// FIN bit in byte 0.
pub const FIN_BIT: u8 = 0b1000_0000;

/// RSV1..RSV3 bits in byte 0 (no extensions are negotiated, must be 0).
pub const RSV_MASK: u8 = 0b0111_0000;

/// Opcode nibble in byte 0.
pub const OPCODE_MASK: u8 = 0b0000_1111;

/// MASK bit in byte 1.
pub const MASK_BIT: u8 = 0b1000_0000;

/// 7-bit length field in byte 1.
pub const LEN7_MASK: u8 = 0b0111_1111;

/// Largest length encoded directly in the 7-bit field.
pub const MAX_DIRECT_LEN: usize = 125;

/// Length marker announcing a 16-bit extended length.
pub const LEN16_MARKER: u8 = 126;

/// Length marker announcing a 64-bit extended length (unsupported).
pub const LEN64_MARKER: u8 = 127;

/// Largest payload this implementation encodes or accepts.
pub const MAX_PAYLOAD_LEN: usize = u16::MAX as usize;

/// Largest payload permitted in a control frame.
pub const MAX_CONTROL_PAYLOAD_LEN: usize = 125;

/// Masking key size in bytes.
pub const MASK_KEY_LEN: usize = 4;

/// Largest possible client frame header: 2 + 2 (extended) + 4 (mask).
pub const MAX_HEADER_LEN: usize = 2 + 2 + MASK_KEY_LEN;

/// Frame opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    /// Continuation of a fragmented message. Never produced, rejected on receipt.
    Continuation = 0x0,
    /// UTF-8 text payload.
    Text = 0x1,
    /// Binary payload.
    Binary = 0x2,
    /// Connection close.
    Close = 0x8,
    /// Keepalive request.
    Ping = 0x9,
    /// Keepalive reply.
    Pong = 0xA,
}

impl OpCode {
    /// Parse the low nibble of byte 0.
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0x0 => Ok(OpCode::Continuation),
            0x1 => Ok(OpCode::Text),
            0x2 => Ok(OpCode::Binary),
            0x8 => Ok(OpCode::Close),
            0x9 => Ok(OpCode::Ping),
            0xA => Ok(OpCode::Pong),
            other => Err(WsError::Protocol(format!(
                "Unsupported opcode 0x{:X}",
                other
            ))),
        }
    }

    /// Raw 4-bit value.
    #[inline]
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Close, Ping and Pong.
    #[inline]
    pub fn is_control(self) -> bool {
        matches!(self, OpCode::Close | OpCode::Ping | OpCode::Pong)
    }
}

/// XOR `buf` with `key`, cycling the key per byte index modulo 4.
///
/// Applying the same key twice restores the input.
#[inline]
pub fn apply_mask(buf: &mut [u8], key: [u8; MASK_KEY_LEN]) {
    for (i, byte) in buf.iter_mut().enumerate() {
        *byte ^= key[i % MASK_KEY_LEN];
    }
}

/// Header length (without mask key) implied by the 7-bit length field.
///
/// Returns `UnsupportedLength` for the 64-bit marker.
#[inline]
pub fn base_header_len(len7: u8) -> Result<usize> {
    match len7 {
        LEN64_MARKER => Err(WsError::UnsupportedLength),
        LEN16_MARKER => Ok(4),
        _ => Ok(2),
    }
}
