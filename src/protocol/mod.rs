//! Protocol module - wire format, framing, and frame types.
//!
//! This module implements the RFC 6455 client framing subset:
//! - Header bit layout and opcodes
//! - Masked frame encoding (FIN always set, fresh key per frame)
//! - Frame buffer for decoding across partial, timed-out reads

mod frame;
mod frame_buffer;
mod wire_format;

pub use frame::{encode_frame, encode_frame_with_mask, generate_mask_key, Frame};
pub use frame_buffer::{FrameBuffer, ReadOutcome};
pub use wire_format::{
    apply_mask, OpCode, MASK_KEY_LEN, MAX_CONTROL_PAYLOAD_LEN, MAX_DIRECT_LEN, MAX_PAYLOAD_LEN,
};
