//! Payload codecs for structured messages.
//!
//! - [`JsonCodec`] - JSON via `serde_json`, carried in text frames
//! - [`MsgPackCodec`] - MessagePack via `rmp-serde`, carried in binary frames
//!
//! Codecs are marker structs with static methods; the frame opcode picks
//! which one decodes an incoming payload.
//!
//! # Example
//!
//! ```
//! use wslink::codec::{JsonCodec, MsgPackCodec};
//!
//! let text = JsonCodec::encode(&vec![1, 2, 3]).unwrap();
//! assert_eq!(text, "[1,2,3]");
//!
//! let bytes = MsgPackCodec::encode(&"hello").unwrap();
//! let decoded: String = MsgPackCodec::decode(&bytes).unwrap();
//! assert_eq!(decoded, "hello");
//! ```

mod json;
mod msgpack;

pub use json::JsonCodec;
pub use msgpack::MsgPackCodec;
