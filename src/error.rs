//! Error types for wslink.

use thiserror::Error;

/// Main error type for all wslink operations.
#[derive(Debug, Error)]
pub enum WsError {
    /// I/O error during socket operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error (text payloads).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// MsgPack serialization error (binary payloads).
    #[error("MsgPack encode error: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),

    /// MsgPack deserialization error (binary payloads).
    #[error("MsgPack decode error: {0}")]
    MsgPackDecode(#[from] rmp_serde::decode::Error),

    /// Opening handshake did not produce `101 Switching Protocols`.
    #[error("Handshake failed: {0}")]
    HandshakeFailed(String),

    /// Protocol violation confined to a single frame (unknown opcode, etc.).
    ///
    /// The offending frame has already been consumed; the stream is still
    /// positioned on a frame boundary.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Peer announced a 64-bit payload length.
    #[error("Unsupported 64-bit payload length")]
    UnsupportedLength,

    /// Payload does not fit the 16-bit extended length.
    #[error("Message too long: {0} bytes (max 65535)")]
    MessageTooLong(usize),

    /// Operation requires an open session.
    #[error("Session is not open")]
    NotOpen,

    /// Writing a frame to the socket failed. The session is closed.
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// Reconnection attempts exhausted. Terminal.
    #[error("Gave up after {attempts} consecutive failed reconnection attempts")]
    GivenUp { attempts: u32 },

    /// Builder settings rejected.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl WsError {
    /// Whether the decoder can keep reading from the same stream after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, WsError::Protocol(_))
    }

    /// Whether this error belongs to the send-failure class
    /// (the caller should treat the connection as lost).
    pub fn is_send_failure(&self) -> bool {
        matches!(self, WsError::NotOpen | WsError::SendFailed(_))
    }
}

/// Result type alias using WsError.
pub type Result<T> = std::result::Result<T, WsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        assert!(WsError::Protocol("unknown opcode 0x3".into()).is_recoverable());
        assert!(!WsError::UnsupportedLength.is_recoverable());
        assert!(!WsError::NotOpen.is_recoverable());
    }

    #[test]
    fn test_send_failure_classification() {
        assert!(WsError::NotOpen.is_send_failure());
        assert!(WsError::SendFailed("broken pipe".into()).is_send_failure());
        assert!(!WsError::MessageTooLong(70_000).is_send_failure());
    }

    #[test]
    fn test_given_up_message() {
        let err = WsError::GivenUp { attempts: 1001 };
        assert!(err.to_string().contains("1001"));
    }
}
