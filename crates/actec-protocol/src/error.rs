//! Error types for frame encoding and decoding

use thiserror::Error;

/// Result type for protocol operations
pub type ProtocolResult<T> = Result<T, FrameError>;

/// Errors raised while encoding or decoding a gateway frame
///
/// Decode-side variants cover the frame boundary and JSON syntax only. A
/// well-formed frame whose JSON has an unexpected shape still decodes; see
/// [`Message::from_value`](crate::Message::from_value).
#[derive(Debug, Error)]
pub enum FrameError {
    /// First byte of a frame was not `[`
    #[error("invalid start character 0x{0:02X}")]
    InvalidStart(u8),

    /// Vendor tag was not `AT`
    #[error("invalid vendor tag {0:?}")]
    InvalidVendor(String),

    /// Length field was not four hex digits
    #[error("invalid length field {0:?}")]
    InvalidLength(String),

    /// Last byte of a frame was not `]`
    #[error("invalid end character 0x{0:02X}")]
    InvalidEnd(u8),

    /// Frame content was not valid JSON
    #[error("invalid JSON content: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// Stream ended in the middle of a frame
    #[error("stream ended mid-frame: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    /// Serialized content does not fit the 4 hex digit length field
    #[error("message content is {0} bytes, exceeds the 65535 byte frame limit")]
    TooLarge(usize),

    /// Token is not exactly 12 ASCII characters
    #[error("invalid token {token:?}: {reason}")]
    InvalidToken { token: String, reason: &'static str },

    /// Underlying I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
