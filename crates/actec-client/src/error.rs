//! Session error types

use actec_protocol::FrameError;
use thiserror::Error;

/// Result type for session operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors raised by a [`Session`](crate::Session)
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection closed by gateway")]
    ConnectionClosed,

    #[error("not connected")]
    NotConnected,

    /// The peer did not greet with `login:`; it is not an AcTEC gateway
    #[error("unsupported gateway: expected login prompt, got {0:?}")]
    UnsupportedGateway(String),

    /// The gateway dropped the connection right after the credential
    #[error("gateway rejected the login credential")]
    CredentialRejected,

    /// The session was closed for good
    #[error("session closed")]
    Closed,

    #[error("frame error: {0}")]
    Frame(FrameError),
}

impl From<FrameError> for ClientError {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::Io(io) => ClientError::Io(io),
            other => ClientError::Frame(other),
        }
    }
}

impl ClientError {
    /// Whether this error means the stream is gone and a reconnect may help
    ///
    /// Decode errors (bad markers, truncation, invalid JSON) mean the byte
    /// stream has lost frame alignment. A frame whose JSON merely has an odd
    /// shape still decodes and never lands here. An oversized outbound message or a bad token
    /// is the caller's problem and does not touch the stream.
    pub fn is_connection_error(&self) -> bool {
        match self {
            ClientError::Io(_) | ClientError::ConnectionClosed | ClientError::NotConnected => true,
            ClientError::Frame(FrameError::TooLarge(_))
            | ClientError::Frame(FrameError::InvalidToken { .. }) => false,
            ClientError::Frame(_) => true,
            ClientError::UnsupportedGateway(_)
            | ClientError::CredentialRejected
            | ClientError::Closed => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_errors() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe");
        assert!(ClientError::Io(io).is_connection_error());
        assert!(ClientError::ConnectionClosed.is_connection_error());
        assert!(ClientError::Frame(FrameError::InvalidStart(b'x')).is_connection_error());
        assert!(ClientError::Frame(FrameError::Truncated {
            expected: 10,
            actual: 3
        })
        .is_connection_error());
    }

    #[test]
    fn test_fatal_errors() {
        assert!(!ClientError::Closed.is_connection_error());
        assert!(!ClientError::UnsupportedGateway("hello!".into()).is_connection_error());
        assert!(!ClientError::Frame(FrameError::TooLarge(70_000)).is_connection_error());
    }

    #[test]
    fn test_frame_io_becomes_io() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let err = ClientError::from(FrameError::Io(io));
        assert!(matches!(err, ClientError::Io(_)));
    }
}
