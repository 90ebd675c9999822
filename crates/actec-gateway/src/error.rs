//! Gateway and setup error types

use std::time::Duration;

use actec_client::ClientError;
use actec_protocol::TopologyError;
use thiserror::Error;

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors raised by [`Gateway`](crate::Gateway) operations
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("malformed topology: {0}")]
    MalformedTopology(#[from] TopologyError),

    #[error("topology already loaded; reload the gateway to refresh it")]
    TopologyAlreadyLoaded,

    /// The connection dropped while the request was waiting for its reply
    #[error("connection to the gateway was lost before it replied")]
    ConnectionLost,

    #[error("gateway did not reply within {0:?}")]
    Timeout(Duration),
}

/// Why setting up a gateway failed
///
/// Each variant calls for a different action from the user.
#[derive(Debug, Error)]
pub enum SetupError {
    /// The gateway could not be reached; try again later
    #[error("gateway not ready: {0}")]
    NotReady(String),

    /// The peer is not a supported gateway or refused the protocol
    #[error("gateway not supported: {0}")]
    NotSupported(String),

    /// The hub has not been told to share its devices with this client
    #[error("authorization pending: keep the AcTEC app open and confirm sharing, then retry")]
    AuthorizationPending,

    /// The hub answered but its device list could not be read
    #[error("gateway sent data in an unexpected format: {0}")]
    DataFormat(String),
}

impl SetupError {
    /// Classify a failure to open the session
    pub fn from_connect(err: ClientError) -> Self {
        match err {
            ClientError::Io(_) | ClientError::ConnectionClosed | ClientError::NotConnected => {
                SetupError::NotReady(err.to_string())
            }
            other => SetupError::NotSupported(other.to_string()),
        }
    }

    /// Whether retrying later without user action may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, SetupError::NotReady(_))
    }
}
