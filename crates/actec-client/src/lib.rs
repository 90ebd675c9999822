//! Session layer for the AcTEC gateway
//!
//! [`Session`] keeps one TCP connection to a gateway alive: it logs in,
//! infers credential acceptance from the socket staying open, pings on an
//! interval, and reconnects with exponential backoff whenever the stream
//! breaks. Consumers read frames through [`Session::responses`] and watch
//! [`ConnectionState`] to learn when the gateway is reachable.

mod config;
mod error;
mod session;
mod state;

pub use config::{parse_host, ClientConfig, DEFAULT_CREDENTIAL, DEFAULT_PORT};
pub use error::{ClientError, ClientResult};
pub use session::{Session, StateListener, LOGIN_PROMPT};
pub use state::{backoff_delay, ConnectionState, InvalidTransition};
