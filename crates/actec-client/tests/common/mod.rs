//! Common test utilities for the session crate
//!
//! A scripted gateway on a loopback port plus fast session timings.

mod mock_hub;

pub use mock_hub::*;

use std::time::Duration;

use actec_client::ClientConfig;
use actec_protocol::Token;

/// Token used by every test session
pub fn test_token() -> Token {
    Token::new("0123456789ab").unwrap()
}

/// Session settings with millisecond timings
pub fn fast_config(port: u16) -> ClientConfig {
    let mut config = ClientConfig::new("127.0.0.1", port, test_token());
    config.liveness_grace = Duration::from_millis(20);
    config.reconnect_cooldown = Duration::from_millis(10);
    config.reconnect_poll = Duration::from_millis(10);
    config.ping_interval = Duration::from_millis(50);
    config.stale_after = Duration::from_secs(5);
    config.backoff_base = Duration::from_millis(10);
    config.max_backoff = Duration::from_millis(80);
    config
}

/// Fail the test instead of hanging it
pub async fn within<F: std::future::Future>(future: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(5), future)
        .await
        .expect("timed out")
}
