//! Runtime configuration for a session

use std::time::Duration;

use actec_protocol::Token;

/// Port the gateway listens on when the host string names none
pub const DEFAULT_PORT: u16 = 8023;

/// Credential sent after the `login:` prompt
pub const DEFAULT_CREDENTIAL: &str = "ACTEC123";

/// Connection and keepalive settings for a [`Session`](crate::Session)
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    /// Identifier written into every outbound frame
    pub token: Token,
    pub credential: String,
    /// Wait after login before checking the gateway kept the socket open
    pub liveness_grace: Duration,
    /// Pause between tearing a connection down and dialing again
    pub reconnect_cooldown: Duration,
    /// Read retry interval while a reconnect is in progress
    pub reconnect_poll: Duration,
    pub ping_interval: Duration,
    /// Silence after which the ping loop reconnects instead of pinging
    pub stale_after: Duration,
    pub backoff_base: Duration,
    pub max_backoff: Duration,
    /// Upper bound on waiting for a command reply; `None` waits forever
    pub command_timeout: Option<Duration>,
}

impl ClientConfig {
    /// Settings with the gateway's stock timings
    pub fn new(host: impl Into<String>, port: u16, token: Token) -> Self {
        Self {
            host: host.into(),
            port,
            token,
            credential: DEFAULT_CREDENTIAL.to_string(),
            liveness_grace: Duration::from_millis(500),
            reconnect_cooldown: Duration::from_secs(1),
            reconnect_poll: Duration::from_secs(2),
            ping_interval: Duration::from_secs(25),
            stale_after: Duration::from_secs(85),
            backoff_base: Duration::from_secs(1),
            max_backoff: Duration::from_secs(300),
            command_timeout: None,
        }
    }

    /// `host:port` for logging
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Split `host` or `host:port` into its parts
///
/// Bare IPv6 addresses are taken as host only; use `[addr]:port` to give
/// them a port.
pub fn parse_host(input: &str) -> Result<(String, u16), String> {
    let input = input.trim();
    if input.is_empty() {
        return Err("host is empty".to_string());
    }

    if let Some(rest) = input.strip_prefix('[') {
        let (host, tail) = rest
            .split_once(']')
            .ok_or_else(|| format!("unterminated IPv6 address in '{}'", input))?;
        return match tail.strip_prefix(':') {
            Some(port) => Ok((host.to_string(), parse_port(port)?)),
            None if tail.is_empty() => Ok((host.to_string(), DEFAULT_PORT)),
            None => Err(format!("unexpected '{}' after IPv6 address", tail)),
        };
    }

    match input.split_once(':') {
        Some((host, port)) if !port.contains(':') => {
            if host.is_empty() {
                return Err(format!("missing host in '{}'", input));
            }
            Ok((host.to_string(), parse_port(port)?))
        }
        _ => Ok((input.to_string(), DEFAULT_PORT)),
    }
}

fn parse_port(port: &str) -> Result<u16, String> {
    match port.parse::<u16>() {
        Ok(0) | Err(_) => Err(format!("invalid port '{}'", port)),
        Ok(port) => Ok(port),
    }
}
