//! Configuration for an AcTEC gateway connection
//!
//! A gateway is described by a small YAML file:
//!
//! ```yaml
//! host: 192.168.1.20
//! mac: "aa:bb:cc:dd:ee:ff"
//! token: !secret actec_token
//! ```
//!
//! `!secret` values are read from `secrets.yaml` beside the file and
//! `!env_var` values from the environment. [`GatewayConfig::client_config`]
//! turns the file into the session settings used by `actec-client`.

pub mod error;
pub mod gateway_config;
pub mod loader;
pub mod secrets;

pub use error::{ConfigError, ConfigResult};
pub use gateway_config::{normalize_mac, GatewayConfig, KeepaliveConfig};
pub use loader::YamlLoader;
pub use secrets::Secrets;
