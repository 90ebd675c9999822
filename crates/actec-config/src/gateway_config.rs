//! The gateway configuration file

use std::path::Path;
use std::time::Duration;

use actec_client::{parse_host, ClientConfig, DEFAULT_CREDENTIAL};
use actec_protocol::{AreaNameRule, Token};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use tracing::{info, warn};

use crate::error::{ConfigError, ConfigResult};
use crate::loader::{config_dir, YamlLoader};

/// One gateway, as written in YAML
///
/// ```yaml
/// host: 192.168.1.20
/// mac: "AA:BB:CC:DD:EE:FF"
/// token: !secret actec_token
/// area_name_rule: floor_room
/// keepalive:
///   ping_interval_ms: 25000
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// `host` or `host:port`
    pub host: String,
    pub mac: String,
    /// Filled with a generated token when the file has none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default = "default_credential")]
    pub credential: String,
    #[serde(default)]
    pub area_name_rule: AreaNameRule,
    #[serde(default)]
    pub keepalive: KeepaliveConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_timeout_ms: Option<u64>,
}

fn default_credential() -> String {
    DEFAULT_CREDENTIAL.to_string()
}

/// Keepalive and reconnect timings in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KeepaliveConfig {
    pub ping_interval_ms: u64,
    pub stale_after_ms: u64,
    pub liveness_grace_ms: u64,
    pub reconnect_cooldown_ms: u64,
    pub reconnect_poll_ms: u64,
    pub backoff_base_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for KeepaliveConfig {
    fn default() -> Self {
        Self {
            ping_interval_ms: 25_000,
            stale_after_ms: 85_000,
            liveness_grace_ms: 500,
            reconnect_cooldown_ms: 1_000,
            reconnect_poll_ms: 2_000,
            backoff_base_ms: 1_000,
            max_backoff_ms: 300_000,
        }
    }
}

impl KeepaliveConfig {
    fn fields(&self) -> [(&'static str, u64); 7] {
        [
            ("keepalive.ping_interval_ms", self.ping_interval_ms),
            ("keepalive.stale_after_ms", self.stale_after_ms),
            ("keepalive.liveness_grace_ms", self.liveness_grace_ms),
            ("keepalive.reconnect_cooldown_ms", self.reconnect_cooldown_ms),
            ("keepalive.reconnect_poll_ms", self.reconnect_poll_ms),
            ("keepalive.backoff_base_ms", self.backoff_base_ms),
            ("keepalive.max_backoff_ms", self.max_backoff_ms),
        ]
    }

    fn validate(&self) -> ConfigResult<()> {
        for (key, ms) in self.fields() {
            if ms == 0 {
                return Err(ConfigError::invalid(key, "must be greater than zero"));
            }
        }
        if self.backoff_base_ms > self.max_backoff_ms {
            return Err(ConfigError::invalid(
                "keepalive.backoff_base_ms",
                "must not exceed max_backoff_ms",
            ));
        }
        Ok(())
    }

    fn apply(&self, config: &mut ClientConfig) {
        config.ping_interval = Duration::from_millis(self.ping_interval_ms);
        config.stale_after = Duration::from_millis(self.stale_after_ms);
        config.liveness_grace = Duration::from_millis(self.liveness_grace_ms);
        config.reconnect_cooldown = Duration::from_millis(self.reconnect_cooldown_ms);
        config.reconnect_poll = Duration::from_millis(self.reconnect_poll_ms);
        config.backoff_base = Duration::from_millis(self.backoff_base_ms);
        config.max_backoff = Duration::from_millis(self.max_backoff_ms);
    }
}

impl GatewayConfig {
    /// Read, resolve and validate a configuration file
    ///
    /// Secrets come from `secrets.yaml` in the same directory.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let loader = YamlLoader::new(&config_dir(path))?;
        let value = loader.load_file(path)?;
        Self::from_value(value, path)
    }

    /// Build from an already resolved YAML value
    pub fn from_value(value: Value, origin: &Path) -> ConfigResult<Self> {
        let config: Self = serde_yaml::from_value(value).map_err(|source| ConfigError::Schema {
            path: origin.to_path_buf(),
            source,
        })?;
        config.prepare()
    }

    /// Normalise the MAC, fill in a missing token, then validate
    pub fn prepare(mut self) -> ConfigResult<Self> {
        self.mac = normalize_mac(&self.mac).ok_or_else(|| {
            ConfigError::invalid("mac", format!("'{}' is not a MAC address", self.mac))
        })?;
        if self.token.is_none() {
            let token = Token::generate();
            warn!(
                mac = %self.mac,
                %token,
                "no token configured; generated one, add it to the configuration to keep it"
            );
            self.token = Some(token.to_string());
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        self.address()?;
        self.token()?;
        if normalize_mac(&self.mac).is_none() {
            return Err(ConfigError::invalid("mac", format!("'{}' is not a MAC address", self.mac)));
        }
        if self.credential.is_empty() {
            return Err(ConfigError::invalid("credential", "must not be empty"));
        }
        if !self.credential.is_ascii() || self.credential.contains(['\r', '\n']) {
            return Err(ConfigError::invalid(
                "credential",
                "must be ASCII without line breaks",
            ));
        }
        self.keepalive.validate()?;
        if self.command_timeout_ms == Some(0) {
            return Err(ConfigError::invalid("command_timeout_ms", "must be greater than zero"));
        }
        Ok(())
    }

    /// Host and port, defaulting the port to 8023
    pub fn address(&self) -> ConfigResult<(String, u16)> {
        parse_host(&self.host).map_err(|reason| ConfigError::invalid("host", reason))
    }

    pub fn token(&self) -> ConfigResult<Token> {
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| ConfigError::invalid("token", "missing"))?;
        Token::new(token).map_err(|err| ConfigError::invalid("token", err.to_string()))
    }

    /// Runtime settings for a session with this gateway
    pub fn client_config(&self) -> ConfigResult<ClientConfig> {
        let (host, port) = self.address()?;
        let mut config = ClientConfig::new(host, port, self.token()?);
        config.credential = self.credential.clone();
        self.keepalive.apply(&mut config);
        config.command_timeout = self.command_timeout_ms.map(Duration::from_millis);
        info!(address = %config.address(), mac = %self.mac, "gateway configured");
        Ok(config)
    }
}

/// Lower-case, colon separated form of a MAC written with `:`, `-` or no
/// separators
pub fn normalize_mac(mac: &str) -> Option<String> {
    let digits: String = mac
        .trim()
        .chars()
        .filter(|c| !matches!(c, ':' | '-'))
        .collect();
    if digits.len() != 12 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let digits = digits.to_ascii_lowercase();
    let pairs: Vec<&str> = (0..12).step_by(2).map(|i| &digits[i..i + 2]).collect();
    Some(pairs.join(":"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::SECRETS_FILE;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("gateway.yaml");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            "host: 192.168.1.20\nmac: AA-BB-CC-DD-EE-FF\ntoken: 0a1b2c3d4e5f\n",
        );

        let config = GatewayConfig::load(&path).unwrap();
        assert_eq!(config.mac, "aa:bb:cc:dd:ee:ff");
        assert_eq!(config.credential, "ACTEC123");
        assert_eq!(config.area_name_rule, AreaNameRule::FloorRoom);
        assert_eq!(config.keepalive, KeepaliveConfig::default());
        assert_eq!(config.command_timeout_ms, None);

        let client = config.client_config().unwrap();
        assert_eq!(client.host, "192.168.1.20");
        assert_eq!(client.port, 8023);
        assert_eq!(client.token.as_str(), "0a1b2c3d4e5f");
        assert_eq!(client.command_timeout, None);
    }

    #[test]
    fn test_keepalive_defaults_match_client() {
        let stock = ClientConfig::new("h", 1, Token::generate());
        let mut configured = stock.clone();
        KeepaliveConfig::default().apply(&mut configured);

        assert_eq!(configured.ping_interval, stock.ping_interval);
        assert_eq!(configured.stale_after, stock.stale_after);
        assert_eq!(configured.liveness_grace, stock.liveness_grace);
        assert_eq!(configured.reconnect_cooldown, stock.reconnect_cooldown);
        assert_eq!(configured.reconnect_poll, stock.reconnect_poll);
        assert_eq!(configured.backoff_base, stock.backoff_base);
        assert_eq!(configured.max_backoff, stock.max_backoff);
    }

    #[test]
    fn test_full_config() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(SECRETS_FILE),
            "actec_token: abcdef012345\nhub_credential: SECRET0001\n",
        )
        .unwrap();
        let path = write_config(
            &dir,
            r#"
host: "hub.local:8024"
mac: "aabbccddeeff"
token: !secret actec_token
credential: !secret hub_credential
area_name_rule: room
keepalive:
  ping_interval_ms: 10000
  max_backoff_ms: 60000
command_timeout_ms: 5000
"#,
        );

        let config = GatewayConfig::load(&path).unwrap();
        assert_eq!(config.area_name_rule, AreaNameRule::Room);
        assert_eq!(config.mac, "aa:bb:cc:dd:ee:ff");

        let client = config.client_config().unwrap();
        assert_eq!(client.address(), "hub.local:8024");
        assert_eq!(client.token.as_str(), "abcdef012345");
        assert_eq!(client.credential, "SECRET0001");
        assert_eq!(client.ping_interval, Duration::from_secs(10));
        assert_eq!(client.stale_after, Duration::from_secs(85));
        assert_eq!(client.max_backoff, Duration::from_secs(60));
        assert_eq!(client.command_timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_missing_token_is_generated() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "host: 10.0.0.2\nmac: aa:bb:cc:dd:ee:ff\n");

        let config = GatewayConfig::load(&path).unwrap();
        let token = config.token.clone().unwrap();
        assert_eq!(token.len(), 12);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(config.client_config().is_ok());
    }

    #[test]
    fn test_invalid_values() {
        let cases = [
            ("host: 'h:0'\nmac: aabbccddeeff\ntoken: 0a1b2c3d4e5f\n", "host"),
            ("host: h\nmac: aabbccddeeff\ntoken: short\n", "token"),
            ("host: h\nmac: not-a-mac\ntoken: 0a1b2c3d4e5f\n", "mac"),
            ("host: h\nmac: aabbccddeeff\ntoken: 0a1b2c3d4e5f\ncredential: ''\n", "credential"),
            (
                "host: h\nmac: aabbccddeeff\ntoken: 0a1b2c3d4e5f\nkeepalive:\n  ping_interval_ms: 0\n",
                "keepalive.ping_interval_ms",
            ),
            (
                "host: h\nmac: aabbccddeeff\ntoken: 0a1b2c3d4e5f\ncommand_timeout_ms: 0\n",
                "command_timeout_ms",
            ),
        ];

        for (yaml, expected) in cases {
            let dir = TempDir::new().unwrap();
            let path = write_config(&dir, yaml);
            match GatewayConfig::load(&path) {
                Err(ConfigError::InvalidValue { key, .. }) => assert_eq!(key, expected, "{}", yaml),
                other => panic!("expected invalid {}, got {:?}", expected, other),
            }
        }
    }

    #[test]
    fn test_credential_with_line_break_rejected() {
        let config = GatewayConfig {
            host: "h".to_string(),
            mac: "aa:bb:cc:dd:ee:ff".to_string(),
            token: Some("0a1b2c3d4e5f".to_string()),
            credential: "ACTEC\r\n123".to_string(),
            area_name_rule: AreaNameRule::None,
            keepalive: KeepaliveConfig::default(),
            command_timeout_ms: None,
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { key, .. }) if key == "credential"
        ));
    }

    #[test]
    fn test_unknown_field_is_schema_error() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "host: h\nmac: aabbccddeeff\nport: 8023\n");
        assert!(matches!(
            GatewayConfig::load(&path),
            Err(ConfigError::Schema { .. })
        ));
    }

    #[test]
    fn test_unknown_area_rule_is_schema_error() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "host: h\nmac: aabbccddeeff\narea_name_rule: building\n");
        assert!(matches!(
            GatewayConfig::load(&path),
            Err(ConfigError::Schema { .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            GatewayConfig::load(Path::new("/nonexistent/gateway.yaml")),
            Err(ConfigError::ReadFile { .. })
        ));
    }

    #[test]
    fn test_normalize_mac() {
        assert_eq!(
            normalize_mac("AA:BB:CC:DD:EE:FF").as_deref(),
            Some("aa:bb:cc:dd:ee:ff")
        );
        assert_eq!(
            normalize_mac("a1-b2-c3-d4-e5-f6").as_deref(),
            Some("a1:b2:c3:d4:e5:f6")
        );
        assert_eq!(
            normalize_mac(" 001122334455 ").as_deref(),
            Some("00:11:22:33:44:55")
        );
        assert_eq!(normalize_mac("00:11:22:33:44"), None);
        assert_eq!(normalize_mac("zz:11:22:33:44:55"), None);
    }
}
