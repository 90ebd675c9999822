//! `secrets.yaml` next to the gateway configuration

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_yaml::Value;
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};

/// Name of the secrets file looked up beside the configuration
pub const SECRETS_FILE: &str = "secrets.yaml";

/// Scalar secrets keyed by name
#[derive(Debug, Clone)]
pub struct Secrets {
    values: HashMap<String, String>,
    path: PathBuf,
}

impl Secrets {
    /// Load `secrets.yaml` from `dir`; a missing file means no secrets
    pub fn load(dir: &Path) -> ConfigResult<Self> {
        let path = dir.join(SECRETS_FILE);
        if !path.exists() {
            debug!(path = %path.display(), "no secrets file");
            return Ok(Self {
                values: HashMap::new(),
                path,
            });
        }

        let content = fs::read_to_string(&path).map_err(|source| ConfigError::ReadFile {
            path: path.clone(),
            source,
        })?;
        let raw: HashMap<String, Value> =
            serde_yaml::from_str(&content).map_err(|source| ConfigError::ParseYaml {
                path: path.clone(),
                source,
            })?;

        let mut values = HashMap::with_capacity(raw.len());
        for (key, value) in raw {
            let text = match value {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => {
                    return Err(ConfigError::invalid(
                        &key,
                        format!("secrets must be scalars ({})", path.display()),
                    ))
                }
            };
            values.insert(key, text);
        }

        debug!(count = values.len(), path = %path.display(), "loaded secrets");
        Ok(Self { values, path })
    }

    pub fn get(&self, key: &str) -> ConfigResult<&str> {
        self.values
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| ConfigError::SecretNotFound {
                key: key.to_string(),
                path: self.path.clone(),
            })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_scalars() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(SECRETS_FILE),
            "actec_token: 0a1b2c3d4e5f\nport: 8024\nenabled: true\n",
        )
        .unwrap();

        let secrets = Secrets::load(dir.path()).unwrap();
        assert_eq!(secrets.get("actec_token").unwrap(), "0a1b2c3d4e5f");
        assert_eq!(secrets.get("port").unwrap(), "8024");
        assert_eq!(secrets.get("enabled").unwrap(), "true");
        assert_eq!(secrets.len(), 3);
        assert!(secrets.contains("port"));
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let secrets = Secrets::load(dir.path()).unwrap();
        assert!(secrets.is_empty());
        assert!(matches!(
            secrets.get("actec_token"),
            Err(ConfigError::SecretNotFound { .. })
        ));
    }

    #[test]
    fn test_nested_secret_rejected() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(SECRETS_FILE), "nested:\n  a: 1\n").unwrap();
        assert!(matches!(
            Secrets::load(dir.path()),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
