//! YAML loading with `!secret` and `!env_var` substitution

use std::fs;
use std::path::{Path, PathBuf};

use serde_yaml::value::TaggedValue;
use serde_yaml::{Mapping, Value};
use tracing::{debug, trace};

use crate::error::{ConfigError, ConfigResult};
use crate::secrets::Secrets;

/// Reads a YAML document and replaces tagged scalars with their values
///
/// `!secret key` is looked up in the `secrets.yaml` beside the document and
/// `!env_var NAME` in the process environment. Any other tag is rejected.
pub struct YamlLoader {
    secrets: Secrets,
}

impl YamlLoader {
    /// Loader for documents in `config_dir`, reading its secrets file
    pub fn new(config_dir: &Path) -> ConfigResult<Self> {
        Ok(Self {
            secrets: Secrets::load(config_dir)?,
        })
    }

    pub fn with_secrets(secrets: Secrets) -> Self {
        Self { secrets }
    }

    pub fn secrets(&self) -> &Secrets {
        &self.secrets
    }

    pub fn load_file(&self, path: &Path) -> ConfigResult<Value> {
        debug!(path = %path.display(), "loading configuration");
        let content = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        self.load_str(&content, path)
    }

    /// Parse `content`; `origin` is only used in error messages
    pub fn load_str(&self, content: &str, origin: &Path) -> ConfigResult<Value> {
        let value: Value =
            serde_yaml::from_str(content).map_err(|source| ConfigError::ParseYaml {
                path: origin.to_path_buf(),
                source,
            })?;
        self.resolve(value)
    }

    fn resolve(&self, value: Value) -> ConfigResult<Value> {
        match value {
            Value::Tagged(tagged) => self.resolve_tag(*tagged),
            Value::Mapping(map) => {
                let mut resolved = Mapping::with_capacity(map.len());
                for (key, value) in map {
                    resolved.insert(self.resolve(key)?, self.resolve(value)?);
                }
                Ok(Value::Mapping(resolved))
            }
            Value::Sequence(items) => items
                .into_iter()
                .map(|item| self.resolve(item))
                .collect::<ConfigResult<Vec<_>>>()
                .map(Value::Sequence),
            other => Ok(other),
        }
    }

    fn resolve_tag(&self, tagged: TaggedValue) -> ConfigResult<Value> {
        let tag = tagged.tag.to_string();
        trace!(%tag, "resolving tag");
        match tag.as_str() {
            "!secret" => {
                let key = tag_argument(&tag, tagged.value)?;
                let secret = self.secrets.get(&key)?;
                debug!(key = %key, "substituted secret");
                Ok(Value::String(secret.to_string()))
            }
            "!env_var" => {
                let var = tag_argument(&tag, tagged.value)?;
                let value = std::env::var(&var)
                    .map_err(|_| ConfigError::EnvVarNotFound { var: var.clone() })?;
                debug!(var = %var, "substituted environment variable");
                Ok(Value::String(value))
            }
            _ => Err(ConfigError::invalid(&tag, "unsupported tag")),
        }
    }
}

fn tag_argument(tag: &str, value: Value) -> ConfigResult<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(ConfigError::invalid(tag, "expects a name")),
    }
}

/// Directory holding `path`, used to find its secrets file
pub fn config_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
