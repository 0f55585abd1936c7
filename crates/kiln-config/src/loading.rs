//! Layered configuration loading.
//!
//! Priority: CLI overrides > environment variables > mode profile > config file.
//! Defaults are filled in afterwards by the normalizer, so every layer here
//! stays a raw JSON value.

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Serialized},
    Figment,
};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::BuildConfig;
use crate::discovery::ConfigDiscovery;
use crate::error::{ConfigError, Result};
use crate::normalize::ConfigNormalizer;

pub const ENV_PREFIX: &str = "KILN_";

/// Environment keys recognized after stripping the prefix and splitting on `__`.
const ENV_KEYS: &[&str] = &["base", "server.host", "server.port"];

const PROFILES_KEY: &str = "profiles";

/// Values supplied on the command line.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,

    #[serde(skip_serializing_if = "ServerOverrides::is_empty")]
    pub server: ServerOverrides,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ServerOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Wider than `u16` so out-of-range values reach the normalizer and
    /// fail with a port error instead of an argument-parsing error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u32>,
}

impl ServerOverrides {
    fn is_empty(&self) -> bool {
        self.host.is_none() && self.port.is_none()
    }
}

/// Loads the raw configuration for a project and resolves it.
///
/// # Example
///
/// ```no_run
/// use kiln_config::{ConfigLoader, ConfigOverrides};
///
/// let config = ConfigLoader::new(".")
///     .mode(Some("staging".to_string()))
///     .overrides(ConfigOverrides {
///         base: Some("/preview/".to_string()),
///         ..Default::default()
///     })
///     .resolve()
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    root: PathBuf,
    config_file: Option<PathBuf>,
    mode: Option<String>,
    overrides: ConfigOverrides,
}

impl ConfigLoader {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            config_file: None,
            mode: None,
            overrides: ConfigOverrides::default(),
        }
    }

    /// Use an explicit config file instead of discovery.
    pub fn config_file(mut self, path: Option<PathBuf>) -> Self {
        self.config_file = path;
        self
    }

    /// Select the `profiles.<mode>` table.
    pub fn mode(mut self, mode: Option<String>) -> Self {
        self.mode = mode;
        self
    }

    pub fn overrides(mut self, overrides: ConfigOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Merge every layer into one raw value.
    pub fn load_value(&self) -> Result<Value> {
        let discovery = ConfigDiscovery::new(&self.root);
        let mut file = match &self.config_file {
            Some(path) => discovery.load_from(path)?,
            None => discovery.load()?,
        };

        self.apply_profile(&mut file)?;

        let overrides =
            serde_json::to_value(&self.overrides).map_err(|e| ConfigError::InvalidValue {
                field: "overrides".to_string(),
                value: format!("{:?}", self.overrides),
                hint: e.to_string(),
            })?;

        let env = Env::prefixed(ENV_PREFIX)
            .split("__")
            .filter(|key| ENV_KEYS.iter().any(|k| key.as_str().eq_ignore_ascii_case(k)));

        Figment::from(Serialized::defaults(file))
            .merge(env)
            .merge(Serialized::defaults(overrides))
            .extract::<Value>()
            .map_err(|e| ConfigError::InvalidValue {
                field: "configuration".to_string(),
                value: e.to_string(),
                hint: "check config file syntax and KILN_* environment variables".to_string(),
            })
    }

    /// Load and normalize with the built-in plugin registry.
    pub fn resolve(&self) -> Result<BuildConfig> {
        self.resolve_with(&ConfigNormalizer::new(&self.root))
    }

    pub fn resolve_with(&self, normalizer: &ConfigNormalizer) -> Result<BuildConfig> {
        normalizer.normalize(&self.load_value()?)
    }

    fn apply_profile(&self, file: &mut Value) -> Result<()> {
        let Some(map) = file.as_object_mut() else {
            return Ok(());
        };

        let profiles = match map.remove(PROFILES_KEY) {
            None | Some(Value::Null) => return Ok(()),
            Some(Value::Object(profiles)) => profiles,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    field: PROFILES_KEY.to_string(),
                    value: other.to_string(),
                    hint: "expected a table keyed by mode name".to_string(),
                });
            }
        };

        let Some(mode) = &self.mode else {
            return Ok(());
        };

        match profiles.get(mode) {
            Some(profile) => {
                debug!(mode = %mode, "applying profile");
                merge_values(file, profile);
            }
            None => debug!(mode = %mode, "no profile for mode"),
        }

        Ok(())
    }
}

/// Deep-merge `update` into `target`; tables merge key by key, everything else replaces.
pub(crate) fn merge_values(target: &mut Value, update: &Value) {
    match (target, update) {
        (Value::Object(target_map), Value::Object(update_map)) => {
            for (key, value) in update_map {
                merge_values(target_map.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
        (target_slot, _) => {
            *target_slot = update.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_tables_recursively() {
        let mut base = json!({ "base": "/", "server": { "host": "localhost", "port": 5173 } });
        merge_values(&mut base, &json!({ "server": { "port": 8080 } }));
        assert_eq!(
            base,
            json!({ "base": "/", "server": { "host": "localhost", "port": 8080 } })
        );
    }

    #[test]
    fn merge_replaces_arrays() {
        let mut base = json!({ "plugins": ["a", "b"] });
        merge_values(&mut base, &json!({ "plugins": ["c"] }));
        assert_eq!(base, json!({ "plugins": ["c"] }));
    }

    #[test]
    fn empty_overrides_serialize_to_empty_table() {
        let value = serde_json::to_value(ConfigOverrides::default()).unwrap();
        assert_eq!(value, json!({}));

        let value = serde_json::to_value(ConfigOverrides {
            base: None,
            server: ServerOverrides {
                host: None,
                port: Some(70000),
            },
        })
        .unwrap();
        assert_eq!(value, json!({ "server": { "port": 70000 } }));
    }
}
