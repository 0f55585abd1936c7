//! Raw configuration → [`BuildConfig`].
//!
//! Validation only: nothing here touches the filesystem or the network, so
//! a configuration error always surfaces before any socket is opened.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::base::{normalize_base, PathRewriter};
use crate::config::{BuildConfig, ConfigWarning, PublicDirPolicy};
use crate::error::{ConfigError, Result};
use crate::plugin::{Plugin, PluginPipeline, PluginRegistry, PluginSpec};
use crate::server::{parse_host, ServerConfig};

const TOP_LEVEL_KEYS: &[&str] = &[
    "plugins",
    "publicDir",
    "public",
    "publicDirPolicy",
    "base",
    "server",
];

const SERVER_KEYS: &[&str] = &["host", "port", "cors"];

const DEFAULT_PUBLIC_DIR: &str = "public";

/// Validates raw configuration and fills in defaults.
///
/// # Example
///
/// ```
/// use kiln_config::{ConfigNormalizer, ConfigWarning};
/// use serde_json::json;
///
/// let config = ConfigNormalizer::new("/project")
///     .normalize(&json!({
///         "base": "meqr",
///         "server": { "host": "0.0.0.0", "port": 3000 }
///     }))
///     .unwrap();
///
/// assert_eq!(config.base(), "/meqr/");
/// assert_eq!(config.server().port, 3000);
/// assert!(matches!(config.warnings()[0], ConfigWarning::NetworkExposure { .. }));
/// ```
#[derive(Debug)]
pub struct ConfigNormalizer {
    root: PathBuf,
    registry: PluginRegistry,
}

impl ConfigNormalizer {
    /// Normalizer for the project at `root`, with the built-in plugins registered.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            registry: PluginRegistry::with_builtins(),
        }
    }

    pub fn with_registry(mut self, registry: PluginRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn normalize(&self, raw: &Value) -> Result<BuildConfig> {
        self.normalize_with_plugins(raw, Vec::new())
    }

    /// Normalize with plugin objects supplied in code.
    ///
    /// `inline` plugins run after the ones named in `raw`.
    pub fn normalize_with_plugins(
        &self,
        raw: &Value,
        inline: Vec<Arc<dyn Plugin>>,
    ) -> Result<BuildConfig> {
        let empty = Map::new();
        let map = match raw {
            Value::Null => &empty,
            Value::Object(map) => map,
            other => {
                return Err(ConfigError::InvalidValue {
                    field: "config".to_string(),
                    value: other.to_string(),
                    hint: "configuration must be a table of options".to_string(),
                });
            }
        };

        reject_unknown_keys(map, TOP_LEVEL_KEYS, "")?;

        let mut plugins = self.resolve_plugins(map.get("plugins"))?;
        plugins.extend(inline);
        let plugins = PluginPipeline::new(plugins)?;

        let public_dir = resolve_public_dir(map)?;
        let public_dir_policy = resolve_policy(map.get("publicDirPolicy"))?;
        let rewriter = PathRewriter::from_normalized(resolve_base(map.get("base"))?);
        let server = resolve_server(map.get("server"))?;

        let mut warnings = Vec::new();
        if server.is_wildcard() {
            warnings.push(ConfigWarning::NetworkExposure {
                host: server.host.clone(),
            });
        }
        if server.port < 1024 {
            warnings.push(ConfigWarning::PrivilegedPort { port: server.port });
        }
        for warning in &warnings {
            warn!("{warning}");
        }

        debug!(
            base = rewriter.base(),
            host = %server.host,
            port = server.port,
            plugins = ?plugins.names(),
            "resolved configuration"
        );

        Ok(BuildConfig::new(
            self.root.clone(),
            plugins,
            public_dir,
            public_dir_policy,
            rewriter,
            server,
            warnings,
        ))
    }

    fn resolve_plugins(&self, value: Option<&Value>) -> Result<Vec<Arc<dyn Plugin>>> {
        match value {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(entries)) => entries
                .iter()
                .enumerate()
                .map(|(index, entry)| {
                    let spec = PluginSpec::from_value(index, entry)?;
                    self.registry.instantiate(&spec)
                })
                .collect(),
            Some(other) => Err(ConfigError::InvalidValue {
                field: "plugins".to_string(),
                value: other.to_string(),
                hint: "expected an array of plugins".to_string(),
            }),
        }
    }
}

fn reject_unknown_keys(map: &Map<String, Value>, allowed: &[&str], prefix: &str) -> Result<()> {
    match map.keys().find(|key| !allowed.contains(&key.as_str())) {
        Some(key) => Err(ConfigError::UnknownKey {
            key: format!("{prefix}{key}"),
        }),
        None => Ok(()),
    }
}

fn resolve_public_dir(map: &Map<String, Value>) -> Result<Option<PathBuf>> {
    let value = match (map.get("publicDir"), map.get("public")) {
        (Some(_), Some(_)) => {
            return Err(ConfigError::InvalidValue {
                field: "publicDir".to_string(),
                value: "publicDir and public".to_string(),
                hint: "set only one of 'publicDir' or 'public'".to_string(),
            });
        }
        (Some(value), None) | (None, Some(value)) => value,
        (None, None) => return Ok(Some(PathBuf::from(DEFAULT_PUBLIC_DIR))),
    };

    match value {
        Value::Bool(false) => Ok(None),
        Value::String(dir) if !dir.trim().is_empty() => Ok(Some(PathBuf::from(dir))),
        other => Err(ConfigError::InvalidValue {
            field: "publicDir".to_string(),
            value: other.to_string(),
            hint: "expected a directory path, or false to disable".to_string(),
        }),
    }
}

fn resolve_policy(value: Option<&Value>) -> Result<PublicDirPolicy> {
    match value {
        None => Ok(PublicDirPolicy::default()),
        Some(Value::String(s)) if s == "lenient" => Ok(PublicDirPolicy::Lenient),
        Some(Value::String(s)) if s == "require" => Ok(PublicDirPolicy::Require),
        Some(other) => Err(ConfigError::InvalidValue {
            field: "publicDirPolicy".to_string(),
            value: other.to_string(),
            hint: "expected \"lenient\" or \"require\"".to_string(),
        }),
    }
}

fn resolve_base(value: Option<&Value>) -> Result<String> {
    match value {
        None => Ok("/".to_string()),
        Some(Value::String(base)) => normalize_base(base),
        Some(other) => Err(ConfigError::InvalidBasePath {
            value: other.to_string(),
            reason: "base must be a string".to_string(),
        }),
    }
}

fn resolve_server(value: Option<&Value>) -> Result<ServerConfig> {
    let map = match value {
        None | Some(Value::Null) => return Ok(ServerConfig::default()),
        Some(Value::Object(map)) => map,
        Some(other) => {
            return Err(ConfigError::InvalidValue {
                field: "server".to_string(),
                value: other.to_string(),
                hint: "expected a table with host and port".to_string(),
            });
        }
    };

    reject_unknown_keys(map, SERVER_KEYS, "server.")?;

    let mut server = ServerConfig::default();

    match map.get("host") {
        None => {}
        Some(Value::String(host)) => server.host = parse_host(host)?,
        Some(other) => {
            return Err(ConfigError::InvalidHost {
                value: other.to_string(),
                reason: "expected a string".to_string(),
            });
        }
    }

    if let Some(port) = map.get("port") {
        server.port = parse_port(port)?;
    }

    match map.get("cors") {
        None => {}
        Some(Value::Bool(cors)) => server.cors = *cors,
        Some(other) => {
            return Err(ConfigError::InvalidValue {
                field: "server.cors".to_string(),
                value: other.to_string(),
                hint: "expected true or false".to_string(),
            });
        }
    }

    Ok(server)
}

fn parse_port(value: &Value) -> Result<u16> {
    value
        .as_u64()
        .filter(|port| (1..=u64::from(u16::MAX)).contains(port))
        .and_then(|port| u16::try_from(port).ok())
        .ok_or_else(|| ConfigError::InvalidPort {
            value: value.to_string(),
        })
}
