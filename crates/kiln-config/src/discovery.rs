//! File-based config discovery for CLI use
//!
//! Finds a kiln configuration file in the project root and parses it into a
//! raw JSON value for the [`ConfigNormalizer`](crate::ConfigNormalizer).

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::{ConfigError, Result};

pub const TOML_CONFIG: &str = "kiln.toml";
pub const JSON_CONFIG: &str = "kiln.config.json";
const PACKAGE_JSON: &str = "package.json";
const PACKAGE_FIELD: &str = "kiln";

/// File-based configuration discovery
///
/// # Example
///
/// ```no_run
/// use kiln_config::ConfigDiscovery;
///
/// let discovery = ConfigDiscovery::new(".");
/// let raw = discovery.load().unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigDiscovery {
    root: PathBuf,
}

impl ConfigDiscovery {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Find a config file in the root directory
    ///
    /// Searches in this order:
    /// 1. `kiln.toml`
    /// 2. `kiln.config.json`
    /// 3. `package.json` with a non-null `kiln` field
    pub fn find(&self) -> Option<PathBuf> {
        for name in [TOML_CONFIG, JSON_CONFIG] {
            let path = self.root.join(name);
            if path.is_file() {
                return Some(path);
            }
        }

        let pkg_path = self.root.join(PACKAGE_JSON);
        let content = fs::read_to_string(&pkg_path).ok()?;
        let parsed: Value = serde_json::from_str(&content).ok()?;
        parsed
            .get(PACKAGE_FIELD)
            .is_some_and(|field| !field.is_null())
            .then_some(pkg_path)
    }

    /// Load the discovered config, or an empty table when there is none.
    pub fn load(&self) -> Result<Value> {
        match self.find() {
            Some(path) => self.load_from(&path),
            None => Ok(Value::Object(Default::default())),
        }
    }

    /// Load config from a specific file path (relative paths resolve against the root).
    pub fn load_from(&self, path: &Path) -> Result<Value> {
        let path = self.root.join(path);

        if path.file_name() == Some(std::ffi::OsStr::new(PACKAGE_JSON)) {
            return load_package_json(&path);
        }

        let content = fs::read_to_string(&path)?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => {
                let parsed: toml::Value = toml::from_str(&content).map_err(|e| ConfigError::Parse {
                    path: path.clone(),
                    message: format!("invalid TOML syntax: {e}"),
                })?;
                serde_json::to_value(parsed).map_err(|e| ConfigError::Parse {
                    path,
                    message: format!("TOML to JSON conversion failed: {e}"),
                })
            }
            Some("json") => serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
                path,
                message: format!("invalid JSON: {e}"),
            }),
            _ => Err(ConfigError::UnsupportedFormat { path }),
        }
    }
}

fn load_package_json(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path)?;

    let mut parsed: Value = serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: format!("invalid JSON: {e}"),
    })?;

    match parsed.get_mut(PACKAGE_FIELD).map(Value::take) {
        Some(Value::Null) | None => Err(ConfigError::InvalidValue {
            field: PACKAGE_FIELD.to_string(),
            value: "null".to_string(),
            hint: format!("add a '{PACKAGE_FIELD}' field to {}", path.display()),
        }),
        Some(value) => Ok(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn find_returns_none_when_no_config() {
        let dir = TempDir::new().unwrap();
        let discovery = ConfigDiscovery::new(dir.path());
        assert!(discovery.find().is_none());
        assert_eq!(discovery.load().unwrap(), json!({}));
    }

    #[test]
    fn toml_wins_over_json() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(TOML_CONFIG), "base = \"/a/\"\n").unwrap();
        fs::write(dir.path().join(JSON_CONFIG), r#"{ "base": "/b/" }"#).unwrap();

        let discovery = ConfigDiscovery::new(dir.path());
        assert_eq!(discovery.find().unwrap(), dir.path().join(TOML_CONFIG));
        assert_eq!(discovery.load().unwrap(), json!({ "base": "/a/" }));
    }

    #[test]
    fn package_json_field_is_used() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(PACKAGE_JSON),
            r#"{ "name": "web", "kiln": { "base": "/meqr/" } }"#,
        )
        .unwrap();

        let discovery = ConfigDiscovery::new(dir.path());
        assert_eq!(discovery.load().unwrap(), json!({ "base": "/meqr/" }));
    }

    #[test]
    fn package_json_without_field_is_ignored() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(PACKAGE_JSON), r#"{ "name": "web", "kiln": null }"#).unwrap();
        assert!(ConfigDiscovery::new(dir.path()).find().is_none());
    }

    #[test]
    fn unsupported_extension() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("kiln.yaml"), "base: /").unwrap();

        let err = ConfigDiscovery::new(dir.path())
            .load_from(Path::new("kiln.yaml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat { .. }));
    }

    #[test]
    fn invalid_toml_reports_path() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(TOML_CONFIG), "base = ").unwrap();

        let err = ConfigDiscovery::new(dir.path()).load().unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains(TOML_CONFIG));
    }
}
