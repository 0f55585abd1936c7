use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::{DefinePlugin, Plugin};
use crate::error::{ConfigError, Result};

/// Constructs a plugin from its `options` value.
pub type PluginFactory = Box<dyn Fn(&Value) -> Result<Arc<dyn Plugin>> + Send + Sync>;

/// One entry of the `plugins` array in a config file.
///
/// Accepts either a bare name (`"define"`) or a table
/// (`{ name = "define", options = { ... } }`).
#[derive(Debug, Clone, PartialEq)]
pub struct PluginSpec {
    pub name: String,
    pub options: Value,
}

impl PluginSpec {
    /// Parse the entry at `plugins[index]`.
    pub fn from_value(index: usize, value: &Value) -> Result<Self> {
        let field = format!("plugins[{index}]");

        match value {
            Value::String(name) => Ok(Self {
                name: name.clone(),
                options: Value::Null,
            }),
            Value::Object(map) => {
                if let Some(key) = map.keys().find(|k| !matches!(k.as_str(), "name" | "options")) {
                    return Err(ConfigError::UnknownKey {
                        key: format!("{field}.{key}"),
                    });
                }

                let name = map
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| ConfigError::InvalidValue {
                        field: format!("{field}.name"),
                        value: map.get("name").map(Value::to_string).unwrap_or_default(),
                        hint: "plugin tables need a string 'name'".to_string(),
                    })?;

                Ok(Self {
                    name: name.to_string(),
                    options: map.get("options").cloned().unwrap_or(Value::Null),
                })
            }
            other => Err(ConfigError::InvalidValue {
                field,
                value: other.to_string(),
                hint: "expected a plugin name or { name, options }".to_string(),
            }),
        }
    }
}

/// Maps plugin names used in config files to factories.
#[derive(Default)]
pub struct PluginRegistry {
    factories: BTreeMap<String, PluginFactory>,
}

impl PluginRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the plugins that ship with kiln.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("define", |options| {
            Ok(Arc::new(DefinePlugin::from_options(options)?) as Arc<dyn Plugin>)
        });
        registry
    }

    /// Register `factory` under `name`, replacing any previous entry.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&Value) -> Result<Arc<dyn Plugin>> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    /// Build the plugin described by `spec`.
    pub fn instantiate(&self, spec: &PluginSpec) -> Result<Arc<dyn Plugin>> {
        let factory = self
            .factories
            .get(&spec.name)
            .ok_or_else(|| ConfigError::UnknownPlugin {
                name: spec.name.clone(),
                available: self.names(),
            })?;

        factory(&spec.options)
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugins", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_bare_names_and_tables() {
        let spec = PluginSpec::from_value(0, &json!("define")).unwrap();
        assert_eq!(spec.name, "define");
        assert!(spec.options.is_null());

        let spec =
            PluginSpec::from_value(1, &json!({ "name": "define", "options": { "A": "1" } }))
                .unwrap();
        assert_eq!(spec.options, json!({ "A": "1" }));
    }

    #[test]
    fn rejects_malformed_specs() {
        let err = PluginSpec::from_value(2, &json!(42)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "plugins[2]"));

        let err = PluginSpec::from_value(0, &json!({ "options": {} })).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        let err = PluginSpec::from_value(0, &json!({ "name": "define", "enforce": "pre" }))
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownKey { ref key } if key == "plugins[0].enforce"));
    }

    #[test]
    fn unknown_names_report_available_plugins() {
        let registry = PluginRegistry::with_builtins();
        let spec = PluginSpec {
            name: "vue".to_string(),
            options: Value::Null,
        };

        match registry.instantiate(&spec) {
            Err(ConfigError::UnknownPlugin { name, available }) => {
                assert_eq!(name, "vue");
                assert_eq!(available, vec!["define".to_string()]);
            }
            other => panic!("expected UnknownPlugin, got {:?}", other.map(|p| p.name().to_string())),
        }
    }

    #[test]
    fn custom_factories_can_be_registered() {
        let mut registry = PluginRegistry::new();
        registry.register("env", |_| Ok(Arc::new(DefinePlugin::default()) as Arc<dyn Plugin>));
        assert!(registry.contains("env"));
        assert_eq!(registry.names(), vec!["env".to_string()]);
    }
}
