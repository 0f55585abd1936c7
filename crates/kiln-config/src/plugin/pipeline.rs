use std::fmt;
use std::sync::Arc;

use tracing::trace;

use super::{Hook, Plugin, PluginError};
use crate::error::{ConfigError, Result};

/// Ordered plugin sequence handed to the bundler.
///
/// Order is exactly the configured order. Duplicates are kept; resolving
/// conflicts between plugins is the caller's business.
#[derive(Clone, Default)]
pub struct PluginPipeline {
    plugins: Vec<Arc<dyn Plugin>>,
}

impl PluginPipeline {
    /// Validate plugin shape and build the pipeline.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidPlugin` when a plugin has an empty name,
    /// a name containing whitespace, or declares no hooks.
    pub fn new(plugins: Vec<Arc<dyn Plugin>>) -> Result<Self> {
        for plugin in &plugins {
            validate_shape(plugin.as_ref())?;
        }
        Ok(Self { plugins })
    }

    pub fn plugins(&self) -> &[Arc<dyn Plugin>] {
        &self.plugins
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Plugin>> {
        self.plugins.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// First plugin that resolves `specifier` wins.
    pub fn resolve_id(&self, specifier: &str) -> Option<String> {
        self.with_hook(Hook::ResolveId).find_map(|plugin| {
            let resolved = plugin.resolve_id(specifier);
            if let Some(id) = &resolved {
                trace!(plugin = plugin.name(), specifier, id = %id, "resolved module id");
            }
            resolved
        })
    }

    /// First plugin that loads `id` wins.
    pub fn load(&self, id: &str) -> std::result::Result<Option<String>, PluginError> {
        for plugin in self.with_hook(Hook::Load) {
            if let Some(code) = plugin.load(id)? {
                trace!(plugin = plugin.name(), id, "loaded module");
                return Ok(Some(code));
            }
        }
        Ok(None)
    }

    /// Run every transform hook in order, each seeing the previous output.
    pub fn transform(&self, code: String, id: &str) -> std::result::Result<String, PluginError> {
        let mut code = code;
        for plugin in self.with_hook(Hook::Transform) {
            if let Some(next) = plugin.transform(&code, id)? {
                trace!(plugin = plugin.name(), id, "transformed module");
                code = next;
            }
        }
        Ok(code)
    }

    fn with_hook(&self, hook: Hook) -> impl Iterator<Item = &Arc<dyn Plugin>> {
        self.plugins
            .iter()
            .filter(move |plugin| plugin.hooks().contains(&hook))
    }
}

impl fmt::Debug for PluginPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

fn validate_shape(plugin: &dyn Plugin) -> Result<()> {
    let name = plugin.name();

    if name.trim().is_empty() {
        return Err(ConfigError::InvalidPlugin {
            name: name.to_string(),
            reason: "plugin name cannot be empty".to_string(),
        });
    }

    if name.chars().any(char::is_whitespace) {
        return Err(ConfigError::InvalidPlugin {
            name: name.to_string(),
            reason: "plugin name cannot contain whitespace".to_string(),
        });
    }

    if plugin.hooks().is_empty() {
        return Err(ConfigError::InvalidPlugin {
            name: name.to_string(),
            reason: "plugin declares no hooks".to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Suffix {
        name: &'static str,
        suffix: &'static str,
        hooks: &'static [Hook],
    }

    impl Plugin for Suffix {
        fn name(&self) -> &str {
            self.name
        }

        fn hooks(&self) -> &[Hook] {
            self.hooks
        }

        fn resolve_id(&self, specifier: &str) -> Option<String> {
            Some(format!("{specifier}{}", self.suffix))
        }

        fn load(&self, id: &str) -> std::result::Result<Option<String>, PluginError> {
            Ok(Some(format!("// {id} from {}", self.name)))
        }

        fn transform(
            &self,
            code: &str,
            _id: &str,
        ) -> std::result::Result<Option<String>, PluginError> {
            Ok(Some(format!("{code}{}", self.suffix)))
        }
    }

    fn suffix(name: &'static str, suffix: &'static str, hooks: &'static [Hook]) -> Arc<dyn Plugin> {
        Arc::new(Suffix { name, suffix, hooks })
    }

    #[test]
    fn transforms_run_in_configured_order() {
        let pipeline = PluginPipeline::new(vec![
            suffix("a", "-a", &[Hook::Transform]),
            suffix("b", "-b", &[Hook::Transform]),
        ])
        .unwrap();

        assert_eq!(pipeline.transform("x".to_string(), "x.js").unwrap(), "x-a-b");
    }

    #[test]
    fn undeclared_hooks_are_skipped() {
        let pipeline = PluginPipeline::new(vec![
            suffix("loader", "", &[Hook::Transform]),
            suffix("resolver", ".js", &[Hook::ResolveId]),
        ])
        .unwrap();

        assert_eq!(pipeline.resolve_id("main"), Some("main.js".to_string()));
        assert_eq!(pipeline.load("main.js").unwrap(), None);
    }

    #[test]
    fn first_loader_wins() {
        let pipeline = PluginPipeline::new(vec![
            suffix("first", "", &[Hook::Load]),
            suffix("second", "", &[Hook::Load]),
        ])
        .unwrap();

        assert_eq!(
            pipeline.load("main.js").unwrap(),
            Some("// main.js from first".to_string())
        );
    }

    #[test]
    fn rejects_malformed_plugins() {
        const LOAD: &[Hook] = &[Hook::Load];
        const NONE: &[Hook] = &[];

        for (name, hooks) in [("", LOAD), ("two words", LOAD), ("nohooks", NONE)] {
            let err = PluginPipeline::new(vec![suffix(name, "", hooks)]).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidPlugin { .. }), "{name:?}");
        }
    }

    #[test]
    fn debug_lists_names() {
        let pipeline = PluginPipeline::new(vec![suffix("a", "", &[Hook::Load])]).unwrap();
        assert_eq!(format!("{pipeline:?}"), r#"["a"]"#);
    }
}
