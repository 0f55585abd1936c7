//! Plugin contract, ordered pipeline and name-based registry.
//!
//! A plugin is a named unit of build-time transformation logic handed to the
//! bundler. The core never looks inside a plugin: it checks the declared
//! shape once, at resolution time, and keeps plugins in the order they were
//! configured.

mod define;
mod pipeline;
mod registry;

use std::fmt;

use thiserror::Error;

pub use define::DefinePlugin;
pub use pipeline::PluginPipeline;
pub use registry::{PluginFactory, PluginRegistry, PluginSpec};

/// Hook kinds a plugin can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    /// Map an import specifier to a module id.
    ResolveId,
    /// Produce the source for a module id.
    Load,
    /// Rewrite module source.
    Transform,
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Hook::ResolveId => "resolveId",
            Hook::Load => "load",
            Hook::Transform => "transform",
        };
        f.write_str(name)
    }
}

/// Failure raised by a plugin hook.
#[derive(Debug, Error)]
#[error("plugin '{plugin}' failed in {hook}: {message}")]
pub struct PluginError {
    pub plugin: String,
    pub hook: Hook,
    pub message: String,
}

/// Build-time transformation plugin.
///
/// Only hooks listed by [`Plugin::hooks`] are invoked by the pipeline; the
/// remaining methods keep their pass-through defaults.
///
/// # Example
///
/// ```
/// use kiln_config::{Hook, Plugin, PluginError};
///
/// struct Banner;
///
/// impl Plugin for Banner {
///     fn name(&self) -> &str {
///         "banner"
///     }
///
///     fn hooks(&self) -> &[Hook] {
///         &[Hook::Transform]
///     }
///
///     fn transform(&self, code: &str, _id: &str) -> Result<Option<String>, PluginError> {
///         Ok(Some(format!("/* built with kiln */\n{code}")))
///     }
/// }
/// ```
pub trait Plugin: Send + Sync {
    /// Name used in diagnostics.
    fn name(&self) -> &str;

    /// Hooks this plugin implements.
    fn hooks(&self) -> &[Hook];

    fn resolve_id(&self, _specifier: &str) -> Option<String> {
        None
    }

    fn load(&self, _id: &str) -> Result<Option<String>, PluginError> {
        Ok(None)
    }

    fn transform(&self, _code: &str, _id: &str) -> Result<Option<String>, PluginError> {
        Ok(None)
    }
}
