//! The resolved, immutable build configuration.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::base::PathRewriter;
use crate::plugin::PluginPipeline;
use crate::server::ServerConfig;

/// What to do when the public directory is missing on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublicDirPolicy {
    /// Serve nothing from it.
    #[default]
    Lenient,
    /// Refuse to start the dev server.
    Require,
}

/// Non-fatal findings recorded while normalizing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ConfigWarning {
    /// The server binds a wildcard address and is reachable from the network.
    NetworkExposure { host: String },
    /// Ports below 1024 usually need elevated privileges.
    PrivilegedPort { port: u16 },
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigWarning::NetworkExposure { host } => write!(
                f,
                "server.host is {host}: the dev server will be reachable from other machines on the network"
            ),
            ConfigWarning::PrivilegedPort { port } => write!(
                f,
                "port {port} is in the privileged range and may require root access"
            ),
        }
    }
}

/// Fully resolved configuration.
///
/// Built once by [`ConfigNormalizer`](crate::ConfigNormalizer) and never
/// mutated afterwards.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    root: PathBuf,
    plugins: PluginPipeline,
    public_dir: Option<PathBuf>,
    public_dir_policy: PublicDirPolicy,
    rewriter: PathRewriter,
    server: ServerConfig,
    warnings: Vec<ConfigWarning>,
}

impl BuildConfig {
    pub(crate) fn new(
        root: PathBuf,
        plugins: PluginPipeline,
        public_dir: Option<PathBuf>,
        public_dir_policy: PublicDirPolicy,
        rewriter: PathRewriter,
        server: ServerConfig,
        warnings: Vec<ConfigWarning>,
    ) -> Self {
        Self {
            root,
            plugins,
            public_dir,
            public_dir_policy,
            rewriter,
            server,
            warnings,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn plugins(&self) -> &PluginPipeline {
        &self.plugins
    }

    /// Public directory as configured, relative to [`root`](Self::root).
    /// `None` when disabled with `publicDir = false`.
    pub fn public_dir(&self) -> Option<&Path> {
        self.public_dir.as_deref()
    }

    /// Public directory joined onto the project root.
    pub fn public_dir_path(&self) -> Option<PathBuf> {
        self.public_dir.as_ref().map(|dir| self.root.join(dir))
    }

    pub fn public_dir_policy(&self) -> PublicDirPolicy {
        self.public_dir_policy
    }

    /// Normalized base path, always starting and ending with `/`.
    pub fn base(&self) -> &str {
        self.rewriter.base()
    }

    pub fn rewriter(&self) -> &PathRewriter {
        &self.rewriter
    }

    pub fn server(&self) -> &ServerConfig {
        &self.server
    }

    pub fn warnings(&self) -> &[ConfigWarning] {
        &self.warnings
    }

    /// Serializable view for `kiln check` and diagnostics.
    pub fn summary(&self) -> ConfigSummary {
        ConfigSummary {
            root: self.root.clone(),
            plugins: self.plugins.names().into_iter().map(String::from).collect(),
            public_dir: self.public_dir.clone(),
            public_dir_policy: self.public_dir_policy,
            base: self.base().to_string(),
            server: self.server.clone(),
            warnings: self.warnings.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSummary {
    pub root: PathBuf,
    pub plugins: Vec<String>,
    pub public_dir: Option<PathBuf>,
    pub public_dir_policy: PublicDirPolicy,
    pub base: String,
    pub server: ServerConfig,
    pub warnings: Vec<ConfigWarning>,
}
