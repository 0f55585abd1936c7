pub mod base;
pub mod config;
pub mod discovery;
pub mod error;
pub mod loading;
pub mod normalize;
pub mod plugin;
pub mod server;

// Re-export main types
pub use base::{normalize_base, BaseMatch, PathRewriter};
pub use config::{BuildConfig, ConfigSummary, ConfigWarning, PublicDirPolicy};
pub use error::{ConfigError, Result};
pub use normalize::ConfigNormalizer;
pub use plugin::{
    DefinePlugin, Hook, Plugin, PluginError, PluginFactory, PluginPipeline, PluginRegistry,
    PluginSpec,
};
pub use server::{parse_host, ServerConfig, DEFAULT_HOST, DEFAULT_PORT};

// Re-export discovery and loading
pub use discovery::{ConfigDiscovery, JSON_CONFIG, TOML_CONFIG};
pub use loading::{ConfigLoader, ConfigOverrides, ServerOverrides, ENV_PREFIX};
