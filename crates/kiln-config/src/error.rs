//! Error types for configuration loading and normalization.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid base path '{value}': {reason}")]
    InvalidBasePath { value: String, reason: String },

    #[error("invalid port '{value}': expected an integer between 1 and 65535")]
    InvalidPort { value: String },

    #[error("invalid server.host '{value}': {reason}")]
    InvalidHost { value: String, reason: String },

    #[error("unknown config key '{key}'")]
    UnknownKey { key: String },

    #[error("invalid value for '{field}': {value} ({hint})")]
    InvalidValue {
        field: String,
        value: String,
        hint: String,
    },

    #[error("unknown plugin '{name}' (available: {})", available_list(.available))]
    UnknownPlugin {
        name: String,
        available: Vec<String>,
    },

    #[error("invalid plugin '{name}': {reason}")]
    InvalidPlugin { name: String, reason: String },

    // Config file errors
    #[error("unsupported configuration format: {}", .path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("failed to parse {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    /// Name of the config field the error refers to, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            ConfigError::InvalidBasePath { .. } => Some("base"),
            ConfigError::InvalidPort { .. } => Some("server.port"),
            ConfigError::InvalidHost { .. } => Some("server.host"),
            ConfigError::UnknownKey { key } => Some(key),
            ConfigError::InvalidValue { field, .. } => Some(field),
            ConfigError::UnknownPlugin { .. } | ConfigError::InvalidPlugin { .. } => {
                Some("plugins")
            }
            _ => None,
        }
    }
}

fn available_list(names: &[String]) -> String {
    if names.is_empty() {
        "none registered".to_string()
    } else {
        names.join(", ")
    }
}
