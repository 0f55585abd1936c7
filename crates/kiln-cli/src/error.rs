//! Error handling for the kiln CLI.
//!
//! Configuration failures come from `kiln-config` unchanged; everything the
//! development server can report is a [`ServerError`]. Both fold into
//! [`CliError`], which `main` turns into a miette report.

mod miette;

use std::path::PathBuf;

use thiserror::Error;

use crate::dev::ServerPhase;

pub use self::miette::cli_error_to_miette;

/// Top-level CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid or unloadable configuration
    #[error("Configuration error: {0}")]
    Config(#[from] kiln_config::ConfigError),

    /// Development server failures
    #[error(transparent)]
    Server(#[from] ServerError),

    /// Invalid command-line arguments or options
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// I/O errors from file system operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Development server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listening socket could not be acquired. Never retried.
    #[error("failed to bind {addr}: {source}")]
    BindFailed {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// `publicDirPolicy = "require"` and the directory does not exist
    #[error("public directory not found: {}", .path.display())]
    PublicDirMissing { path: PathBuf },

    /// Lifecycle request not allowed in the current phase
    #[error("cannot {action} server while it is {phase}")]
    InvalidState {
        action: &'static str,
        phase: ServerPhase,
    },

    /// The serve loop ended with an error
    #[error("server error: {message}")]
    Serve { message: String },
}

impl ServerError {
    /// True when binding failed because another socket holds the address.
    pub fn is_address_in_use(&self) -> bool {
        matches!(
            self,
            ServerError::BindFailed { source, .. }
                if source.kind() == std::io::ErrorKind::AddrInUse
        )
    }
}

/// Result type alias using `CliError` as the default error type.
pub type Result<T, E = CliError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn address_in_use_is_distinguished() {
        let err = ServerError::BindFailed {
            addr: "127.0.0.1:5173".to_string(),
            source: io::Error::from(io::ErrorKind::AddrInUse),
        };
        assert!(err.is_address_in_use());
        assert!(err.to_string().contains("127.0.0.1:5173"));

        let err = ServerError::BindFailed {
            addr: "127.0.0.1:80".to_string(),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };
        assert!(!err.is_address_in_use());
    }

    #[test]
    fn invalid_state_names_action_and_phase() {
        let err = ServerError::InvalidState {
            action: "start",
            phase: ServerPhase::Serving,
        };
        assert_eq!(err.to_string(), "cannot start server while it is serving");
    }

    #[test]
    fn cli_error_from_config_error() {
        let err: CliError = kiln_config::ConfigError::InvalidPort {
            value: "70000".to_string(),
        }
        .into();
        assert!(matches!(err, CliError::Config(_)));
        assert!(err.to_string().contains("70000"));
    }

    #[test]
    fn cli_error_from_server_error() {
        let err: CliError = ServerError::PublicDirMissing {
            path: PathBuf::from("/project/public"),
        }
        .into();
        assert!(matches!(err, CliError::Server(_)));
        assert!(err.to_string().contains("/project/public"));
    }
}
