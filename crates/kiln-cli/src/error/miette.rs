//! Miette diagnostic conversion for CLI errors.

use kiln_config::ConfigError;
use miette::Report;

use crate::error::{CliError, ServerError};

/// Convert CliError to miette Report
pub fn cli_error_to_miette(err: CliError) -> Report {
    match err {
        CliError::Config(e) => config_error_to_miette(e),
        CliError::Server(e) => server_error_to_miette(e),
        _ => miette::miette!("{}", err),
    }
}

/// Convert ConfigError to miette Report
pub fn config_error_to_miette(err: ConfigError) -> Report {
    let help = match &err {
        ConfigError::InvalidBasePath { .. } => {
            "base must be a path such as \"/\" or \"/app/\"".to_string()
        }
        ConfigError::InvalidPort { .. } => {
            "set server.port (or --port) to an integer between 1 and 65535".to_string()
        }
        ConfigError::UnknownKey { key } => {
            format!("remove '{key}' or check its spelling")
        }
        ConfigError::UnknownPlugin { available, .. } if !available.is_empty() => {
            format!("available plugins: {}", available.join(", "))
        }
        ConfigError::InvalidValue { hint, .. } => hint.clone(),
        _ => return miette::miette!("Configuration error: {}", err),
    };

    miette::miette!(help = help, "Configuration error: {}", err)
}

/// Convert ServerError to miette Report
pub fn server_error_to_miette(err: ServerError) -> Report {
    match &err {
        e if e.is_address_in_use() => miette::miette!(
            help = "another process is already listening there; stop it or choose a different --port",
            "{}",
            err
        ),
        ServerError::BindFailed { .. } => miette::miette!(
            help = "check that the host is a local address and the port is allowed",
            "{}",
            err
        ),
        ServerError::PublicDirMissing { .. } => miette::miette!(
            help = "create the directory, point publicDir elsewhere, or set publicDirPolicy = \"lenient\"",
            "{}",
            err
        ),
        _ => miette::miette!("{}", err),
    }
}
