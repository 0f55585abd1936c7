//! Shared helpers for commands that resolve configuration.

use std::path::PathBuf;

use kiln_config::{BuildConfig, ConfigLoader, ConfigOverrides, ServerOverrides};
use tracing::debug;

use crate::cli::ConfigArgs;
use crate::error::{CliError, Result};

/// Resolve the project root: `--root` if given, else the current directory.
pub(crate) fn project_root(root: Option<&PathBuf>) -> Result<PathBuf> {
    let root = match root {
        Some(root) => std::path::absolute(root)?,
        None => std::env::current_dir()?,
    };

    if !root.is_dir() {
        return Err(CliError::InvalidArgument(format!(
            "project root {} is not a directory",
            root.display()
        )));
    }

    Ok(root)
}

/// Load and normalize configuration from file, environment and flags.
///
/// Nothing is bound or served here; any configuration error surfaces
/// before a socket is opened.
pub fn resolve_config(args: &ConfigArgs) -> Result<BuildConfig> {
    let root = project_root(args.root.as_ref())?;
    debug!(root = %root.display(), "resolving configuration");

    let config = ConfigLoader::new(&root)
        .config_file(args.config.clone())
        .mode(args.mode.clone())
        .overrides(ConfigOverrides {
            base: args.base.clone(),
            server: ServerOverrides {
                host: args.host.clone(),
                port: args.port,
            },
        })
        .resolve()?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn flags_override_file() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("kiln.toml"),
            "base = \"/file/\"\n[server]\nport = 3000\n",
        )
        .unwrap();

        let config = resolve_config(&ConfigArgs {
            root: Some(dir.path().to_path_buf()),
            base: Some("cli".to_string()),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(config.base(), "/cli/");
        assert_eq!(config.server().port, 3000);
    }

    #[test]
    fn missing_root_is_invalid_argument() {
        let dir = TempDir::new().unwrap();
        let err = resolve_config(&ConfigArgs {
            root: Some(dir.path().join("missing")),
            ..Default::default()
        })
        .unwrap_err();

        assert!(matches!(err, CliError::InvalidArgument(_)));
    }

    #[test]
    fn out_of_range_port_is_config_error() {
        let dir = TempDir::new().unwrap();
        let err = resolve_config(&ConfigArgs {
            root: Some(dir.path().to_path_buf()),
            port: Some(70000),
            ..Default::default()
        })
        .unwrap_err();

        assert!(matches!(
            err,
            CliError::Config(kiln_config::ConfigError::InvalidPort { .. })
        ));
    }
}
