//! Check command implementation.
//!
//! Resolves configuration without binding anything and prints the resolved
//! values as JSON on stdout.

use kiln_config::PublicDirPolicy;

use crate::cli::CheckArgs;
use crate::commands::utils;
use crate::error::{Result, ServerError};
use crate::ui;

/// Execute the check command.
///
/// # Errors
///
/// Returns configuration errors, and `PublicDirMissing` when
/// `publicDirPolicy = "require"` and the directory does not exist.
pub async fn execute(args: CheckArgs) -> Result<()> {
    let config = utils::resolve_config(&args.config)?;

    if let Some(path) = config.public_dir_path().filter(|path| !path.is_dir()) {
        match config.public_dir_policy() {
            PublicDirPolicy::Require => {
                return Err(ServerError::PublicDirMissing { path }.into());
            }
            PublicDirPolicy::Lenient => {
                ui::warning(&format!(
                    "public directory {} does not exist; nothing will be served from it",
                    path.display()
                ));
            }
        }
    }

    println!("{}", serde_json::to_string_pretty(&config.summary())?);

    for warning in config.warnings() {
        ui::warning(&warning.to_string());
    }

    ui::success("Configuration is valid");
    Ok(())
}
