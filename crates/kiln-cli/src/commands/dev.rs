//! Development server command implementation.
//!
//! Resolve configuration, bind, serve until Ctrl+C, then shut down
//! gracefully. Configuration errors abort before any socket is opened.

use std::sync::Arc;
use std::time::Duration;

use tokio::signal;

use crate::cli::DevArgs;
use crate::commands::utils;
use crate::dev::{DevServer, ServerPhase};
use crate::error::Result;
use crate::ui;

/// Execute the dev command.
///
/// # Errors
///
/// Returns errors for invalid configuration, a missing required public
/// directory, and bind failures (never retried on another port).
pub async fn execute(args: DevArgs) -> Result<()> {
    let config = Arc::new(utils::resolve_config(&args.config)?);

    ui::info(&format!("Project root: {}", config.root().display()));

    let server = DevServer::from_config(config.clone())
        .with_grace_period(Duration::from_secs(args.grace_period));
    let controller = server.controller();

    let handle = server.start().await?;
    ui::print_server_banner(&config, handle.local_addr());
    ui::info("Press Ctrl+C to stop");

    tokio::select! {
        result = signal::ctrl_c() => {
            result?;
            ui::info("Shutting down development server...");
        }
        phase = controller.wait_for(ServerPhase::Stopped) => {
            ui::warning(&format!("Server task ended unexpectedly ({phase})"));
        }
    }

    if let Err(err) = handle.stop().await {
        ui::error(&format!("Development server did not shut down cleanly: {err}"));
        return Err(err.into());
    }

    ui::success("Development server stopped");
    Ok(())
}
