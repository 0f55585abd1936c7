//! Kiln CLI - build configuration resolution and development server.
//!
//! # Architecture
//!
//! - [`cli`] - Argument parsing with clap
//! - [`commands`] - `dev` and `check`
//! - [`dev`] - Server lifecycle, routing and module resolution
//! - [`error`] - Error types and miette conversion
//! - [`logger`] - Structured logging with tracing
//! - [`ui`] - Status lines and the startup banner
//!
//! Configuration itself lives in `kiln-config`.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use kiln_cli::dev::DevServer;
//! use kiln_config::ConfigLoader;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Arc::new(ConfigLoader::new(".").resolve()?);
//! let server = DevServer::from_config(config);
//! let handle = server.start().await?;
//! println!("listening on {}", handle.local_addr());
//! handle.stop().await?;
//! # Ok(())
//! # }
//! ```

// Public modules
pub mod cli;
pub mod commands;
pub mod dev;
pub mod error;
pub mod logger;
pub mod ui;

// Re-export commonly used types
pub use error::{CliError, Result, ServerError};
