//! Command-line interface definition for kiln.
//!
//! # Command Structure
//!
//! - `kiln dev` - Resolve configuration and run the development server
//! - `kiln check` - Resolve configuration and print it as JSON

mod commands;
mod tests;

use clap::Parser;

pub use commands::{CheckArgs, Command, ConfigArgs, DevArgs};

/// Kiln - build configuration and development server
#[derive(Parser, Debug)]
#[command(
    name = "kiln",
    version,
    about = "Build configuration resolution and development server",
    long_about = "Kiln turns a declarative build configuration into a validated,\n\
                  resolved configuration and serves the project locally under its\n\
                  deployment base path."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}
