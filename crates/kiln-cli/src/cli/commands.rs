use clap::{Args, Subcommand};
use std::path::PathBuf;

/// Available kiln subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the development server
    ///
    /// Resolves the configuration, binds `server.host:server.port` and serves
    /// the public directory and project modules under the base path until
    /// Ctrl+C.
    Dev(DevArgs),

    /// Validate configuration
    ///
    /// Resolves the configuration exactly as `dev` would and prints the
    /// result as JSON without opening any socket.
    Check(CheckArgs),
}

/// Options shared by every command that resolves configuration.
///
/// Precedence: these flags > `KILN_*` environment variables > config file.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Project root (defaults to the current directory)
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Path to a kiln.toml or kiln.config.json
    ///
    /// Relative paths resolve against the project root. Without this flag
    /// kiln.toml, kiln.config.json and the "kiln" field of package.json are
    /// tried in that order.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Apply the `profiles.<MODE>` table from the config file
    #[arg(short, long, value_name = "MODE")]
    pub mode: Option<String>,

    /// Host to bind (overrides server.host)
    #[arg(long, value_name = "HOST")]
    pub host: Option<String>,

    /// Port to bind (overrides server.port)
    ///
    /// Range-checked during config resolution so out-of-range values are
    /// reported like any other config error.
    #[arg(short, long, value_name = "PORT")]
    pub port: Option<u32>,

    /// Deployment base path (overrides base)
    #[arg(long, value_name = "BASE")]
    pub base: Option<String>,
}

/// Arguments for the dev command
#[derive(Args, Debug)]
pub struct DevArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Seconds in-flight requests may take to finish on shutdown
    #[arg(long, default_value = "5", value_name = "SECONDS")]
    pub grace_period: u64,
}

/// Arguments for the check command
#[derive(Args, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
}
