//! Command implementations for the kiln CLI.
//!
//! - [`dev`] - Development server
//! - [`check`] - Configuration validation
//!
//! Each command provides an `execute` function that takes the parsed
//! command arguments and returns a Result.

pub mod check;
pub mod dev;
pub(crate) mod utils;

// Re-export execute functions for convenience
pub use check::execute as check_execute;
pub use dev::execute as dev_execute;
pub use utils::resolve_config;
