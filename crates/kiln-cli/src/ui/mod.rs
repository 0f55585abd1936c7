//! Terminal output for operators.
//!
//! Status lines go to stderr so stdout stays clean for machine-readable
//! output such as `kiln check`. Color is decided once by [`init_colors`].
//!
//! # Examples
//!
//! ```no_run
//! use kiln_cli::ui;
//!
//! ui::init_colors(false);
//! ui::success("Configuration is valid");
//! ui::warning("public directory not found");
//! ```

mod format;
mod messages;

use std::sync::atomic::{AtomicBool, Ordering};

pub use format::{print_server_banner, server_urls, ServerUrls};
pub use messages::{error, info, success, warning};

static COLORS: AtomicBool = AtomicBool::new(false);

/// Decide color support from flags, environment and terminal.
///
/// `NO_COLOR` beats `FORCE_COLOR`, which beats TTY detection.
pub fn init_colors(no_color: bool) {
    let enabled = !no_color
        && color_choice(
            std::env::var_os("NO_COLOR").is_some(),
            std::env::var_os("FORCE_COLOR").is_some(),
            console::user_attended_stderr(),
        );
    COLORS.store(enabled, Ordering::Relaxed);
}

pub(crate) fn colors_enabled() -> bool {
    COLORS.load(Ordering::Relaxed)
}

fn color_choice(no_color: bool, force_color: bool, attended: bool) -> bool {
    if no_color {
        return false;
    }
    force_color || attended
}
