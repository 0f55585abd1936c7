//! Status message functions for terminal output.

use owo_colors::{OwoColorize, Style};

use super::colors_enabled;

pub(crate) fn paint(text: &str, style: Style) -> String {
    if colors_enabled() {
        text.style(style).to_string()
    } else {
        text.to_string()
    }
}

fn status(symbol: &str, symbol_style: Style, message: &str, message_style: Style) {
    eprintln!(
        "{} {}",
        paint(symbol, symbol_style),
        paint(message, message_style)
    );
}

/// Print a success message to stderr.
pub fn success(message: &str) {
    status("✓", Style::new().green().bold(), message, Style::new());
}

/// Print an info message to stderr.
pub fn info(message: &str) {
    status("ℹ", Style::new().blue().bold(), message, Style::new());
}

/// Print a warning message to stderr.
///
/// ```no_run
/// use kiln_cli::ui::warning;
///
/// warning("server.host is 0.0.0.0: reachable from the network");
/// ```
pub fn warning(message: &str) {
    status("⚠", Style::new().yellow().bold(), message, Style::new().yellow());
}

/// Print an error message to stderr.
pub fn error(message: &str) {
    status("✗", Style::new().red().bold(), message, Style::new().red());
}
