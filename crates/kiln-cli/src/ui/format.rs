//! Startup banner.

use std::net::SocketAddr;

use console::Term;
use kiln_config::BuildConfig;
use owo_colors::Style;

use super::messages::paint;

/// URLs announced when the server starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerUrls {
    pub local: String,
    /// Set when the server listens on every interface.
    pub network: Option<String>,
}

/// Compute the URLs for a server bound at `local_addr`.
pub fn server_urls(config: &BuildConfig, local_addr: SocketAddr) -> ServerUrls {
    let server = config.server();
    let base = config.base();
    let port = local_addr.port();

    if server.is_wildcard() {
        return ServerUrls {
            local: format!("http://localhost:{port}{base}"),
            network: Some(format!("http://{local_addr}{base}")),
        };
    }

    let host = if server.host.contains(':') {
        format!("[{}]", server.host)
    } else {
        server.host.clone()
    };

    ServerUrls {
        local: format!("http://{host}:{port}{base}"),
        network: None,
    }
}

/// Print the "server ready" banner to stderr.
pub fn print_server_banner(config: &BuildConfig, local_addr: SocketAddr) {
    let urls = server_urls(config, local_addr);
    let width = (Term::stderr().size().1 as usize).clamp(20, 60);
    let label = Style::new().bold();

    eprintln!();
    eprintln!("  {}", paint("kiln dev server ready", Style::new().green().bold()));
    eprintln!("  {}", "─".repeat(width));
    eprintln!(
        "  {}   {}",
        paint("Local:", label),
        paint(&urls.local, Style::new().cyan())
    );
    if let Some(network) = &urls.network {
        eprintln!(
            "  {} {} {}",
            paint("Network:", label),
            paint(network, Style::new().cyan()),
            paint("(all interfaces)", Style::new().yellow())
        );
    }
    if let Some(public) = config.public_dir() {
        eprintln!(
            "  {}  {}",
            paint("Public:", label),
            paint(&public.display().to_string(), Style::new().dimmed())
        );
    }
    if !config.plugins().is_empty() {
        eprintln!(
            "  {} {}",
            paint("Plugins:", label),
            paint(&config.plugins().names().join(", "), Style::new().dimmed())
        );
    }
    eprintln!();
}
