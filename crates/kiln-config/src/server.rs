//! Development server configuration types.

use std::net::{IpAddr, Ipv6Addr};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 5173;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// IP literal, hostname, or wildcard address to bind.
    pub host: String,

    pub port: u16,

    /// Attach a permissive CORS layer.
    pub cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            cors: true,
        }
    }
}

impl ServerConfig {
    /// True for unspecified addresses (`0.0.0.0`, `::`) that listen on every interface.
    pub fn is_wildcard(&self) -> bool {
        self.host
            .parse::<IpAddr>()
            .is_ok_and(|ip| ip.is_unspecified())
    }

    /// `host:port`, bracketing IPv6 literals.
    pub fn display_addr(&self) -> String {
        if self.host.parse::<Ipv6Addr>().is_ok() {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

/// Validate a `server.host` value.
///
/// Accepts IPv4/IPv6 literals (IPv6 optionally in brackets) and DNS
/// hostnames. Brackets are stripped from the returned value.
pub fn parse_host(raw: &str) -> Result<String> {
    let invalid = |reason: &str| ConfigError::InvalidHost {
        value: raw.to_string(),
        reason: reason.to_string(),
    };

    if raw.trim().is_empty() {
        return Err(invalid("host cannot be empty"));
    }

    if let Some(inner) = raw.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        return inner
            .parse::<Ipv6Addr>()
            .map(|_| inner.to_string())
            .map_err(|_| invalid("bracketed hosts must be IPv6 literals"));
    }

    if raw.parse::<IpAddr>().is_ok() {
        return Ok(raw.to_string());
    }

    if raw.len() > 253 {
        return Err(invalid("hostname is longer than 253 characters"));
    }

    for label in raw.split('.') {
        if label.is_empty() {
            return Err(invalid("hostname contains an empty label"));
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err(invalid("hostname labels cannot start or end with '-'"));
        }
        if let Some(c) = label.chars().find(|c| !c.is_ascii_alphanumeric() && *c != '-') {
            return Err(invalid(&format!("hostname contains invalid character {:?}", c)));
        }
    }

    Ok(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let server = ServerConfig::default();
        assert_eq!(server.host, "localhost");
        assert_eq!(server.port, 5173);
        assert!(server.cors);
        assert!(!server.is_wildcard());
    }

    #[test]
    fn wildcard_detection() {
        for host in ["0.0.0.0", "::"] {
            let server = ServerConfig {
                host: host.to_string(),
                ..ServerConfig::default()
            };
            assert!(server.is_wildcard(), "{host}");
        }

        for host in ["127.0.0.1", "::1", "localhost", "dev.example.com"] {
            let server = ServerConfig {
                host: host.to_string(),
                ..ServerConfig::default()
            };
            assert!(!server.is_wildcard(), "{host}");
        }
    }

    #[test]
    fn display_addr_brackets_ipv6() {
        let server = ServerConfig {
            host: "::1".to_string(),
            port: 3000,
            cors: true,
        };
        assert_eq!(server.display_addr(), "[::1]:3000");
    }

    #[test]
    fn host_parsing() {
        assert_eq!(parse_host("0.0.0.0").unwrap(), "0.0.0.0");
        assert_eq!(parse_host("[::1]").unwrap(), "::1");
        assert_eq!(parse_host("my-box.local").unwrap(), "my-box.local");

        for bad in ["", " ", "exa mple", "-lead.dev", "a..b", "[127.0.0.1]", "host:80"] {
            assert!(
                matches!(parse_host(bad), Err(ConfigError::InvalidHost { .. })),
                "{bad:?}"
            );
        }
    }
}
