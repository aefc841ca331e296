//! Probe configuration.
//!
//! A [`ProbeConfig`] is assembled once with builder methods, checked with
//! [`ProbeConfig::validate`] and then only read by the probes.
//!
//! ```rust
//! use netwhy::config::ProbeConfig;
//! use std::time::Duration;
//!
//! let config = ProbeConfig::new("1.1.1.1".to_string())
//!     .with_port(53)
//!     .with_count(3)
//!     .with_hostnames(vec!["example.com".to_string()])
//!     .with_timeout(Duration::from_secs(2));
//!
//! assert!(config.validate().is_ok());
//! ```

use crate::utils::{NetworkError, Result};
use reqwest::Url;
use std::net::IpAddr;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 443;
pub const DEFAULT_COUNT: u32 = 4;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub target: String,
    pub port: u16,
    pub count: u32,
    pub hostnames: Vec<String>,
    pub url: Option<String>,
    pub timeout: Duration,
    pub icmp_fallback: bool,
}

impl ProbeConfig {
    pub fn new(target: String) -> Self {
        Self {
            target,
            port: DEFAULT_PORT,
            count: DEFAULT_COUNT,
            hostnames: Vec::new(),
            url: None,
            timeout: DEFAULT_TIMEOUT,
            icmp_fallback: true,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    pub fn with_hostnames(mut self, hostnames: Vec<String>) -> Self {
        self.hostnames = hostnames;
        self
    }

    pub fn with_url(mut self, url: String) -> Self {
        self.url = Some(url);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_icmp_fallback(mut self, enabled: bool) -> Self {
        self.icmp_fallback = enabled;
        self
    }

    /// Rejects configurations that cannot produce a meaningful run.
    ///
    /// Nothing touches the network here; a target that is well formed but
    /// does not resolve is reported by the latency probe, not by validation.
    pub fn validate(&self) -> Result<()> {
        if self.count < 1 {
            return Err(invalid("attempt count must be at least 1"));
        }
        if self.timeout.is_zero() {
            return Err(invalid("timeout must be greater than zero"));
        }
        if self.target.parse::<IpAddr>().is_err() && !is_valid_hostname(&self.target) {
            return Err(invalid(&format!("'{}' is not a valid host name or IP address", self.target)));
        }
        if let Some(hostname) = self.hostnames.iter().find(|h| h.trim().is_empty()) {
            return Err(invalid(&format!("empty DNS host name in list: {:?}", hostname)));
        }
        if let Some(url) = &self.url {
            parse_probe_url(url)?;
        }
        Ok(())
    }
}

fn invalid(message: &str) -> NetworkError {
    NetworkError::InvalidConfig(message.to_string())
}

/// Parses the HTTP probe URL, assuming `http://` when no scheme is given.
pub fn parse_probe_url(raw: &str) -> Result<Url> {
    let candidate = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("http://{raw}")
    };

    let url = Url::parse(&candidate).map_err(|e| invalid(&format!("invalid URL '{raw}': {e}")))?;

    match url.scheme() {
        "http" | "https" => {}
        other => return Err(invalid(&format!("unsupported URL scheme '{other}'"))),
    }
    if url.host_str().is_none() {
        return Err(invalid(&format!("URL '{raw}' has no host")));
    }

    Ok(url)
}

fn is_valid_hostname(name: &str) -> bool {
    let name = name.strip_suffix('.').unwrap_or(name);
    if name.is_empty() || name.len() > 253 {
        return false;
    }

    name.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ProbeConfig::new("8.8.8.8".to_string());
        assert_eq!(config.port, 443);
        assert_eq!(config.count, 4);
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert!(config.hostnames.is_empty());
        assert!(config.url.is_none());
        assert!(config.icmp_fallback);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_count_rejected() {
        let config = ProbeConfig::new("8.8.8.8".to_string()).with_count(0);
        assert!(matches!(config.validate(), Err(NetworkError::InvalidConfig(_))));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = ProbeConfig::new("8.8.8.8".to_string()).with_timeout(Duration::ZERO);
        assert!(matches!(config.validate(), Err(NetworkError::InvalidConfig(_))));
    }

    #[test]
    fn test_target_syntax() {
        for good in ["example.com", "localhost", "::1", "192.0.2.1", "my-host.lan."] {
            assert!(
                ProbeConfig::new(good.to_string()).validate().is_ok(),
                "{good} should be accepted"
            );
        }
        for bad in ["", "bad host", "-leading.com", "a..b", "http://example.com"] {
            assert!(
                ProbeConfig::new(bad.to_string()).validate().is_err(),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_blank_hostname_rejected() {
        let config = ProbeConfig::new("8.8.8.8".to_string())
            .with_hostnames(vec!["google.com".to_string(), "  ".to_string()]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_url_scheme_defaults_to_http() {
        let url = parse_probe_url("example.com/health").unwrap();
        assert_eq!(url.scheme(), "http");
        assert_eq!(url.host_str(), Some("example.com"));
    }

    #[test]
    fn test_url_scheme_must_be_http() {
        let config = ProbeConfig::new("8.8.8.8".to_string()).with_url("ftp://example.com".to_string());
        assert!(matches!(config.validate(), Err(NetworkError::InvalidConfig(_))));
    }
}
