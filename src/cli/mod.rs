use crate::config::{ProbeConfig, DEFAULT_COUNT, DEFAULT_PORT};
use crate::summary::Thresholds;
use crate::utils::{NetworkError, Result};
use clap::Parser;
use std::time::Duration;

pub const DEFAULT_TARGET: &str = "8.8.8.8";
pub const DEFAULT_DNS_HOSTNAMES: [&str; 2] = ["google.com", "cloudflare.com"];

#[derive(Parser, Debug)]
#[command(name = "netwhy")]
#[command(about = "Find out whether a slow or broken connection is the local link, DNS or the remote host")]
#[command(version)]
pub struct Cli {
    /// Host or IP address for the latency check
    #[arg(long, value_name = "HOST", default_value = DEFAULT_TARGET)]
    pub target: String,

    /// TCP port used for connect timing
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Number of latency attempts
    #[arg(short, long, value_name = "N", default_value_t = DEFAULT_COUNT)]
    pub count: u32,

    /// Host name to resolve (repeatable, defaults to google.com and cloudflare.com)
    #[arg(long = "dns", value_name = "HOSTNAME")]
    pub dns: Vec<String>,

    /// Skip the DNS checks, overriding any --dns
    #[arg(long)]
    pub no_dns: bool,

    /// URL for the HTTP reachability check
    #[arg(long = "http", value_name = "URL")]
    pub http: Option<String>,

    /// Timeout for every individual check, in seconds
    #[arg(short, long, value_name = "SECONDS", default_value_t = 5.0)]
    pub timeout: f64,

    /// Average round trip above which the link counts as slow, in milliseconds
    #[arg(long, value_name = "MS", default_value_t = 200)]
    pub latency_threshold: u64,

    /// Never fall back to ICMP when TCP connects are refused
    #[arg(long)]
    pub no_icmp: bool,

    /// Only print the summary
    #[arg(long)]
    pub summary: bool,

    #[arg(long)]
    pub json: bool,

    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn hostnames(&self) -> Vec<String> {
        if self.no_dns {
            Vec::new()
        } else if self.dns.is_empty() {
            DEFAULT_DNS_HOSTNAMES.iter().map(|h| h.to_string()).collect()
        } else {
            self.dns.clone()
        }
    }

    /// Builds the probe configuration. Validation happens when it is handed
    /// to [`Diagnostics::new`](crate::diagnose::Diagnostics::new).
    pub fn to_config(&self) -> Result<ProbeConfig> {
        let timeout = Duration::try_from_secs_f64(self.timeout).map_err(|_| {
            NetworkError::InvalidConfig(format!("timeout must be a positive number of seconds, got {}", self.timeout))
        })?;

        let mut config = ProbeConfig::new(self.target.clone())
            .with_port(self.port)
            .with_count(self.count)
            .with_hostnames(self.hostnames())
            .with_timeout(timeout)
            .with_icmp_fallback(!self.no_icmp);

        if let Some(url) = &self.http {
            config = config.with_url(url.clone());
        }

        Ok(config)
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds::default().with_high_latency(Duration::from_millis(self.latency_threshold))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnose::Diagnostics;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["netwhy"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&[]);
        let config = cli.to_config().unwrap();
        assert_eq!(config.target, "8.8.8.8");
        assert_eq!(config.port, 443);
        assert_eq!(config.count, 4);
        assert_eq!(config.hostnames, vec!["google.com", "cloudflare.com"]);
        assert!(config.url.is_none());
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert!(config.icmp_fallback);
        assert_eq!(cli.thresholds().high_latency, Duration::from_millis(200));
    }

    #[test]
    fn test_explicit_options() {
        let cli = parse(&[
            "--target", "example.com", "--count", "10", "--dns", "a.example", "--dns", "b.example",
            "--http", "https://example.com", "--timeout", "1.5", "--no-icmp",
        ]);
        let config = cli.to_config().unwrap();
        assert_eq!(config.target, "example.com");
        assert_eq!(config.count, 10);
        assert_eq!(config.hostnames, vec!["a.example", "b.example"]);
        assert_eq!(config.url.as_deref(), Some("https://example.com"));
        assert_eq!(config.timeout, Duration::from_millis(1500));
        assert!(!config.icmp_fallback);
    }

    #[test]
    fn test_no_dns_disables_hostnames() {
        let config = parse(&["--no-dns"]).to_config().unwrap();
        assert!(config.hostnames.is_empty());
    }

    #[test]
    fn test_no_dns_wins_over_dns() {
        let cli = parse(&["--dns", "a.example", "--no-dns"]);
        assert!(cli.hostnames().is_empty());
        assert!(cli.to_config().unwrap().hostnames.is_empty());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let build = |args: &[&str]| parse(args).to_config().and_then(Diagnostics::new);
        assert!(matches!(build(&["--count", "0"]), Err(NetworkError::InvalidConfig(_))));
        assert!(matches!(build(&["--timeout", "0"]), Err(NetworkError::InvalidConfig(_))));
        assert!(matches!(build(&["--timeout", "NaN"]), Err(NetworkError::InvalidConfig(_))));
        assert!(build(&[]).is_ok());
    }
}
