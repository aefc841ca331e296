use crate::utils::{measure_time, serialize_ms};
use futures::future::join_all;
use hickory_resolver::config::*;
use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use hickory_resolver::proto::op::ResponseCode;
use hickory_resolver::system_conf;
use hickory_resolver::TokioAsyncResolver;
use serde::Serialize;
use std::net::IpAddr;
use std::time::Duration;
use tokio::time::timeout;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DnsErrorKind {
    Timeout,
    Nxdomain,
    ServerFailure,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DnsEntry {
    pub hostname: String,
    pub resolved: bool,
    #[serde(rename = "duration_ms", serialize_with = "serialize_ms")]
    pub duration: Duration,
    pub address: Option<IpAddr>,
    pub addresses: Vec<IpAddr>,
    pub error: Option<DnsErrorKind>,
    pub message: Option<String>,
}

impl DnsEntry {
    pub fn resolved(hostname: String, duration: Duration, addresses: Vec<IpAddr>) -> Self {
        Self {
            hostname,
            resolved: true,
            duration,
            address: addresses.first().copied(),
            addresses,
            error: None,
            message: None,
        }
    }

    pub fn failed(hostname: String, duration: Duration, kind: DnsErrorKind, message: String) -> Self {
        Self {
            hostname,
            resolved: false,
            duration,
            address: None,
            addresses: Vec::new(),
            error: Some(kind),
            message: Some(message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DnsResult {
    pub entries: Vec<DnsEntry>,
    pub success_ratio: f64,
}

impl DnsResult {
    pub fn from_entries(entries: Vec<DnsEntry>) -> Self {
        let success_ratio = if entries.is_empty() {
            0.0
        } else {
            entries.iter().filter(|e| e.resolved).count() as f64 / entries.len() as f64
        };
        Self {
            entries,
            success_ratio,
        }
    }

    pub fn resolved_count(&self) -> usize {
        self.entries.iter().filter(|e| e.resolved).count()
    }

    pub fn all_resolved(&self) -> bool {
        self.entries.iter().all(|e| e.resolved)
    }

    pub fn all_failed(&self) -> bool {
        self.entries.iter().all(|e| !e.resolved)
    }

    pub fn failed_hostnames(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| !e.resolved)
            .map(|e| e.hostname.as_str())
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct DnsProbe {
    pub hostnames: Vec<String>,
    pub timeout: Duration,
}

impl DnsProbe {
    pub fn new(hostnames: Vec<String>) -> Self {
        Self {
            hostnames,
            timeout: Duration::from_secs(5),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Resolves every hostname concurrently; one failing lookup never
    /// affects the others.
    pub async fn run(&self) -> DnsResult {
        let resolver = system_resolver(self.timeout);
        let lookups = self
            .hostnames
            .iter()
            .map(|hostname| self.resolve(&resolver, hostname));
        DnsResult::from_entries(join_all(lookups).await)
    }

    async fn resolve(&self, resolver: &TokioAsyncResolver, hostname: &str) -> DnsEntry {
        let (duration, result) =
            measure_time(|| timeout(self.timeout, resolver.lookup_ip(hostname))).await;

        match result {
            Ok(Ok(lookup)) => {
                let mut addresses: Vec<IpAddr> = Vec::new();
                for ip in lookup.iter() {
                    if !addresses.contains(&ip) {
                        addresses.push(ip);
                    }
                }
                log::info!("Resolved {} in {:?}: {:?}", hostname, duration, addresses);
                DnsEntry::resolved(hostname.to_string(), duration, addresses)
            }
            Ok(Err(e)) => {
                log::warn!("DNS lookup for {} failed: {}", hostname, e);
                DnsEntry::failed(hostname.to_string(), duration, classify_resolve_error(&e), e.to_string())
            }
            Err(_) => DnsEntry::failed(
                hostname.to_string(),
                duration,
                DnsErrorKind::Timeout,
                format!("no answer within {:?}", self.timeout),
            ),
        }
    }
}

fn classify_resolve_error(error: &ResolveError) -> DnsErrorKind {
    match error.kind() {
        ResolveErrorKind::Timeout => DnsErrorKind::Timeout,
        ResolveErrorKind::NoRecordsFound { response_code, .. } => classify_response_code(*response_code),
        _ => DnsErrorKind::Other,
    }
}

pub fn classify_response_code(code: ResponseCode) -> DnsErrorKind {
    match code {
        ResponseCode::NXDomain => DnsErrorKind::Nxdomain,
        ResponseCode::ServFail | ResponseCode::Refused => DnsErrorKind::ServerFailure,
        _ => DnsErrorKind::Other,
    }
}

/// Resolver using the system name servers without search domains or
/// retries, so every lookup is a single timed query.
pub fn system_resolver(timeout: Duration) -> TokioAsyncResolver {
    let (config, mut opts) = match system_conf::read_system_conf() {
        Ok((config, opts)) => {
            let mut clean_config = ResolverConfig::new();
            for name_server in config.name_servers() {
                clean_config.add_name_server(name_server.clone());
            }
            (clean_config, opts)
        }
        Err(e) => {
            log::warn!("Could not read system DNS config ({}), using defaults", e);
            (ResolverConfig::default(), ResolverOpts::default())
        }
    };

    opts.ndots = 0;
    opts.timeout = timeout;
    opts.attempts = 1;

    log::debug!(
        "DNS resolver: {} name servers, timeout={:?}",
        config.name_servers().len(),
        opts.timeout
    );

    TokioAsyncResolver::tokio(config, opts)
}
