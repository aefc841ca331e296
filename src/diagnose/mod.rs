//! Runs the enabled probes side by side and collects their results.
//!
//! ```rust,no_run
//! use netwhy::config::ProbeConfig;
//! use netwhy::diagnose::Diagnostics;
//!
//! #[tokio::main]
//! async fn main() -> netwhy::Result<()> {
//!     let config = ProbeConfig::new("8.8.8.8".to_string())
//!         .with_hostnames(vec!["google.com".to_string()])
//!         .with_url("https://example.com".to_string());
//!
//!     let report = Diagnostics::new(config)?.run().await;
//!     println!("loss: {:.1}%", report.latency().loss_percent);
//!     Ok(())
//! }
//! ```

use crate::config::ProbeConfig;
use crate::dns::{DnsProbe, DnsResult};
use crate::http::{HttpProbe, HttpResult};
use crate::network::{LatencyProbe, LatencyResult};
use crate::utils::{NetworkError, Result};
use serde::Serialize;
use std::future::Future;

/// Everything one diagnostic run measured. Built once by [`Diagnostics`],
/// read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticReport {
    latency: LatencyResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    dns: Option<DnsResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    http: Option<HttpResult>,
}

impl DiagnosticReport {
    pub fn new(latency: LatencyResult, dns: Option<DnsResult>, http: Option<HttpResult>) -> Self {
        Self { latency, dns, http }
    }

    pub fn latency(&self) -> &LatencyResult {
        &self.latency
    }

    pub fn dns(&self) -> Option<&DnsResult> {
        self.dns.as_ref()
    }

    pub fn http(&self) -> Option<&HttpResult> {
        self.http.as_ref()
    }

    /// A probe failed outright: no latency sample came back, every DNS
    /// lookup failed, or the HTTP request got no response.
    pub fn has_hard_failure(&self) -> bool {
        self.latency.loss_percent >= 100.0
            || self.dns.as_ref().is_some_and(|d| d.all_failed())
            || self.http.as_ref().is_some_and(|h| !h.is_success())
    }
}

#[derive(Debug, Clone)]
pub struct Diagnostics {
    config: ProbeConfig,
}

impl Diagnostics {
    /// Validates the configuration up front; nothing is probed if it is
    /// unusable.
    pub fn new(config: ProbeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    pub async fn run(&self) -> DiagnosticReport {
        let config = &self.config;

        let latency_probe = LatencyProbe::new(config.target.clone(), config.port, config.count)
            .with_timeout(config.timeout)
            .with_icmp_fallback(config.icmp_fallback);

        let dns = async {
            if config.hostnames.is_empty() {
                return None;
            }
            let probe = DnsProbe::new(config.hostnames.clone()).with_timeout(config.timeout);
            Some(probe.run().await)
        };

        let http = async {
            let Some(url) = config.url.as_ref() else {
                return None;
            };
            let probe = HttpProbe::new(url.clone()).with_timeout(config.timeout);
            Some(probe.run().await)
        };

        log::info!(
            "Diagnosing {}:{} ({} attempts, {} DNS names, HTTP {})",
            config.target,
            config.port,
            config.count,
            config.hostnames.len(),
            config.url.as_deref().unwrap_or("disabled")
        );

        let (latency, dns, http) = tokio::join!(latency_probe.run(), dns, http);
        DiagnosticReport::new(latency, dns, http)
    }

    /// Like [`run`](Self::run) but gives up as soon as `shutdown` completes.
    /// In-flight probes are dropped, which closes their sockets and kills any
    /// `ping` children; nothing partial is returned.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<DiagnosticReport>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            report = self.run() => Ok(report),
            _ = shutdown => {
                log::warn!("Diagnostics interrupted, discarding partial results");
                Err(NetworkError::Cancelled)
            }
        }
    }
}
