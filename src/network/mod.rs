//! Latency and loss measurement.
//!
//! The probe times `count` TCP connection attempts against the target. When
//! every attempt is refused or errors out, TCP is treated as categorically
//! blocked and the attempts are re-run as ICMP echoes through the system
//! `ping` utility, if one is available.
//!
//! ```rust,no_run
//! use netwhy::network::{LatencyProbe, ProbeMethod};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let probe = LatencyProbe::new("1.1.1.1".to_string(), 443, 4)
//!         .with_timeout(Duration::from_secs(2));
//!     let result = probe.run().await;
//!
//!     if result.method == ProbeMethod::TcpConnect {
//!         println!("loss {:.1}%", result.loss_percent);
//!     }
//! }
//! ```

use crate::utils::{serialize_opt_ms, NetworkError, Result};
use serde::Serialize;
use std::net::IpAddr;
use std::time::Duration;
use tokio::time::timeout;

pub mod icmp;
pub mod tcp;

pub use icmp::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProbeMethod {
    TcpConnect,
    IcmpFallback,
}

/// Whether the ICMP fallback came into play for a measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FallbackStatus {
    /// TCP produced at least one success or timeout.
    NotNeeded,
    Used,
    /// TCP was blocked but no ICMP facility could be used.
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AttemptOutcome {
    Success,
    Timeout,
    Refused,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatencySample {
    pub attempt: u32,
    pub outcome: AttemptOutcome,
    #[serde(rename = "rtt_ms", serialize_with = "serialize_opt_ms")]
    pub rtt: Option<Duration>,
}

impl LatencySample {
    pub fn success(attempt: u32, rtt: Duration) -> Self {
        Self {
            attempt,
            outcome: AttemptOutcome::Success,
            rtt: Some(rtt),
        }
    }

    pub fn failed(attempt: u32, outcome: AttemptOutcome) -> Self {
        debug_assert!(outcome != AttemptOutcome::Success);
        Self {
            attempt,
            outcome,
            rtt: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatencyResult {
    pub target: String,
    /// Absent when the samples come from ICMP.
    pub port: Option<u16>,
    pub method: ProbeMethod,
    pub fallback: FallbackStatus,
    pub samples: Vec<LatencySample>,
    #[serde(rename = "min_ms", serialize_with = "serialize_opt_ms")]
    pub min: Option<Duration>,
    #[serde(rename = "avg_ms", serialize_with = "serialize_opt_ms")]
    pub avg: Option<Duration>,
    #[serde(rename = "max_ms", serialize_with = "serialize_opt_ms")]
    pub max: Option<Duration>,
    pub loss_percent: f64,
}

impl LatencyResult {
    pub fn from_samples(
        target: String,
        port: Option<u16>,
        method: ProbeMethod,
        fallback: FallbackStatus,
        samples: Vec<LatencySample>,
    ) -> Self {
        let rtts: Vec<Duration> = samples.iter().filter_map(|s| s.rtt).collect();

        let min = rtts.iter().min().copied();
        let max = rtts.iter().max().copied();
        let avg = if rtts.is_empty() {
            None
        } else {
            Some(rtts.iter().sum::<Duration>() / rtts.len() as u32)
        };

        let loss_percent = if samples.is_empty() {
            100.0
        } else {
            (samples.len() - rtts.len()) as f64 / samples.len() as f64 * 100.0
        };

        Self {
            target,
            port,
            method,
            fallback,
            samples,
            min,
            avg,
            max,
            loss_percent,
        }
    }

    pub fn successful_attempts(&self) -> usize {
        self.samples.iter().filter(|s| s.rtt.is_some()).count()
    }
}

/// True when TCP connect is categorically blocked: every attempt was refused
/// or failed outright. A single timeout or success keeps us on TCP.
pub fn tcp_blocked(samples: &[LatencySample]) -> bool {
    !samples.is_empty()
        && samples
            .iter()
            .all(|s| matches!(s.outcome, AttemptOutcome::Refused | AttemptOutcome::Error))
}

#[derive(Debug, Clone)]
pub struct LatencyProbe {
    pub target: String,
    pub port: u16,
    pub count: u32,
    pub timeout: Duration,
    pub icmp_fallback: bool,
}

impl LatencyProbe {
    pub fn new(target: String, port: u16, count: u32) -> Self {
        Self {
            target,
            port,
            count,
            timeout: Duration::from_secs(5),
            icmp_fallback: true,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_icmp_fallback(mut self, enabled: bool) -> Self {
        self.icmp_fallback = enabled;
        self
    }

    pub async fn run(&self) -> LatencyResult {
        let ip = match self.resolve_target().await {
            Ok(ip) => Some(ip),
            Err(e) => {
                log::warn!("Could not resolve latency target {}: {}", self.target, e);
                None
            }
        };

        let mut samples = Vec::with_capacity(self.count as usize);
        for attempt in 1..=self.count {
            let sample = match ip {
                Some(ip) => self.tcp_attempt(attempt, ip).await,
                None => LatencySample::failed(attempt, AttemptOutcome::Error),
            };
            log::debug!("TCP attempt #{} to {}: {:?}", attempt, self.target, sample.outcome);
            samples.push(sample);
        }

        if !tcp_blocked(&samples) {
            return self.tcp_result(FallbackStatus::NotNeeded, samples);
        }

        log::info!(
            "All {} TCP attempts to {}:{} were refused or failed, trying ICMP",
            self.count,
            self.target,
            self.port
        );

        let support = if self.icmp_fallback {
            IcmpSupport::detect(ip)
        } else {
            IcmpSupport::Unavailable("ICMP fallback disabled".to_string())
        };

        match self.icmp_samples(&support, ip).await {
            Ok(icmp) => LatencyResult::from_samples(
                self.target.clone(),
                None,
                ProbeMethod::IcmpFallback,
                FallbackStatus::Used,
                icmp,
            ),
            Err(reason) => {
                log::info!("ICMP fallback unavailable: {}", reason);
                self.tcp_result(FallbackStatus::Unavailable, samples)
            }
        }
    }

    fn tcp_result(&self, fallback: FallbackStatus, samples: Vec<LatencySample>) -> LatencyResult {
        LatencyResult::from_samples(
            self.target.clone(),
            Some(self.port),
            ProbeMethod::TcpConnect,
            fallback,
            samples,
        )
    }

    async fn resolve_target(&self) -> Result<IpAddr> {
        if let Ok(ip) = self.target.parse::<IpAddr>() {
            return Ok(ip);
        }

        let resolver = crate::dns::system_resolver(self.timeout);
        let lookup = timeout(self.timeout, resolver.lookup_ip(self.target.as_str()))
            .await
            .map_err(|_| NetworkError::Timeout)?
            .map_err(|e| NetworkError::DnsResolution(e.to_string()))?;

        lookup
            .iter()
            .next()
            .ok_or_else(|| NetworkError::DnsResolution("No IP found".to_string()))
    }
}
