//! Fault-domain classification.
//!
//! [`summarize`] is a pure function of the report and the thresholds. Rules
//! are checked in order and the first match wins:
//!
//! 1. loss at or above the loss threshold: local link
//! 2. some DNS lookups failed: DNS
//! 3. HTTP check failed while DNS is fine: remote host
//! 4. average round trip above the latency threshold: inconclusive
//! 5. otherwise healthy

use crate::diagnose::DiagnosticReport;
use crate::http::HttpOutcome;
use crate::utils::{duration_ms, serialize_ms, serialize_opt_ms};
use serde::Serialize;
use std::time::Duration;

pub const DEFAULT_LOSS_THRESHOLD_PERCENT: f64 = 50.0;
pub const DEFAULT_HIGH_LATENCY: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Thresholds {
    pub loss_percent: f64,
    #[serde(rename = "high_latency_ms", serialize_with = "serialize_ms")]
    pub high_latency: Duration,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            loss_percent: DEFAULT_LOSS_THRESHOLD_PERCENT,
            high_latency: DEFAULT_HIGH_LATENCY,
        }
    }
}

impl Thresholds {
    pub fn with_high_latency(mut self, high_latency: Duration) -> Self {
        self.high_latency = high_latency;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum VerdictKind {
    Healthy,
    LocalLinkIssue,
    DnsIssue,
    RemoteHostIssue,
    Inconclusive,
}

impl VerdictKind {
    pub fn label(&self) -> &'static str {
        match self {
            VerdictKind::Healthy => "healthy",
            VerdictKind::LocalLinkIssue => "local-link-issue",
            VerdictKind::DnsIssue => "dns-issue",
            VerdictKind::RemoteHostIssue => "remote-host-issue",
            VerdictKind::Inconclusive => "inconclusive",
        }
    }
}

/// The metric values the rules looked at.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evidence {
    pub loss_percent: f64,
    #[serde(rename = "avg_latency_ms", serialize_with = "serialize_opt_ms")]
    pub avg_latency: Option<Duration>,
    pub dns_success_ratio: Option<f64>,
    pub http_outcome: Option<HttpOutcome>,
    pub http_status: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    pub kind: VerdictKind,
    pub explanation: String,
    pub evidence: Evidence,
    pub thresholds: Thresholds,
}

pub fn summarize(report: &DiagnosticReport, thresholds: &Thresholds) -> Verdict {
    let latency = report.latency();
    let evidence = Evidence {
        loss_percent: latency.loss_percent,
        avg_latency: latency.avg,
        dns_success_ratio: report.dns().map(|d| d.success_ratio),
        http_outcome: report.http().map(|h| h.outcome),
        http_status: report.http().and_then(|h| h.status),
    };

    let (kind, explanation) = classify(report, &evidence, thresholds);

    Verdict {
        kind,
        explanation,
        evidence,
        thresholds: *thresholds,
    }
}

fn classify(report: &DiagnosticReport, evidence: &Evidence, thresholds: &Thresholds) -> (VerdictKind, String) {
    let loss = evidence.loss_percent;

    if loss >= thresholds.loss_percent {
        return (
            VerdictKind::LocalLinkIssue,
            format!(
                "{:.1}% packet loss to {} (threshold {:.0}%) suggests a local connectivity problem",
                loss,
                report.latency().target,
                thresholds.loss_percent
            ),
        );
    }

    if let Some(dns) = report.dns() {
        if dns.success_ratio < 1.0 {
            return (
                VerdictKind::DnsIssue,
                format!(
                    "network reachability is fine ({:.1}% loss) but name resolution failed for {} of {} hosts ({})",
                    loss,
                    dns.entries.len() - dns.resolved_count(),
                    dns.entries.len(),
                    dns.failed_hostnames().join(", ")
                ),
            );
        }
    }

    if let Some(http) = report.http() {
        if http.outcome != HttpOutcome::Success {
            return (
                VerdictKind::RemoteHostIssue,
                format!(
                    "the network path and DNS are fine ({:.1}% loss) but {} did not respond ({})",
                    loss,
                    http.url,
                    outcome_text(http.outcome)
                ),
            );
        }
    }

    if let Some(avg) = evidence.avg_latency {
        if avg > thresholds.high_latency {
            return (
                VerdictKind::Inconclusive,
                format!(
                    "average round trip of {:.0} ms exceeds {:.0} ms without significant loss ({:.1}%); the link is slow but not broken",
                    duration_ms(avg),
                    duration_ms(thresholds.high_latency),
                    loss
                ),
            );
        }
    }

    let latency_text = evidence
        .avg_latency
        .map(|avg| format!("{:.0} ms average round trip", duration_ms(avg)))
        .unwrap_or_else(|| "no round trip measured".to_string());
    (
        VerdictKind::Healthy,
        format!("{latency_text}, {loss:.1}% loss; no problem detected"),
    )
}

fn outcome_text(outcome: HttpOutcome) -> &'static str {
    match outcome {
        HttpOutcome::Success => "success",
        HttpOutcome::Timeout => "timed out",
        HttpOutcome::ConnectionError => "connection error",
        HttpOutcome::TlsError => "TLS error",
    }
}
