//! Terminal and JSON rendering of a report and its verdict.

use crate::diagnose::DiagnosticReport;
use crate::network::{FallbackStatus, ProbeMethod};
use crate::summary::{Thresholds, Verdict, VerdictKind};
use crate::utils::{duration_ms, format_duration};
use colored::*;
use serde::Serialize;
use std::time::Duration;

const VERY_HIGH_LATENCY: Duration = Duration::from_millis(500);

/// One sentence per probe describing what it saw, in report order.
pub fn observations(report: &DiagnosticReport, thresholds: &Thresholds) -> Vec<String> {
    let mut lines = Vec::new();

    let latency = report.latency();
    let loss = latency.loss_percent;
    if loss >= 100.0 {
        lines.push("All latency attempts failed. No connectivity to target host.".to_string());
    } else if loss > 50.0 {
        lines.push(format!("Severe packet loss ({loss:.1}%) and connectivity issues."));
    } else if loss > 20.0 {
        lines.push(format!("High packet loss ({loss:.1}%) detected."));
    } else if let Some(avg) = latency.avg {
        let avg_ms = duration_ms(avg);
        if avg > VERY_HIGH_LATENCY {
            lines.push(format!(
                "Very high latency ({avg_ms:.0} ms average) suggests network congestion or routing issues."
            ));
        } else if avg > thresholds.high_latency {
            lines.push(format!("High latency ({avg_ms:.0} ms average) detected."));
        } else {
            lines.push(format!("Average latency {avg_ms:.0} ms, packet loss {loss:.1}%."));
        }
    }

    if let Some(dns) = report.dns() {
        if dns.all_failed() {
            lines.push("DNS resolution is failing for all tested hostnames.".to_string());
        } else if !dns.all_resolved() {
            lines.push(format!(
                "DNS resolution failed for: {}",
                dns.failed_hostnames().join(", ")
            ));
        } else {
            lines.push("DNS resolution OK.".to_string());
        }
    }

    if let Some(http) = report.http() {
        match http.status {
            Some(status) => lines.push(format!(
                "HTTP GET {}: {} in {:.3} s",
                http.url,
                status,
                http.elapsed.as_secs_f64()
            )),
            None => lines.push(format!(
                "HTTP request to {} failed: {}",
                http.url,
                http.error.as_deref().unwrap_or("unknown error")
            )),
        }
    }

    lines
}

pub fn print_human(report: &DiagnosticReport, verdict: &Verdict, summary_only: bool) {
    if !summary_only {
        print_details(report);
    }

    println!("{}", "=== Summary ===".bold().blue());
    for line in observations(report, &verdict.thresholds) {
        println!("{line}");
    }
    println!();
    println!("{} {}", "Verdict:".bold(), colored_label(verdict.kind));
    println!("  {}", verdict.explanation);
}

fn print_details(report: &DiagnosticReport) {
    let latency = report.latency();
    println!("{}", "=== Latency ===".bold().blue());
    match latency.port {
        Some(port) => println!("Target: {}:{}", latency.target, port),
        None => println!("Target: {}", latency.target),
    }
    let method = match latency.method {
        ProbeMethod::TcpConnect => "tcp-connect",
        ProbeMethod::IcmpFallback => "icmp-fallback",
    };
    println!("Method: {}", method.cyan());
    if latency.fallback == FallbackStatus::Unavailable {
        println!("  {}", "(TCP was refused and no ICMP fallback was available)".yellow());
    }
    match (latency.min, latency.avg, latency.max) {
        (Some(min), Some(avg), Some(max)) => println!(
            "Min/Avg/Max latency: {:.2} / {:.2} / {:.2} ms",
            duration_ms(min),
            duration_ms(avg),
            duration_ms(max)
        ),
        _ => println!("{}", "All latency attempts failed".red()),
    }
    println!("Packet loss: {:.1}%", latency.loss_percent);
    println!();

    if let Some(dns) = report.dns() {
        println!("{}", "=== DNS Checks ===".bold().blue());
        for entry in &dns.entries {
            if entry.resolved {
                let ips: Vec<String> = entry.addresses.iter().map(|ip| ip.to_string()).collect();
                println!(
                    "{}: {} ({}) in {}",
                    entry.hostname,
                    "OK".green(),
                    ips.join(", "),
                    format_duration(entry.duration).cyan()
                );
            } else {
                println!(
                    "{}: {} ({})",
                    entry.hostname,
                    "FAILED".red(),
                    entry.message.as_deref().unwrap_or("unknown error")
                );
            }
        }
        println!();
    }

    if let Some(http) = report.http() {
        println!("{}", "=== HTTP Check ===".bold().blue());
        println!("URL: {}", http.url);
        match http.status {
            Some(status) => {
                println!("Status: {}", status.to_string().green());
                println!("Response time: {:.3} s", http.elapsed.as_secs_f64());
            }
            None => println!(
                "Status: {} ({})",
                "FAILED".red(),
                http.error.as_deref().unwrap_or("unknown error")
            ),
        }
        println!();
    }
}

fn colored_label(kind: VerdictKind) -> ColoredString {
    let label = kind.label();
    match kind {
        VerdictKind::Healthy => label.green().bold(),
        VerdictKind::Inconclusive => label.yellow().bold(),
        _ => label.red().bold(),
    }
}

pub fn render_json(report: &DiagnosticReport, verdict: &Verdict) -> serde_json::Result<String> {
    #[derive(Serialize)]
    struct JsonOutput<'a> {
        #[serde(flatten)]
        report: &'a DiagnosticReport,
        verdict: &'a Verdict,
        summary: Vec<String>,
    }

    serde_json::to_string_pretty(&JsonOutput {
        report,
        verdict,
        summary: observations(report, &verdict.thresholds),
    })
}
