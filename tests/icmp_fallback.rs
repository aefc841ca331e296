#![cfg(unix)]

use netwhy::network::{AttemptOutcome, FallbackStatus, LatencyProbe, LatencyResult, ProbeMethod};
use serial_test::serial;
use std::ffi::OsString;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Puts an executable `ping` with the given shell body first on PATH for
/// the lifetime of the value.
struct FakePing {
    _dir: TempDir,
    saved_path: Option<OsString>,
}

impl FakePing {
    fn install(body: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("ping");
        fs::write(&script, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let saved_path = std::env::var_os("PATH");
        let mut dirs = vec![dir.path().to_path_buf()];
        if let Some(path) = &saved_path {
            dirs.extend(std::env::split_paths(path));
        }
        std::env::set_var("PATH", std::env::join_paths(dirs).unwrap());

        Self { _dir: dir, saved_path }
    }
}

impl Drop for FakePing {
    fn drop(&mut self) {
        match &self.saved_path {
            Some(path) => std::env::set_var("PATH", path),
            None => std::env::remove_var("PATH"),
        }
    }
}

async fn refused_run(count: u32) -> LatencyResult {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };
    LatencyProbe::new("127.0.0.1".to_string(), port, count)
        .with_timeout(Duration::from_secs(2))
        .run()
        .await
}

#[tokio::test]
#[serial]
async fn test_fallback_replaces_tcp_samples_with_icmp() {
    let _ping = FakePing::install(
        "echo '64 bytes from 127.0.0.1: icmp_seq=1 ttl=64 time=12.3 ms'\nexit 0",
    );
    let result = refused_run(3).await;

    assert_eq!(result.method, ProbeMethod::IcmpFallback);
    assert_eq!(result.fallback, FallbackStatus::Used);
    assert!(result.port.is_none());
    assert_eq!(result.samples.len(), 3);
    assert!(result.samples.iter().all(|s| s.outcome == AttemptOutcome::Success));
    assert_eq!(result.loss_percent, 0.0);

    let rtt = Duration::from_secs_f64(12.3 / 1000.0);
    assert_eq!(result.min, Some(rtt));
    assert_eq!(result.avg, Some(rtt));
    assert_eq!(result.max, Some(rtt));
}

#[tokio::test]
#[serial]
async fn test_fallback_without_replies_counts_loss_over_icmp_only() {
    let _ping = FakePing::install("echo '1 packets transmitted, 0 received, 100% packet loss'\nexit 1");
    let result = refused_run(2).await;

    assert_eq!(result.method, ProbeMethod::IcmpFallback);
    assert_eq!(result.fallback, FallbackStatus::Used);
    assert!(result.port.is_none());
    assert_eq!(result.samples.len(), 2);
    assert!(result.samples.iter().all(|s| s.outcome == AttemptOutcome::Timeout));
    assert_eq!(result.loss_percent, 100.0);
    assert!(result.avg.is_none());
}

#[tokio::test]
#[serial]
async fn test_unprivileged_ping_keeps_tcp_result() {
    let _ping = FakePing::install("echo 'ping: socket: Operation not permitted' >&2\nexit 2");
    let result = refused_run(3).await;

    assert_eq!(result.method, ProbeMethod::TcpConnect);
    assert_eq!(result.fallback, FallbackStatus::Unavailable);
    assert!(result.port.is_some());
    assert_eq!(result.samples.len(), 3);
    assert!(result.samples.iter().all(|s| s.outcome == AttemptOutcome::Refused));
    assert_eq!(result.loss_percent, 100.0);
}
