//! ICMP echo through the system `ping` utility.
//!
//! Raw ICMP sockets need privileges we usually do not have, so the fallback
//! shells out to `ping -c 1` once per attempt. Each child is bounded by the
//! probe timeout and killed if the attempt is abandoned.

use super::{AttemptOutcome, LatencyProbe, LatencySample};
use crate::utils::{NetworkError, Result};
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::time::timeout;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IcmpSupport {
    Available(PathBuf),
    Unavailable(String),
}

impl IcmpSupport {
    /// Looks for a ping executable on `PATH`.
    pub fn detect(ip: Option<IpAddr>) -> Self {
        let program = ping_program(ip);
        match std::env::var_os("PATH") {
            Some(paths) => find_executable(program, std::env::split_paths(&paths))
                .map(IcmpSupport::Available)
                .unwrap_or_else(|| IcmpSupport::Unavailable(format!("no '{program}' executable on PATH"))),
            None => IcmpSupport::Unavailable("PATH is not set".to_string()),
        }
    }
}

fn ping_program(ip: Option<IpAddr>) -> &'static str {
    match ip {
        // macOS keeps IPv6 echo in a separate binary
        Some(IpAddr::V6(_)) if cfg!(target_os = "macos") => "ping6",
        _ => "ping",
    }
}

fn find_executable<I>(program: &str, dirs: I) -> Option<PathBuf>
where
    I: IntoIterator<Item = PathBuf>,
{
    dirs.into_iter()
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

impl LatencyProbe {
    /// Runs the full attempt count over ICMP.
    ///
    /// Returns `Err` when the facility cannot be used at all (missing binary,
    /// no privilege to open an ICMP socket), in which case the caller keeps
    /// its TCP samples.
    pub async fn icmp_samples(&self, support: &IcmpSupport, ip: Option<IpAddr>) -> Result<Vec<LatencySample>> {
        let program = match support {
            IcmpSupport::Available(path) => path,
            IcmpSupport::Unavailable(reason) => return Err(NetworkError::Other(reason.clone())),
        };

        let destination = ip.map(|ip| ip.to_string()).unwrap_or_else(|| self.target.clone());

        let mut samples = Vec::with_capacity(self.count as usize);
        for attempt in 1..=self.count {
            let sample = self.icmp_attempt(program, &destination, attempt).await?;
            log::debug!("ICMP attempt #{} to {}: {:?}", attempt, destination, sample.outcome);
            samples.push(sample);
        }
        Ok(samples)
    }

    async fn icmp_attempt(&self, program: &Path, destination: &str, attempt: u32) -> Result<LatencySample> {
        let mut cmd = tokio::process::Command::new(program);
        cmd.args(["-n", "-c", "1", "-W"])
            .arg(wait_argument(self.timeout))
            .arg(destination)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let start = Instant::now();
        let output = match timeout(self.timeout, cmd.output()).await {
            Err(_) => return Ok(LatencySample::failed(attempt, AttemptOutcome::Timeout)),
            Ok(output) => output?,
        };
        let elapsed = start.elapsed();

        if output.status.success() {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let rtt = parse_ping_time(&stdout).unwrap_or(elapsed);
            return Ok(LatencySample::success(attempt, rtt));
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if no_reply_exit(output.status.code(), &stderr) {
            return Ok(LatencySample::failed(attempt, AttemptOutcome::Timeout));
        }
        Err(NetworkError::Other(format!(
            "{} exited with {}: {}",
            program.display(),
            output.status,
            stderr.trim()
        )))
    }
}

/// True when `ping` ran fine but got no echo back. Any other non-zero exit
/// (no socket privilege, bad arguments) means ping itself is unusable.
fn no_reply_exit(code: Option<i32>, stderr: &str) -> bool {
    match code {
        Some(1) => true,
        // macOS reports a lost reply with status 2 and nothing on stderr
        Some(2) if cfg!(target_os = "macos") => stderr.trim().is_empty(),
        _ => false,
    }
}

/// Value for `ping -W`: milliseconds on macOS, whole seconds elsewhere.
fn wait_argument(timeout: Duration) -> String {
    if cfg!(target_os = "macos") {
        timeout.as_millis().max(1).to_string()
    } else {
        timeout.as_secs_f64().ceil().max(1.0).to_string()
    }
}

/// Extracts the round trip from a reply line such as
/// `64 bytes from 1.1.1.1: icmp_seq=1 ttl=57 time=12.3 ms` (or `time<1 ms`).
pub fn parse_ping_time(output: &str) -> Option<Duration> {
    output.lines().find_map(|line| {
        let idx = line.find("time=").or_else(|| line.find("time<"))?;
        let value: String = line[idx + 5..]
            .chars()
            .take_while(|c| c.is_ascii_digit() || *c == '.')
            .collect();
        let ms: f64 = value.parse().ok()?;
        Some(Duration::from_secs_f64(ms / 1000.0))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_linux_reply() {
        let output = "PING 1.1.1.1 (1.1.1.1) 56(84) bytes of data.\n\
                      64 bytes from 1.1.1.1: icmp_seq=1 ttl=57 time=12.5 ms\n\
                      \n\
                      --- 1.1.1.1 ping statistics ---\n\
                      1 packets transmitted, 1 received, 0% packet loss, time 0ms\n\
                      rtt min/avg/max/mdev = 12.500/12.500/12.500/0.000 ms\n";
        assert_eq!(parse_ping_time(output), Some(Duration::from_micros(12_500)));
    }

    #[test]
    fn test_parse_sub_millisecond_reply() {
        let output = "64 bytes from 127.0.0.1: icmp_seq=1 ttl=64 time<1 ms";
        assert_eq!(parse_ping_time(output), Some(Duration::from_millis(1)));
    }

    #[test]
    fn test_parse_no_reply() {
        let output = "1 packets transmitted, 0 received, 100% packet loss, time 0ms\n";
        assert_eq!(parse_ping_time(output), None);
    }

    #[test]
    fn test_wait_argument_rounds_up() {
        if !cfg!(target_os = "macos") {
            assert_eq!(wait_argument(Duration::from_millis(1500)), "2");
            assert_eq!(wait_argument(Duration::from_millis(100)), "1");
        }
    }

    #[test]
    fn test_find_executable_missing() {
        let dirs = vec![PathBuf::from("/nonexistent/netwhy-test")];
        assert!(find_executable("ping", dirs).is_none());
    }

    #[tokio::test]
    async fn test_unavailable_support_reports_reason() {
        let probe = LatencyProbe::new("127.0.0.1".to_string(), 9, 2);
        let support = IcmpSupport::Unavailable("ICMP fallback disabled".to_string());
        let result = probe.icmp_samples(&support, None).await;
        assert!(matches!(result, Err(NetworkError::Other(reason)) if reason == "ICMP fallback disabled"));
    }

    #[test]
    fn test_exit_status_one_is_lost_reply() {
        assert!(no_reply_exit(Some(1), ""));
    }

    #[test]
    fn test_socket_permission_failure_is_not_a_lost_reply() {
        assert!(!no_reply_exit(Some(2), "ping: socket: Operation not permitted\n"));
        assert!(!no_reply_exit(Some(2), "ping: permission denied (are you root?)"));
        assert!(!no_reply_exit(None, ""));
    }
}
