use super::{AttemptOutcome, LatencyProbe, LatencySample};
use std::io::ErrorKind;
use std::net::{IpAddr, SocketAddr};
use std::time::Instant;
use tokio::net::TcpStream;
use tokio::time::timeout;

impl LatencyProbe {
    /// One TCP handshake against `ip:port`, closed as soon as it completes.
    pub async fn tcp_attempt(&self, attempt: u32, ip: IpAddr) -> LatencySample {
        let addr = SocketAddr::new(ip, self.port);
        let start = Instant::now();

        match timeout(self.timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => {
                let elapsed = start.elapsed();
                drop(stream);
                LatencySample::success(attempt, elapsed)
            }
            Ok(Err(e)) => {
                log::debug!("TCP connect to {} failed: {}", addr, e);
                LatencySample::failed(attempt, classify_connect_error(e.kind()))
            }
            Err(_) => LatencySample::failed(attempt, AttemptOutcome::Timeout),
        }
    }
}

pub fn classify_connect_error(kind: ErrorKind) -> AttemptOutcome {
    match kind {
        ErrorKind::ConnectionRefused => AttemptOutcome::Refused,
        ErrorKind::TimedOut => AttemptOutcome::Timeout,
        _ => AttemptOutcome::Error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_connect_error() {
        assert_eq!(
            classify_connect_error(ErrorKind::ConnectionRefused),
            AttemptOutcome::Refused
        );
        assert_eq!(classify_connect_error(ErrorKind::TimedOut), AttemptOutcome::Timeout);
        assert_eq!(
            classify_connect_error(ErrorKind::PermissionDenied),
            AttemptOutcome::Error
        );
    }
}
