#[cfg(test)]
mod unit_tests {
    use crate::utils::{duration_ms, format_duration, measure_time, NetworkError};
    use std::time::Duration;

    #[test]
    fn test_format_duration_milliseconds() {
        let duration = Duration::from_millis(500);
        assert_eq!(format_duration(duration), "500ms");
    }

    #[test]
    fn test_format_duration_seconds() {
        let duration = Duration::from_millis(1500);
        assert_eq!(format_duration(duration), "1.50s");
    }

    #[test]
    fn test_duration_ms_keeps_fraction() {
        assert_eq!(duration_ms(Duration::from_micros(12_500)), 12.5);
        assert_eq!(duration_ms(Duration::ZERO), 0.0);
    }

    #[test]
    fn test_error_messages() {
        let error = NetworkError::InvalidConfig("count must be at least 1".to_string());
        assert_eq!(
            error.to_string(),
            "Invalid configuration: count must be at least 1"
        );
        assert_eq!(NetworkError::Cancelled.to_string(), "Diagnostics cancelled");
        assert_eq!(
            NetworkError::Other("ping: socket: Operation not permitted".to_string()).to_string(),
            "ping: socket: Operation not permitted"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let error: NetworkError = io.into();
        assert!(matches!(error, NetworkError::Io(_)));
    }

    #[tokio::test]
    async fn test_measure_time() {
        let (duration, result) = measure_time(|| async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            "test_result"
        })
        .await;

        assert!(duration >= Duration::from_millis(90)); // Allow some margin
        assert!(duration <= Duration::from_millis(500));
        assert_eq!(result, "test_result");
    }
}
