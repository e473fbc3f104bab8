//! Session configuration with environment overrides.

use crate::capture::CaptureConfig;
use crate::dialogue::DEFAULT_BACKEND_URL;
use crate::error::{VoiceError, VoiceResult};
use std::time::Duration;

/// Tuning for one voice session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Dialogue backend base URL.
    pub backend_url: String,
    /// Bound on the dialogue round-trip; elapsing counts as a network failure.
    pub request_timeout: Duration,
    /// Microphone capture tuning.
    pub capture: CaptureConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            request_timeout: Duration::from_secs(30),
            capture: CaptureConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Defaults with environment overrides: `TUTOR_BACKEND_URL`,
    /// `TUTOR_REQUEST_TIMEOUT_SECS`.
    pub fn from_env() -> VoiceResult<Self> {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("TUTOR_BACKEND_URL") {
            let url = url.trim().to_string();
            if url.is_empty() {
                return Err(VoiceError::Config("TUTOR_BACKEND_URL is empty".to_string()));
            }
            config.backend_url = url;
        }
        if let Ok(raw) = std::env::var("TUTOR_REQUEST_TIMEOUT_SECS") {
            config.request_timeout = parse_timeout_secs(&raw)?;
        }
        Ok(config)
    }
}

fn parse_timeout_secs(raw: &str) -> VoiceResult<Duration> {
    let secs: u64 = raw.trim().parse().map_err(|_| {
        VoiceError::Config(format!(
            "TUTOR_REQUEST_TIMEOUT_SECS must be an integer, got {raw:?}"
        ))
    })?;
    if secs == 0 {
        return Err(VoiceError::Config(
            "TUTOR_REQUEST_TIMEOUT_SECS must be at least 1".to_string(),
        ));
    }
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.backend_url, "http://localhost:8000");
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.capture.sample_rate, 16000);
    }

    #[test]
    fn timeout_parses_whole_seconds() {
        assert_eq!(
            parse_timeout_secs("5").unwrap(),
            Duration::from_secs(5)
        );
        assert_eq!(
            parse_timeout_secs(" 120 ").unwrap(),
            Duration::from_secs(120)
        );
    }

    #[test]
    fn zero_timeout_is_rejected_not_rewritten() {
        let err = parse_timeout_secs("0").unwrap_err();
        assert!(matches!(err, VoiceError::Config(_)));
    }

    #[test]
    fn non_numeric_timeout_is_rejected() {
        let err = parse_timeout_secs("soon").unwrap_err();
        assert!(matches!(err, VoiceError::Config(_)));
    }
}
