//! Room client configuration.
//!
//! Configuration is loaded from environment variables. Every key is optional;
//! unparseable numbers fall back to their defaults while structurally invalid
//! values (bad URL scheme, unknown echo policy, zero poll interval) are
//! rejected.

use std::collections::HashMap;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default backend base URL (token issuance and recording status).
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000";

/// Default recording status poll interval in milliseconds.
pub const DEFAULT_RECORDING_POLL_INTERVAL_MS: u64 = 3000;

/// Default HTTP request timeout in seconds.
pub const DEFAULT_HTTP_TIMEOUT_SECONDS: u64 = 10;

/// Default capture width for the local camera track.
pub const DEFAULT_VIDEO_WIDTH: u32 = 640;

/// Whether chat messages are echoed into the local log before delivery is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EchoPolicy {
    /// Always echo locally, even when the message could not be sent.
    #[default]
    Optimistic,

    /// Echo only after the payload was handed to an outbound data track.
    AfterPublish,
}

impl EchoPolicy {
    /// Parse the policy from its configuration spelling.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "optimistic" => Some(EchoPolicy::Optimistic),
            "after-publish" | "after_publish" => Some(EchoPolicy::AfterPublish),
            _ => None,
        }
    }
}

/// Room client configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend base URL, without trailing slash (default: `http://localhost:5000`).
    pub api_base_url: String,

    /// Interval between recording status requests (default: 3s).
    pub recording_poll_interval: Duration,

    /// Timeout applied to every backend request (default: 10s).
    pub http_timeout: Duration,

    /// Capture width for the local video track (default: 640).
    pub video_width: u32,

    /// Publish an outbound data track at connect time so chat has a channel.
    pub publish_data_track: bool,

    /// Local echo policy for outgoing chat messages.
    pub chat_echo: EchoPolicy,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            recording_poll_interval: Duration::from_millis(DEFAULT_RECORDING_POLL_INTERVAL_MS),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECONDS),
            video_width: DEFAULT_VIDEO_WIDTH,
            publish_data_track: true,
            chat_echo: EchoPolicy::Optimistic,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let api_base_url = vars
            .get("ROOM_API_BASE_URL")
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

        if !(api_base_url.starts_with("http://") || api_base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue(format!(
                "ROOM_API_BASE_URL must be an http(s) URL, got '{api_base_url}'"
            )));
        }

        let poll_interval_ms = vars
            .get("ROOM_RECORDING_POLL_INTERVAL_MS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_RECORDING_POLL_INTERVAL_MS);

        if poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "ROOM_RECORDING_POLL_INTERVAL_MS must be greater than zero".to_string(),
            ));
        }

        let http_timeout_seconds = vars
            .get("ROOM_HTTP_TIMEOUT_SECONDS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECONDS);

        let video_width = vars
            .get("ROOM_VIDEO_WIDTH")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_VIDEO_WIDTH);

        let publish_data_track = vars
            .get("ROOM_PUBLISH_DATA_TRACK")
            .and_then(|s| s.parse().ok())
            .unwrap_or(true);

        let chat_echo = match vars.get("ROOM_CHAT_ECHO_POLICY") {
            Some(value) => EchoPolicy::parse(value).ok_or_else(|| {
                ConfigError::InvalidValue(format!(
                    "ROOM_CHAT_ECHO_POLICY must be 'optimistic' or 'after-publish', got '{value}'"
                ))
            })?,
            None => EchoPolicy::Optimistic,
        };

        Ok(Config {
            api_base_url,
            recording_poll_interval: Duration::from_millis(poll_interval_ms),
            http_timeout: Duration::from_secs(http_timeout_seconds),
            video_width,
            publish_data_track,
            chat_echo,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_from_empty_vars() {
        let config = Config::from_vars(&HashMap::new()).unwrap();

        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.recording_poll_interval, Duration::from_secs(3));
        assert_eq!(config.http_timeout, Duration::from_secs(10));
        assert_eq!(config.video_width, 640);
        assert!(config.publish_data_track);
        assert_eq!(config.chat_echo, EchoPolicy::Optimistic);
    }

    #[test]
    fn test_default_matches_empty_vars() {
        let from_vars = Config::from_vars(&HashMap::new()).unwrap();
        let default = Config::default();

        assert_eq!(from_vars.api_base_url, default.api_base_url);
        assert_eq!(
            from_vars.recording_poll_interval,
            default.recording_poll_interval
        );
    }

    #[test]
    fn test_custom_values() {
        let config = Config::from_vars(&vars(&[
            ("ROOM_API_BASE_URL", "https://video.example.com/"),
            ("ROOM_RECORDING_POLL_INTERVAL_MS", "500"),
            ("ROOM_HTTP_TIMEOUT_SECONDS", "3"),
            ("ROOM_VIDEO_WIDTH", "1280"),
            ("ROOM_PUBLISH_DATA_TRACK", "false"),
            ("ROOM_CHAT_ECHO_POLICY", "after-publish"),
        ]))
        .unwrap();

        assert_eq!(config.api_base_url, "https://video.example.com");
        assert_eq!(config.recording_poll_interval, Duration::from_millis(500));
        assert_eq!(config.http_timeout, Duration::from_secs(3));
        assert_eq!(config.video_width, 1280);
        assert!(!config.publish_data_track);
        assert_eq!(config.chat_echo, EchoPolicy::AfterPublish);
    }

    #[test]
    fn test_unparseable_numbers_fall_back_to_defaults() {
        let config = Config::from_vars(&vars(&[
            ("ROOM_RECORDING_POLL_INTERVAL_MS", "soon"),
            ("ROOM_VIDEO_WIDTH", "wide"),
        ]))
        .unwrap();

        assert_eq!(config.recording_poll_interval, Duration::from_secs(3));
        assert_eq!(config.video_width, DEFAULT_VIDEO_WIDTH);
    }

    #[test]
    fn test_rejects_non_http_base_url() {
        let result = Config::from_vars(&vars(&[("ROOM_API_BASE_URL", "ftp://files")]));
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_rejects_zero_poll_interval() {
        let result = Config::from_vars(&vars(&[("ROOM_RECORDING_POLL_INTERVAL_MS", "0")]));
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_rejects_unknown_echo_policy() {
        let result = Config::from_vars(&vars(&[("ROOM_CHAT_ECHO_POLICY", "sometimes")]));
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_echo_policy_parse_spellings() {
        assert_eq!(EchoPolicy::parse("Optimistic"), Some(EchoPolicy::Optimistic));
        assert_eq!(
            EchoPolicy::parse("after_publish"),
            Some(EchoPolicy::AfterPublish)
        );
        assert_eq!(EchoPolicy::parse(""), None);
    }
}
