//! Client configuration loaded from environment variables.
//!
//! Every setting has a default so the client starts against a local backend
//! with zero configuration.

use std::path::PathBuf;
use std::time::Duration;

use avatarai_net::{ReconnectPolicy, StreamConfig};
use avatarai_shared::constants::{DEFAULT_BASE_URL, RECONNECT_DELAY_MS, TOKEN_REFRESH_INTERVAL_SECS};

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend origin for REST calls. The stream URL is derived from it.
    /// Env: `AVATARAI_BASE_URL`
    /// Default: `http://127.0.0.1:8080`
    pub base_url: String,

    /// Interval of the proactive token refresh.
    /// Env: `AVATARAI_TOKEN_REFRESH_SECS`
    /// Default: 23 hours.
    pub token_refresh_interval: Duration,

    /// Delay before the single reconnect attempt after an abnormal close.
    /// Env: `AVATARAI_RECONNECT_DELAY_MS`
    /// Default: 3000 ms.
    pub reconnect_delay: Duration,

    /// Directory holding the local database.
    /// Env: `AVATARAI_DATA_DIR`
    /// Default: the platform data directory.
    pub data_dir: Option<PathBuf>,

    /// Per-request HTTP timeout.
    /// Env: `AVATARAI_HTTP_TIMEOUT_SECS`
    /// Default: 30 seconds.
    pub http_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token_refresh_interval: Duration::from_secs(TOKEN_REFRESH_INTERVAL_SECS),
            reconnect_delay: Duration::from_millis(RECONNECT_DELAY_MS),
            data_dir: None,
            http_timeout: avatarai_net::DEFAULT_TIMEOUT,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = lookup("AVATARAI_BASE_URL").filter(|v| !v.trim().is_empty()) {
            config.base_url = url.trim().trim_end_matches('/').to_string();
        }

        if let Some(secs) = parse_u64(&lookup, "AVATARAI_TOKEN_REFRESH_SECS") {
            config.token_refresh_interval = Duration::from_secs(secs);
        }

        if let Some(ms) = parse_u64(&lookup, "AVATARAI_RECONNECT_DELAY_MS") {
            config.reconnect_delay = Duration::from_millis(ms);
        }

        if let Some(dir) = lookup("AVATARAI_DATA_DIR").filter(|v| !v.is_empty()) {
            config.data_dir = Some(PathBuf::from(dir));
        }

        if let Some(secs) = parse_u64(&lookup, "AVATARAI_HTTP_TIMEOUT_SECS") {
            config.http_timeout = Duration::from_secs(secs);
        }

        // RUST_LOG is read by tracing-subscriber's EnvFilter directly.

        config
    }

    pub fn stream_config(&self) -> StreamConfig {
        StreamConfig {
            reconnect: ReconnectPolicy::new(self.reconnect_delay),
            ..StreamConfig::from_base_url(&self.base_url)
        }
    }
}

fn parse_u64(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<u64> {
    let raw = lookup(key)?;
    match raw.trim().parse::<u64>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Invalid number, using default");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = ClientConfig::from_lookup(lookup(&[]));
        assert_eq!(config.base_url, "http://127.0.0.1:8080");
        assert_eq!(config.token_refresh_interval, Duration::from_secs(23 * 60 * 60));
        assert_eq!(config.reconnect_delay, Duration::from_secs(3));
        assert!(config.data_dir.is_none());
    }

    #[test]
    fn overrides() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("AVATARAI_BASE_URL", "https://avatar.example/"),
            ("AVATARAI_TOKEN_REFRESH_SECS", "60"),
            ("AVATARAI_RECONNECT_DELAY_MS", "250"),
            ("AVATARAI_DATA_DIR", "/tmp/avatarai"),
        ]));
        assert_eq!(config.base_url, "https://avatar.example");
        assert_eq!(config.token_refresh_interval, Duration::from_secs(60));
        assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/avatarai")));

        let stream = config.stream_config();
        assert_eq!(stream.url, "wss://avatar.example/api/chat/stream");
        assert_eq!(stream.reconnect.delay(), Duration::from_millis(250));
    }

    #[test]
    fn invalid_numbers_keep_defaults() {
        let config = ClientConfig::from_lookup(lookup(&[("AVATARAI_HTTP_TIMEOUT_SECS", "soon")]));
        assert_eq!(config.http_timeout, Duration::from_secs(30));
    }
}
