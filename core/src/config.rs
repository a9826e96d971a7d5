//! Client configuration.

use std::time::Duration;

/// Environment variable holding the backend base URL.
pub const BASE_URL_ENV: &str = "FLEET_API_BASE_URL";
/// Environment variable holding an optional request timeout, in seconds.
pub const TIMEOUT_ENV: &str = "FLEET_API_TIMEOUT_SECS";

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000/api";

/// Settings for `ApiClient`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend root, e.g. `https://fleet.example.com/api`. Stored without a
    /// trailing slash.
    pub base_url: String,
    /// Transport-level timeout. `None` keeps the transport default.
    pub timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Read `FLEET_API_BASE_URL` and `FLEET_API_TIMEOUT_SECS`.
    ///
    /// Unset or unparsable values fall back to the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let base_url = lookup(BASE_URL_ENV).unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let timeout = lookup(TIMEOUT_ENV)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);
        Self {
            timeout,
            ..Self::new(&base_url)
        }
    }

    /// Join `path` onto the base URL.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}
