//! Client settings

use std::time::Duration;

/// Default Envi cloud endpoint
pub const DEFAULT_BASE_URL: &str = "https://app-apis.enviliving.com/apis/v1";

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Connection settings for [`crate::HttpEnviClient`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiSettings {
    /// Base URL, without a trailing slash
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ApiSettings {
    /// Settings with a custom base URL (used by tests against a local server)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Settings with a request timeout in seconds
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    /// Full URL for an API path
    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_path() {
        let settings = ApiSettings::default().with_base_url("http://localhost:8080/");
        assert_eq!(settings.url("/schedule/list"), "http://localhost:8080/schedule/list");
        assert_eq!(settings.url("device/7"), "http://localhost:8080/device/7");
    }

    #[test]
    fn test_default_timeout() {
        assert_eq!(ApiSettings::default().timeout, Duration::from_secs(15));
        assert_eq!(
            ApiSettings::default().with_timeout_secs(42).timeout,
            Duration::from_secs(42)
        );
    }
}
