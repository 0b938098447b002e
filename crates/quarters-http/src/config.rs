//! HTTP client configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// HTTP client configuration
///
/// `base_url` is the only required field; everything else carries a
/// default suitable for the Quarters REST API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Base URL prefixed to all relative request paths
    pub base_url: String,

    /// Request timeout, applied when a request carries no timeout of its own
    #[serde(default = "default_timeout")]
    pub timeout: Duration,

    /// Connection timeout
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: Duration,

    /// Whether to keep a cookie store so the httpOnly refresh credential
    /// is sent along with the refresh request
    #[serde(default = "default_with_credentials")]
    pub with_credentials: bool,

    /// Maximum automatic retries for transient failures
    #[serde(default = "default_max_transient_retries")]
    pub max_transient_retries: u32,

    /// Base delay for exponential backoff between retries
    #[serde(default = "default_retry_base_delay")]
    pub retry_base_delay: Duration,

    /// Token refresh endpoint; `None` means `{base_url}/auth/refresh`
    #[serde(default)]
    pub refresh_endpoint: Option<String>,

    /// Custom user agent
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP/HTTPS proxy URL
    #[serde(default)]
    pub proxy: Option<String>,
}

impl HttpConfig {
    /// Create a config for the given base URL with default settings
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: default_timeout(),
            connect_timeout: default_connect_timeout(),
            with_credentials: default_with_credentials(),
            max_transient_retries: default_max_transient_retries(),
            retry_base_delay: default_retry_base_delay(),
            refresh_endpoint: None,
            user_agent: default_user_agent(),
            proxy: None,
        }
    }

    /// Set request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Enable or disable the cookie store
    pub fn with_credentials(mut self, enabled: bool) -> Self {
        self.with_credentials = enabled;
        self
    }

    /// Set maximum transient retries
    pub fn with_max_transient_retries(mut self, count: u32) -> Self {
        self.max_transient_retries = count;
        self
    }

    /// Set backoff base delay
    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    /// Override the token refresh endpoint
    pub fn with_refresh_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.refresh_endpoint = Some(endpoint.into());
        self
    }

    /// Set user agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set proxy URL
    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    /// Resolve the refresh endpoint URL
    pub fn refresh_url(&self) -> String {
        self.refresh_endpoint
            .clone()
            .unwrap_or_else(|| format!("{}/auth/refresh", self.base_url.trim_end_matches('/')))
    }
}

// Default value functions for serde
fn default_timeout() -> Duration {
    Duration::from_secs(15)
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_with_credentials() -> bool {
    true
}

fn default_max_transient_retries() -> u32 {
    2
}

fn default_retry_base_delay() -> Duration {
    Duration::from_millis(300)
}

fn default_user_agent() -> String {
    format!("Quarters/{}", env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HttpConfig::new("https://api.quarters.test");
        assert_eq!(config.timeout, Duration::from_secs(15));
        assert_eq!(config.max_transient_retries, 2);
        assert_eq!(config.retry_base_delay, Duration::from_millis(300));
        assert!(config.with_credentials);
        assert!(config.proxy.is_none());
    }

    #[test]
    fn test_builder_pattern() {
        let config = HttpConfig::new("https://api.quarters.test")
            .with_timeout(Duration::from_secs(30))
            .with_max_transient_retries(5)
            .with_credentials(false)
            .with_proxy("http://proxy.example.com:8080");

        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.max_transient_retries, 5);
        assert!(!config.with_credentials);
        assert_eq!(config.proxy, Some("http://proxy.example.com:8080".to_string()));
    }

    #[test]
    fn test_refresh_url_default() {
        let config = HttpConfig::new("https://api.quarters.test/v1/");
        assert_eq!(config.refresh_url(), "https://api.quarters.test/v1/auth/refresh");
    }

    #[test]
    fn test_refresh_url_override() {
        let config = HttpConfig::new("https://api.quarters.test")
            .with_refresh_endpoint("https://auth.quarters.test/refresh");
        assert_eq!(config.refresh_url(), "https://auth.quarters.test/refresh");
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: HttpConfig =
            serde_json::from_value(serde_json::json!({ "base_url": "https://api.quarters.test" }))
                .unwrap();
        assert_eq!(config.base_url, "https://api.quarters.test");
        assert_eq!(config.timeout, Duration::from_secs(15));
        assert_eq!(config.max_transient_retries, 2);
        assert!(config.refresh_endpoint.is_none());
    }
}
