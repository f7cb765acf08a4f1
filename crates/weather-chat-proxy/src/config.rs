//! Proxy configuration types.

use std::time::Duration;

use serde::Deserialize;

/// Configuration for the proxy service.
#[derive(Debug, Clone, Deserialize)]
pub struct ProxyConfig {
    /// Listen address (e.g., "0.0.0.0:3000").
    #[serde(default = "ProxyConfig::default_listen_addr")]
    pub listen_addr: String,

    /// API key for the generative-language backend. Requests fail with a
    /// configuration error while it is unset.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model name passed to the interactions API.
    #[serde(default = "ProxyConfig::default_model")]
    pub model: String,

    /// Base URL of the generative-language API.
    #[serde(default = "ProxyConfig::default_genai_base_url")]
    pub genai_base_url: String,

    /// Delay before the single follow-up poll of an in-progress interaction.
    #[serde(default = "ProxyConfig::default_poll_delay")]
    pub poll_delay_ms: u64,

    /// Request timeout in seconds.
    #[serde(default = "ProxyConfig::default_request_timeout")]
    pub request_timeout_seconds: u64,

    /// Maximum request body size in bytes.
    #[serde(default = "ProxyConfig::default_max_body")]
    pub max_body_bytes: usize,

    /// Allowed CORS origins.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl ProxyConfig {
    fn default_listen_addr() -> String {
        "0.0.0.0:3000".to_string()
    }

    fn default_model() -> String {
        "gemini-2.5-flash".to_string()
    }

    fn default_genai_base_url() -> String {
        "https://generativelanguage.googleapis.com".to_string()
    }

    const fn default_poll_delay() -> u64 {
        1000
    }

    const fn default_request_timeout() -> u64 {
        60
    }

    const fn default_max_body() -> usize {
        1024 * 1024 // 1 MB
    }

    /// Get the poll delay as a `Duration`.
    #[must_use]
    pub fn poll_delay(&self) -> Duration {
        Duration::from_millis(self.poll_delay_ms)
    }

    /// Get the request timeout as a `Duration`.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            listen_addr: Self::default_listen_addr(),
            api_key: None,
            model: Self::default_model(),
            genai_base_url: Self::default_genai_base_url(),
            poll_delay_ms: Self::default_poll_delay(),
            request_timeout_seconds: Self::default_request_timeout(),
            max_body_bytes: Self::default_max_body(),
            cors_origins: vec!["*".to_string()],
        }
    }
}
