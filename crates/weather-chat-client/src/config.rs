//! Client configuration types.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ChatError;

/// Which backend the client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
    /// `POST /api/chat` on the proxy server, one JSON envelope per exchange.
    #[default]
    Proxy,
    /// The agent's streaming endpoint, decoded line by line.
    Direct,
}

impl BackendMode {
    /// Config/CLI string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Proxy => "proxy",
            Self::Direct => "direct",
        }
    }
}

impl fmt::Display for BackendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendMode {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "proxy" => Ok(Self::Proxy),
            "direct" => Ok(Self::Direct),
            other => Err(ChatError::Configuration(format!(
                "unknown backend mode '{other}' (expected 'proxy' or 'direct')"
            ))),
        }
    }
}

/// Tuning parameters sent with every direct-mode request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestTuning {
    /// Retries the agent may perform.
    #[serde(default = "RequestTuning::default_max_retries")]
    pub max_retries: u32,

    /// Maximum reasoning steps.
    #[serde(default = "RequestTuning::default_max_steps")]
    pub max_steps: u32,

    /// Sampling temperature.
    #[serde(default = "RequestTuning::default_temperature")]
    pub temperature: f64,

    /// Nucleus sampling parameter.
    #[serde(default = "RequestTuning::default_top_p")]
    pub top_p: f64,

    /// Run identifier.
    #[serde(default = "RequestTuning::default_agent_id")]
    pub run_id: String,

    /// Resource identifier.
    #[serde(default = "RequestTuning::default_agent_id")]
    pub resource_id: String,

    /// Agent-side thread identifier, fixed per deployment.
    #[serde(default = "RequestTuning::default_thread_id")]
    pub thread_id: String,
}

impl RequestTuning {
    const fn default_max_retries() -> u32 {
        2
    }

    const fn default_max_steps() -> u32 {
        5
    }

    const fn default_temperature() -> f64 {
        0.5
    }

    const fn default_top_p() -> f64 {
        1.0
    }

    fn default_agent_id() -> String {
        "weatherAgent".to_string()
    }

    fn default_thread_id() -> String {
        "weather-chat".to_string()
    }
}

impl Default for RequestTuning {
    fn default() -> Self {
        Self {
            max_retries: Self::default_max_retries(),
            max_steps: Self::default_max_steps(),
            temperature: Self::default_temperature(),
            top_p: Self::default_top_p(),
            run_id: Self::default_agent_id(),
            resource_id: Self::default_agent_id(),
            thread_id: Self::default_thread_id(),
        }
    }
}

/// Configuration for the chat client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Backend selection.
    #[serde(default)]
    pub mode: BackendMode,

    /// Base URL of the proxy server (proxy mode).
    #[serde(default = "ClientConfig::default_proxy_url")]
    pub proxy_url: String,

    /// Agent stream endpoint (direct mode).
    #[serde(default = "ClientConfig::default_stream_endpoint")]
    pub stream_endpoint: String,

    /// Time allowed for a response to start, in seconds. In proxy mode this
    /// covers the whole exchange.
    #[serde(default = "ClientConfig::default_request_timeout")]
    pub request_timeout_seconds: u64,

    /// TCP connect timeout in seconds.
    #[serde(default = "ClientConfig::default_connect_timeout")]
    pub connect_timeout_seconds: u64,

    /// Longest gap allowed between chunks of a streamed reply, in seconds.
    #[serde(default = "ClientConfig::default_stream_idle_timeout")]
    pub stream_idle_timeout_seconds: u64,

    /// Direct-mode tuning.
    #[serde(default)]
    pub tuning: RequestTuning,
}

impl ClientConfig {
    fn default_proxy_url() -> String {
        "http://localhost:3000".to_string()
    }

    fn default_stream_endpoint() -> String {
        "https://millions-screeching-vultur.mastra.cloud/api/agents/weatherAgent/stream".to_string()
    }

    const fn default_request_timeout() -> u64 {
        10
    }

    const fn default_connect_timeout() -> u64 {
        5
    }

    const fn default_stream_idle_timeout() -> u64 {
        30
    }

    /// Get the request timeout as a `Duration`.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// Get the connect timeout as a `Duration`.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    /// Get the stream idle timeout as a `Duration`.
    #[must_use]
    pub fn stream_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.stream_idle_timeout_seconds)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            mode: BackendMode::default(),
            proxy_url: Self::default_proxy_url(),
            stream_endpoint: Self::default_stream_endpoint(),
            request_timeout_seconds: Self::default_request_timeout(),
            connect_timeout_seconds: Self::default_connect_timeout(),
            stream_idle_timeout_seconds: Self::default_stream_idle_timeout(),
            tuning: RequestTuning::default(),
        }
    }
}
