//! Agent transports.
//!
//! A transport carries one exchange to the backend and reports the reply as a
//! stream of [`TransportEvent`]s. Both backends normalize to the same events, so
//! the orchestrator never needs to know which one it is talking to.

mod direct;
mod proxy;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use weather_chat_core::wire::HistoryEntry;
use weather_chat_core::WeatherData;

use crate::config::{BackendMode, ClientConfig};
use crate::error::{ChatError, Result};

pub use direct::DirectTransport;
pub use proxy::ProxyTransport;

/// Everything a transport needs to send one exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeRequest {
    /// The trimmed user input.
    pub input: String,
    /// Earlier turns of the thread; empty when the transport does not want them.
    pub history: Vec<HistoryEntry>,
}

/// A normalized piece of the agent's reply.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// More conversational text, to be appended to what came before.
    TextDelta(String),
    /// Structured weather data for this exchange.
    StructuredResult(WeatherData),
    /// The backend's own identifier for this turn.
    MessageId(String),
    /// The reply is complete.
    Done,
}

/// Stream of events for one exchange.
pub type EventStream = BoxStream<'static, Result<TransportEvent>>;

/// A backend capable of carrying exchanges.
#[async_trait]
pub trait AgentTransport: Send + Sync {
    /// Send the request and return the reply as an event stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be sent or the backend rejects it.
    /// Failures after the stream is returned arrive as `Err` items.
    async fn open(&self, request: ExchangeRequest) -> Result<EventStream>;

    /// Whether requests should carry the thread's earlier turns.
    fn wants_history(&self) -> bool {
        false
    }

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// Build the transport selected by `config.mode`.
///
/// # Errors
///
/// Returns `ChatError::Configuration` if the HTTP client cannot be created.
pub fn transport_from_config(config: &ClientConfig) -> Result<Arc<dyn AgentTransport>> {
    let transport: Arc<dyn AgentTransport> = match config.mode {
        BackendMode::Proxy => Arc::new(ProxyTransport::new(config)?),
        BackendMode::Direct => Arc::new(DirectTransport::new(config)?),
    };
    tracing::debug!(transport = transport.name(), "Selected agent transport");
    Ok(transport)
}

fn build_http_client(connect_timeout: Duration, timeout: Option<Duration>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder().connect_timeout(connect_timeout);
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|e| ChatError::Configuration(format!("failed to create HTTP client: {e}")))
}

/// Turn a non-2xx response into an upstream error, preferring the `{error}` body.
async fn error_from_response(response: reqwest::Response) -> ChatError {
    let status = response.status();
    let message = response
        .json::<weather_chat_core::wire::ApiErrorBody>()
        .await
        .map(|body| body.error)
        .unwrap_or_else(|_| format!("HTTP error! status: {}", status.as_u16()));

    tracing::warn!(status = %status, error = %message, "Backend rejected request");
    ChatError::Upstream {
        status: Some(status.as_u16()),
        message,
    }
}
