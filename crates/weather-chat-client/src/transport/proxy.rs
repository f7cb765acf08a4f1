//! Transport for the proxy route (`POST /api/chat`).

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use weather_chat_core::wire::{ProxyChatRequest, ProxyChatResponse};
use weather_chat_core::{extract_weather_data, EMPTY_REPLY};

use super::{build_http_client, error_from_response, AgentTransport, EventStream, ExchangeRequest, TransportEvent};
use crate::config::ClientConfig;
use crate::error::{ChatError, Result};

/// Sends the input plus history to the proxy and awaits one JSON envelope.
#[derive(Debug, Clone)]
pub struct ProxyTransport {
    client: reqwest::Client,
    url: String,
}

impl ProxyTransport {
    /// Create a transport for the proxy at `config.proxy_url`.
    ///
    /// # Errors
    ///
    /// Returns `ChatError::Configuration` if the HTTP client cannot be created.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = build_http_client(config.connect_timeout(), Some(config.request_timeout()))?;
        Ok(Self::with_client(client, &config.proxy_url))
    }

    /// Create a transport with a custom reqwest client.
    #[must_use]
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            url: format!("{}/api/chat", base_url.trim_end_matches('/')),
        }
    }

    /// The full URL of the chat route.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl AgentTransport for ProxyTransport {
    async fn open(&self, request: ExchangeRequest) -> Result<EventStream> {
        let body = ProxyChatRequest {
            input: request.input,
            conversation_history: request.history,
        };

        let response = self.client.post(&self.url).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let data: ProxyChatResponse = response
            .json()
            .await
            .map_err(|e| ChatError::Protocol(format!("invalid proxy response: {e}")))?;

        if !data.success {
            return Err(ChatError::Upstream {
                status: None,
                message: data
                    .error
                    .unwrap_or_else(|| "Failed to get response from API".to_string()),
            });
        }

        let text = data
            .text
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| EMPTY_REPLY.to_string());
        tracing::debug!(
            interaction_id = ?data.interaction_id,
            status = ?data.status,
            len = text.len(),
            "Proxy exchange complete"
        );

        let mut events = Vec::with_capacity(4);
        if let Some(id) = data.interaction_id {
            events.push(Ok(TransportEvent::MessageId(id)));
        }
        if let Some(weather) = extract_weather_data(&text) {
            events.push(Ok(TransportEvent::StructuredResult(weather)));
        }
        events.push(Ok(TransportEvent::TextDelta(text)));
        events.push(Ok(TransportEvent::Done));

        Ok(stream::iter(events).boxed())
    }

    fn wants_history(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "proxy"
    }
}
