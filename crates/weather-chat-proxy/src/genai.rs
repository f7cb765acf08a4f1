//! Client for the generative-language interactions API.
//!
//! Only the two calls the proxy needs are modelled: creating an interaction from a
//! single input string, and fetching it again by ID.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{GenAiError, Result};

/// Status reported for an interaction that is still running.
pub const STATUS_IN_PROGRESS: &str = "in_progress";

/// Status reported for an interaction that failed.
pub const STATUS_FAILED: &str = "failed";

/// One output item of an interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionOutput {
    /// Output kind; only `"text"` items are used.
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Text content for `"text"` items.
    #[serde(default)]
    pub text: Option<String>,
}

/// An interaction as returned by the API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    /// Interaction ID.
    #[serde(default)]
    pub id: Option<String>,
    /// Lifecycle status, e.g. `completed`, `in_progress`, `failed`.
    #[serde(default)]
    pub status: String,
    /// Outputs in production order.
    #[serde(default)]
    pub outputs: Vec<InteractionOutput>,
}

impl Interaction {
    /// The last non-empty text output.
    #[must_use]
    pub fn last_text(&self) -> Option<&str> {
        self.outputs
            .iter()
            .rev()
            .find(|o| o.kind == "text")
            .and_then(|o| o.text.as_deref())
            .filter(|t| !t.is_empty())
    }

    /// Check if the interaction failed.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.status == STATUS_FAILED
    }

    /// Check if the interaction is still running.
    #[must_use]
    pub fn is_in_progress(&self) -> bool {
        self.status == STATUS_IN_PROGRESS
    }
}

/// Trait for the interactions backend.
///
/// This trait abstracts the API client, allowing for mock implementations in tests.
#[async_trait]
pub trait InteractionsApi: Send + Sync {
    /// Create an interaction.
    ///
    /// # Errors
    ///
    /// Returns an error if no API key is configured, the request fails, or the
    /// backend rejects it.
    async fn create(&self, model: &str, input: &str) -> Result<Interaction>;

    /// Fetch an interaction by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the backend rejects it.
    async fn get(&self, id: &str) -> Result<Interaction>;
}

#[derive(Debug, Serialize)]
struct CreateRequest<'a> {
    model: &'a str,
    input: &'a str,
}

/// HTTP client for the interactions API.
#[derive(Debug, Clone)]
pub struct HttpInteractionsClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpInteractionsClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| GenAiError::Request(format!("failed to create HTTP client: {e}")))?;
        Ok(Self::with_client(client, base_url, api_key))
    }

    /// Create a new client with a custom reqwest client.
    #[must_use]
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    /// Get the base URL of the API.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or(GenAiError::MissingApiKey)
    }

    async fn read(response: reqwest::Response) -> Result<Interaction> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GenAiError::Status {
                status: status.as_u16(),
                message,
            });
        }
        response
            .json()
            .await
            .map_err(|e| GenAiError::Decode(e.to_string()))
    }
}

#[async_trait]
impl InteractionsApi for HttpInteractionsClient {
    async fn create(&self, model: &str, input: &str) -> Result<Interaction> {
        let api_key = self.api_key()?;
        let url = format!("{}/v1beta/interactions", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&CreateRequest { model, input })
            .send()
            .await?;

        let interaction = Self::read(response).await?;
        tracing::debug!(
            interaction_id = ?interaction.id,
            status = %interaction.status,
            outputs = interaction.outputs.len(),
            "Created interaction"
        );
        Ok(interaction)
    }

    async fn get(&self, id: &str) -> Result<Interaction> {
        let api_key = self.api_key()?;
        let url = format!("{}/v1beta/interactions/{id}", self.base_url);

        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", api_key)
            .send()
            .await?;
        Self::read(response).await
    }
}
