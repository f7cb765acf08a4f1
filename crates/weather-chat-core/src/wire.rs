//! Request and response bodies exchanged over HTTP.
//!
//! Shared by the client transports and the proxy server so that both ends agree on
//! the JSON layout.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::{Message, Role};

// =============================================================================
// Proxy route (`POST /api/chat`)
// =============================================================================

/// One prior turn sent along with a proxy request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// `"user"` or `"agent"`.
    pub role: String,
    /// Message text.
    pub content: String,
}

impl HistoryEntry {
    /// Check if this turn was written by the user.
    #[must_use]
    pub fn is_user(&self) -> bool {
        self.role == Role::User.as_str()
    }
}

impl From<&Message> for HistoryEntry {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role.as_str().to_string(),
            content: message.content.clone(),
        }
    }
}

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyChatRequest {
    /// The new user input.
    pub input: String,
    /// Earlier turns of the conversation, oldest first.
    #[serde(default)]
    pub conversation_history: Vec<HistoryEntry>,
}

/// Response of `POST /api/chat`.
///
/// On success `success` is `true` and `text` is set; on failure only `error` is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyChatResponse {
    /// Whether the interaction succeeded.
    #[serde(default)]
    pub success: bool,
    /// The agent's reply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Upstream interaction ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interaction_id: Option<String>,
    /// Upstream interaction status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Error description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Error body returned with non-2xx statuses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    /// Error description.
    pub error: String,
}

// =============================================================================
// Agent stream endpoint (direct mode)
// =============================================================================

/// A message in a direct-mode request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentStreamMessage {
    /// Always `"user"` for requests built by this client.
    pub role: String,
    /// Message text.
    pub content: String,
}

/// Body posted to the agent stream endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentStreamRequest {
    /// Messages for this turn.
    pub messages: Vec<AgentStreamMessage>,
    /// Run identifier.
    pub run_id: String,
    /// Retries the agent may perform.
    pub max_retries: u32,
    /// Maximum reasoning steps.
    pub max_steps: u32,
    /// Sampling temperature.
    pub temperature: f64,
    /// Nucleus sampling parameter.
    pub top_p: f64,
    /// Free-form runtime context; always an object.
    pub runtime_context: Map<String, Value>,
    /// Agent-side thread identifier.
    pub thread_id: String,
    /// Agent-side resource identifier.
    pub resource_id: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn proxy_request_uses_camel_case() {
        let request = ProxyChatRequest {
            input: "Weather in Rome?".to_string(),
            conversation_history: vec![HistoryEntry {
                role: "user".to_string(),
                content: "hi".to_string(),
            }],
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["conversationHistory"][0]["role"], "user");

        let parsed: ProxyChatRequest = serde_json::from_value(json!({"input": "x"})).unwrap();
        assert!(parsed.conversation_history.is_empty());
    }

    #[test]
    fn proxy_response_omits_missing_fields() {
        let response = ProxyChatResponse {
            success: true,
            text: Some("Sunny".to_string()),
            interaction_id: Some("int-1".to_string()),
            status: Some("completed".to_string()),
            error: None,
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["interactionId"], "int-1");
        assert!(value.get("error").is_none());

        let failure: ProxyChatResponse = serde_json::from_value(json!({"error": "nope"})).unwrap();
        assert!(!failure.success);
        assert_eq!(failure.error.as_deref(), Some("nope"));
    }

    #[test]
    fn agent_request_layout() {
        let request = AgentStreamRequest {
            messages: vec![AgentStreamMessage {
                role: "user".to_string(),
                content: "Weather in Paris".to_string(),
            }],
            run_id: "weatherAgent".to_string(),
            max_retries: 2,
            max_steps: 5,
            temperature: 0.5,
            top_p: 1.0,
            runtime_context: Map::new(),
            thread_id: "t".to_string(),
            resource_id: "weatherAgent".to_string(),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["runId"], "weatherAgent");
        assert_eq!(value["maxSteps"], 5);
        assert_eq!(value["topP"], 1.0);
        assert_eq!(value["runtimeContext"], json!({}));
    }
}
