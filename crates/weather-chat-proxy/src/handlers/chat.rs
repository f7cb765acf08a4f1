//! The chat endpoint.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde_json::Value;
use weather_chat_core::wire::{HistoryEntry, ProxyChatResponse};
use weather_chat_core::EMPTY_REPLY;

use crate::error::ApiError;
use crate::genai::InteractionsApi;
use crate::state::ProxyState;

const INVALID_INPUT: &str = "Invalid input. Please provide a valid input string.";
const INTERACTION_FAILED: &str = "Interaction failed. Please try again.";

/// Render the history and new input as one prompt.
///
/// Each turn becomes `User: ...` or `Assistant: ...`; turns are separated by a
/// blank line and the trimmed input comes last.
#[must_use]
pub fn conversation_context(history: &[HistoryEntry], input: &str) -> String {
    let mut context = String::new();
    for entry in history {
        let speaker = if entry.is_user() { "User" } else { "Assistant" };
        context.push_str(speaker);
        context.push_str(": ");
        context.push_str(&entry.content);
        context.push_str("\n\n");
    }
    context.push_str("User: ");
    context.push_str(input.trim());
    context
}

/// Pull `input` and `conversationHistory` out of a loosely-typed body.
///
/// Malformed history entries are skipped rather than failing the request.
fn parse_body(body: &Value) -> Result<(String, Vec<HistoryEntry>), ApiError> {
    let input = body
        .get("input")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::BadRequest(INVALID_INPUT.to_string()))?;

    let history = body
        .get("conversationHistory")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|e| serde_json::from_value::<HistoryEntry>(e.clone()).ok())
                .collect()
        })
        .unwrap_or_default();

    Ok((input.to_string(), history))
}

/// `POST /api/chat`.
///
/// ```text
/// POST /api/chat
/// { "input": "Weather in Oslo?", "conversationHistory": [{"role": "user", "content": "..."}] }
///
/// Response: 200 OK
/// { "success": true, "text": "...", "interactionId": "...", "status": "completed" }
/// ```
///
/// # Errors
///
/// - `400` when `input` is missing, empty, or not a string
/// - `500` when the interaction fails or the backend cannot be reached
pub async fn chat<A>(
    State(state): State<Arc<ProxyState<A>>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ProxyChatResponse>, ApiError>
where
    A: InteractionsApi + 'static,
{
    let Json(body) = body.map_err(|e| {
        tracing::debug!(error = %e, "Rejected chat request body");
        ApiError::BadRequest(INVALID_INPUT.to_string())
    })?;
    let (input, history) = parse_body(&body)?;
    let context = conversation_context(&history, &input);

    tracing::debug!(
        history = history.len(),
        context_len = context.len(),
        model = %state.config.model,
        "Creating interaction"
    );

    let interaction = state.api.create(&state.config.model, &context).await?;
    if interaction.is_failed() {
        tracing::warn!(interaction_id = ?interaction.id, "Interaction failed");
        return Err(ApiError::Internal(INTERACTION_FAILED.to_string()));
    }

    let mut text = interaction
        .last_text()
        .unwrap_or(EMPTY_REPLY)
        .to_string();

    if let (true, Some(id)) = (interaction.is_in_progress(), interaction.id.as_deref()) {
        tokio::time::sleep(state.config.poll_delay()).await;
        match state.api.get(id).await {
            Ok(updated) => {
                if let Some(latest) = updated.last_text() {
                    text = latest.to_string();
                }
            }
            Err(e) => {
                tracing::warn!(interaction_id = %id, error = %e, "Error polling interaction");
            }
        }
    }

    Ok(Json(ProxyChatResponse {
        success: true,
        text: Some(text),
        interaction_id: interaction.id,
        status: Some(interaction.status),
        error: None,
    }))
}
