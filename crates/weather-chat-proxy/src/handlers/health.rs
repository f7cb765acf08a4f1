//! Liveness endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::genai::InteractionsApi;
use crate::state::ProxyState;

/// Body of `GET /health`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Always `"healthy"` while the process serves requests.
    pub status: &'static str,
    /// Crate version.
    pub version: &'static str,
    /// Model used for interactions.
    pub model: String,
    /// Whether an API key is configured; chat requests fail until it is.
    pub api_key_configured: bool,
}

/// `GET /health`.
pub async fn health<A>(State(state): State<Arc<ProxyState<A>>>) -> Json<HealthResponse>
where
    A: InteractionsApi + 'static,
{
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        model: state.config.model.clone(),
        api_key_configured: state
            .config
            .api_key
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty()),
    })
}
