//! Error types for the proxy.
//!
//! `GenAiError` covers calls to the generative-language backend; `ApiError` is
//! what handlers return and renders as `{"error": "..."}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use weather_chat_core::wire::ApiErrorBody;

/// Errors from the generative-language backend.
#[derive(Debug, Error)]
pub enum GenAiError {
    /// No API key configured.
    #[error("Google GenAI API key is not configured. Please set GOOGLE_GENAI_API_KEY.")]
    MissingApiKey,

    /// The request could not be sent.
    #[error("network request failed: {0}")]
    Request(String),

    /// The backend answered with a non-2xx status.
    #[error("interactions API returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body or error description.
        message: String,
    },

    /// The response body could not be decoded.
    #[error("invalid interactions response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for GenAiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Request(e.to_string())
        }
    }
}

/// A result type using `GenAiError`.
pub type Result<T> = std::result::Result<T, GenAiError>;

/// API error type that implements `IntoResponse`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request body.
    #[error("{0}")]
    BadRequest(String),

    /// The interaction could not be completed.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// Get the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ApiErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<GenAiError> for ApiError {
    fn from(err: GenAiError) -> Self {
        tracing::error!(error = %err, "Interaction request failed");

        let text = err.to_string();
        let message = if text.contains("API key") {
            "API key is missing or invalid. Please configure GOOGLE_GENAI_API_KEY.".to_string()
        } else if text.contains("Connection") || text.contains("network") {
            "Connection error. Please check your internet connection.".to_string()
        } else {
            text
        };
        Self::Internal(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_status_codes() {
        assert_eq!(
            ApiError::BadRequest("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Internal("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn genai_errors_map_to_hints() {
        let missing = ApiError::from(GenAiError::MissingApiKey);
        assert!(missing.to_string().starts_with("API key is missing"));

        let network = ApiError::from(GenAiError::Request("dns error".into()));
        assert!(network.to_string().starts_with("Connection error"));

        let other = ApiError::from(GenAiError::Status {
            status: 404,
            message: "unknown model".into(),
        });
        assert_eq!(other.to_string(), "interactions API returned 404: unknown model");
    }
}
