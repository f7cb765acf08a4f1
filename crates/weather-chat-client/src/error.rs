//! Error types for the chat client.

use thiserror::Error;
use weather_chat_core::ERROR_SENTINEL;

/// A result type using `ChatError`.
pub type Result<T> = std::result::Result<T, ChatError>;

/// Errors that can end an exchange.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    /// The input was rejected before any network call.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The client or backend is misconfigured.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The request could not be sent or timed out.
    #[error("network error: {0}")]
    Network(String),

    /// The backend answered with a failure.
    #[error("{message}")]
    Upstream {
        /// HTTP status, when the failure came with one.
        status: Option<u16>,
        /// Backend-provided description.
        message: String,
    },

    /// The backend's response could not be understood.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The exchange was superseded or cancelled.
    #[error("request cancelled")]
    Cancelled,
}

impl ChatError {
    /// Check if this error means the exchange was abandoned rather than failed.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Check if sending the same message again may succeed.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Upstream { status: None, .. } => true,
            Self::Upstream {
                status: Some(status),
                ..
            } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Text shown in place of the agent's reply when the exchange failed.
    ///
    /// Always starts with [`ERROR_SENTINEL`].
    #[must_use]
    pub fn user_message(&self) -> String {
        let text = self.to_string();
        let hint = if text.contains("API key") {
            "API key is missing or invalid. Please check the backend configuration."
        } else if text.contains("Connection") || text.contains("network") {
            "Connection error. Please check your internet connection and try again."
        } else if text.contains("model") {
            "Model error. Please check if the model name is correct."
        } else {
            "Please try again."
        };
        format!("{ERROR_SENTINEL} {hint}")
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Protocol(e.to_string())
        } else if e.is_builder() {
            Self::Configuration(e.to_string())
        } else if e.is_timeout() {
            Self::Network(format!("request timed out: {e}"))
        } else {
            Self::Network(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upstream(message: &str) -> ChatError {
        ChatError::Upstream {
            status: Some(500),
            message: message.to_string(),
        }
    }

    #[test]
    fn user_messages_start_with_sentinel() {
        let errors = [
            ChatError::InvalidInput("empty".to_string()),
            ChatError::Configuration("API key is not configured".to_string()),
            ChatError::Network("dns failure".to_string()),
            upstream("Interaction failed. Please try again."),
            ChatError::Protocol("bad json".to_string()),
        ];
        for error in errors {
            assert!(error.user_message().starts_with(ERROR_SENTINEL), "{error:?}");
        }
    }

    #[test]
    fn hints_follow_error_text() {
        assert!(upstream("API key is missing or invalid.")
            .user_message()
            .contains("API key"));
        assert!(ChatError::Network("dns failure".to_string())
            .user_message()
            .contains("Connection error"));
        assert!(upstream("Connection reset by peer")
            .user_message()
            .contains("Connection error"));
        assert!(upstream("unknown model 'gemini-x'")
            .user_message()
            .contains("Model error"));
        assert_eq!(
            upstream("Interaction failed.").user_message(),
            "Sorry, I encountered an error. Please try again."
        );
    }

    #[test]
    fn api_key_hint_wins_over_connection_hint() {
        let error = upstream("Connection refused: API key rejected");
        assert!(error.user_message().contains("API key"));
    }

    #[test]
    fn retriable_classification() {
        assert!(ChatError::Network("x".to_string()).is_retriable());
        assert!(upstream("x").is_retriable());
        assert!(ChatError::Upstream { status: Some(429), message: String::new() }.is_retriable());
        assert!(!ChatError::Upstream { status: Some(400), message: String::new() }.is_retriable());
        assert!(!ChatError::Cancelled.is_retriable());
        assert!(ChatError::Cancelled.is_cancelled());
    }

    #[test]
    fn upstream_display_is_backend_text() {
        assert_eq!(upstream("Interaction failed.").to_string(), "Interaction failed.");
    }
}
