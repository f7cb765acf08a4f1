//! HTTP proxy for the weather chat.
//!
//! The proxy accepts `POST /api/chat` with the user's input and the prior
//! conversation, flattens both into one prompt, and forwards it to the
//! generative-language interactions API. The reply is returned as a single
//! JSON envelope; nothing is streamed.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use weather_chat_proxy::{create_router, HttpInteractionsClient, ProxyConfig, ProxyState};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ProxyConfig {
//!     api_key: std::env::var("GOOGLE_GENAI_API_KEY").ok(),
//!     ..ProxyConfig::default()
//! };
//! let api = HttpInteractionsClient::new(
//!     config.genai_base_url.clone(),
//!     config.api_key.clone(),
//!     config.request_timeout(),
//! )?;
//!
//! let app = create_router(ProxyState::new(Arc::new(api), config));
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod genai;
pub mod handlers;
pub mod routes;
pub mod state;

pub use config::ProxyConfig;
pub use error::{ApiError, GenAiError};
pub use genai::{HttpInteractionsClient, Interaction, InteractionOutput, InteractionsApi};
pub use routes::create_router;
pub use state::ProxyState;
