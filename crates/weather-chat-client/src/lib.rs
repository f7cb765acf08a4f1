//! Chat client for the weather agent.
//!
//! This crate ties the conversation state from `weather-chat-core` to the network:
//!
//! - [`ChatClient`]: owns the conversation, runs single-flight exchanges, persists
//!   every change through a `weather-chat-store` repository
//! - [`AgentTransport`]: the backend seam, with [`ProxyTransport`] (one JSON
//!   envelope from `POST /api/chat`) and [`DirectTransport`] (the agent's
//!   line-prefixed stream)
//! - [`ChatError`]: the exchange error taxonomy and its user-facing messages
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use weather_chat_client::{ChatClient, ClientConfig};
//! use weather_chat_store::MemoryStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ChatClient::from_config(&ClientConfig::default(), Arc::new(MemoryStore::new()))?;
//! client.send_message("What's the weather in Tokyo?").await?;
//!
//! for message in client.snapshot().messages() {
//!     println!("{}: {}", message.role.as_str(), message.content);
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod error;
pub mod transport;

pub use client::{ChatClient, ExchangeOutcome};
pub use config::{BackendMode, ClientConfig, RequestTuning};
pub use error::{ChatError, Result};
pub use transport::{
    transport_from_config, AgentTransport, DirectTransport, EventStream, ExchangeRequest,
    ProxyTransport, TransportEvent,
};
