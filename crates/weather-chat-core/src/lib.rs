//! Core types and state management for weather-chat.
//!
//! This crate provides the pieces of the chat client that do not touch the network
//! or the disk:
//!
//! - **Identifiers**: opaque, time-prefixed IDs for threads and messages
//! - **Data model**: messages, threads and the structured weather payload
//! - **Stream decoding**: the line-prefixed streaming protocol spoken by the agent
//! - **Conversation state**: the `ChatState` aggregate and its mutations
//! - **Wire types**: request and response bodies shared by the client and the proxy
//!
//! # Example
//!
//! ```
//! use weather_chat_core::{ChatState, MessageDraft, StreamDecoder};
//!
//! let mut state = ChatState::restore(Vec::new());
//! state.add_message(MessageDraft::user("Weather in Oslo?"));
//!
//! let mut decoder = StreamDecoder::new();
//! decoder.push(b"0:\"Cold and \"\n0:\"windy.\"\n");
//! assert_eq!(decoder.decoded().text, "Cold and windy.");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod conversation;
pub mod decoder;
pub mod ids;
pub mod time;
pub mod types;
pub mod weather;
pub mod wire;

pub use conversation::{ChatState, DEFAULT_THREAD_NAME};
pub use decoder::{decode_line, decode_stream, DecodedStream, StreamDecoder, StreamEvent, ToolCall};
pub use ids::{IdError, MessageId, ThreadId};
pub use types::{
    Message, MessageDraft, MessageUpdate, Role, Thread, WeatherData, EMPTY_REPLY, ERROR_SENTINEL,
    PLACEHOLDER_CONTENT,
};
pub use weather::{extract_weather_data, weather_from_value};
