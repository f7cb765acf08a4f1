//! Domain types for conversations.
//!
//! Field names serialize in camelCase so the persisted form matches the layout
//! browsers already have in local storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::ids::{MessageId, ThreadId};
use crate::time;

/// Prefix of every agent reply that reports a failed exchange.
///
/// Front ends use it to decide where to offer a retry action.
pub const ERROR_SENTINEL: &str = "Sorry, I encountered an error.";

/// Provisional content of an agent message while the exchange is in flight.
pub const PLACEHOLDER_CONTENT: &str = "Processing weather data...";

/// Content used when an exchange completes without any conversational text.
pub const EMPTY_REPLY: &str = "No response received.";

// =============================================================================
// Weather
// =============================================================================

/// Structured weather result returned by the agent's weather tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherData {
    /// Air temperature.
    #[serde(deserialize_with = "lenient_number")]
    pub temperature: f64,
    /// Apparent ("feels like") temperature.
    #[serde(default, deserialize_with = "lenient_number")]
    pub feels_like: f64,
    /// Relative humidity in percent.
    #[serde(default, deserialize_with = "lenient_number")]
    pub humidity: f64,
    /// Sustained wind speed.
    #[serde(default, deserialize_with = "lenient_number")]
    pub wind_speed: f64,
    /// Wind gust speed.
    #[serde(default, deserialize_with = "lenient_number")]
    pub wind_gust: f64,
    /// Human-readable conditions, e.g. "Partly cloudy".
    #[serde(default)]
    pub conditions: String,
    /// Location the report applies to.
    #[serde(default)]
    pub location: String,
}

/// Accepts `20`, `20.5` and `"20.5"`.
fn lenient_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Number {
        Float(f64),
        Text(String),
    }

    match Number::deserialize(deserializer)? {
        Number::Float(value) => Ok(value),
        Number::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}

// =============================================================================
// Messages
// =============================================================================

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person using the client.
    User,
    /// The remote weather agent.
    Agent,
}

impl Role {
    /// Wire/display string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Agent => "agent",
        }
    }
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique ID within its thread.
    pub id: MessageId,
    /// Position in the thread; strictly increasing in append order.
    #[serde(default)]
    pub seq: u64,
    /// Author.
    pub role: Role,
    /// Text content.
    pub content: String,
    /// Creation time.
    #[serde(with = "time::millis")]
    pub timestamp: DateTime<Utc>,
    /// Whether the message is still receiving streamed content.
    #[serde(default)]
    pub is_streaming: bool,
    /// Structured weather result, if the agent produced one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather_data: Option<WeatherData>,
}

impl Message {
    /// Check if this message was written by the user.
    #[must_use]
    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }

    /// Check if this message was written by the agent.
    #[must_use]
    pub fn is_agent(&self) -> bool {
        self.role == Role::Agent
    }

    /// Check if this is an agent reply reporting a failed exchange.
    #[must_use]
    pub fn is_error_reply(&self) -> bool {
        self.is_agent() && !self.is_streaming && self.content.starts_with(ERROR_SENTINEL)
    }
}

/// The caller-supplied part of a new message; ID, sequence and timestamp are
/// assigned by the conversation state.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageDraft {
    /// Author.
    pub role: Role,
    /// Text content.
    pub content: String,
    /// Whether the message starts out streaming.
    pub is_streaming: bool,
    /// Structured weather result.
    pub weather_data: Option<WeatherData>,
}

impl MessageDraft {
    /// A finished user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            is_streaming: false,
            weather_data: None,
        }
    }

    /// A finished agent message.
    #[must_use]
    pub fn agent(content: impl Into<String>) -> Self {
        Self {
            role: Role::Agent,
            content: content.into(),
            is_streaming: false,
            weather_data: None,
        }
    }

    /// The streaming placeholder appended at the start of an exchange.
    #[must_use]
    pub fn agent_placeholder() -> Self {
        Self {
            is_streaming: true,
            ..Self::agent(PLACEHOLDER_CONTENT)
        }
    }
}

/// A partial update merged into an existing message. `None` fields are left as-is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageUpdate {
    /// Replacement content.
    pub content: Option<String>,
    /// Replacement streaming flag.
    pub is_streaming: Option<bool>,
    /// Replacement weather data; `Some(None)` clears it.
    #[allow(clippy::option_option)]
    pub weather_data: Option<Option<WeatherData>>,
}

impl MessageUpdate {
    /// Start an empty update.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the content.
    #[must_use]
    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Set the streaming flag.
    #[must_use]
    pub fn streaming(mut self, is_streaming: bool) -> Self {
        self.is_streaming = Some(is_streaming);
        self
    }

    /// Set (or clear) the weather data.
    #[must_use]
    pub fn weather(mut self, weather_data: Option<WeatherData>) -> Self {
        self.weather_data = Some(weather_data);
        self
    }

    /// Merge this update into a message.
    pub fn apply(self, message: &mut Message) {
        if let Some(content) = self.content {
            message.content = content;
        }
        if let Some(is_streaming) = self.is_streaming {
            message.is_streaming = is_streaming;
        }
        if let Some(weather_data) = self.weather_data {
            message.weather_data = weather_data;
        }
    }
}

// =============================================================================
// Threads
// =============================================================================

/// One independent conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    /// Unique ID.
    pub id: ThreadId,
    /// Display name.
    pub name: String,
    /// Messages in chronological order.
    pub messages: Vec<Message>,
    /// Creation time.
    #[serde(with = "time::millis")]
    pub created_at: DateTime<Utc>,
    /// Time of the last message mutation.
    #[serde(with = "time::millis")]
    pub updated_at: DateTime<Utc>,
    /// Whether this is the active thread.
    #[serde(default)]
    pub is_active: bool,
}

impl Thread {
    /// Create an empty, inactive thread.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let now = time::now();
        Self {
            id: ThreadId::generate(),
            name: name.into(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
            is_active: false,
        }
    }

    /// Find a message by ID.
    #[must_use]
    pub fn message(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| &m.id == id)
    }

    /// Sequence number for the next appended message.
    #[must_use]
    pub fn next_seq(&self) -> u64 {
        self.messages.last().map_or(0, |m| m.seq + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_message(role: Role, content: &str) -> Message {
        Message {
            id: MessageId::generate(),
            seq: 0,
            role,
            content: content.to_string(),
            timestamp: time::now(),
            is_streaming: false,
            weather_data: None,
        }
    }

    #[test]
    fn weather_data_uses_camel_case() {
        let json = r#"{"temperature":20,"feelsLike":18.5,"humidity":60,"windSpeed":4,"windGust":9,"conditions":"Clear","location":"Oslo"}"#;
        let weather: WeatherData = serde_json::from_str(json).unwrap();
        assert!((weather.feels_like - 18.5).abs() < f64::EPSILON);
        assert_eq!(weather.location, "Oslo");

        let back = serde_json::to_value(&weather).unwrap();
        assert_eq!(back["windGust"], 9.0);
    }

    #[test]
    fn weather_data_tolerates_missing_and_textual_numbers() {
        let weather: WeatherData = serde_json::from_str(r#"{"temperature":"21.5"}"#).unwrap();
        assert!((weather.temperature - 21.5).abs() < f64::EPSILON);
        assert_eq!(weather.humidity, 0.0);
        assert!(weather.conditions.is_empty());

        assert!(serde_json::from_str::<WeatherData>(r#"{"humidity":10}"#).is_err());
    }

    #[test]
    fn role_serialization() {
        assert_eq!(serde_json::to_string(&Role::Agent).unwrap(), "\"agent\"");
        assert_eq!(serde_json::from_str::<Role>("\"user\"").unwrap(), Role::User);
        assert_eq!(Role::User.as_str(), "user");
    }

    #[test]
    fn message_update_merges_only_set_fields() {
        let mut message = sample_message(Role::Agent, PLACEHOLDER_CONTENT);
        message.is_streaming = true;

        MessageUpdate::new().content("Partial").apply(&mut message);
        assert_eq!(message.content, "Partial");
        assert!(message.is_streaming);

        MessageUpdate::new().streaming(false).apply(&mut message);
        assert_eq!(message.content, "Partial");
        assert!(!message.is_streaming);
    }

    #[test]
    fn error_reply_detection() {
        let failed = sample_message(Role::Agent, "Sorry, I encountered an error. Please try again.");
        assert!(failed.is_error_reply());

        let user = sample_message(Role::User, "Sorry, I encountered an error.");
        assert!(!user.is_error_reply());

        let normal = sample_message(Role::Agent, "It is sunny.");
        assert!(!normal.is_error_reply());
    }

    #[test]
    fn next_seq_follows_last_message() {
        let mut thread = Thread::new("Test");
        assert_eq!(thread.next_seq(), 0);

        let mut message = sample_message(Role::User, "hi");
        message.seq = 4;
        thread.messages.push(message);
        assert_eq!(thread.next_seq(), 5);
    }

    #[test]
    fn placeholder_draft_is_streaming() {
        let draft = MessageDraft::agent_placeholder();
        assert_eq!(draft.role, Role::Agent);
        assert_eq!(draft.content, PLACEHOLDER_CONTENT);
        assert!(draft.is_streaming);
    }
}
