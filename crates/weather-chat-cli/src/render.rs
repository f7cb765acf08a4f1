//! Plain-text rendering of conversation state.

use std::collections::HashSet;
use std::fmt::Write as _;

use chrono::Local;
use weather_chat_core::{ChatState, Message, MessageId, Role, ThreadId, WeatherData};

/// Format a weather card as indented lines.
#[must_use]
pub fn format_weather(weather: &WeatherData) -> String {
    let place = if weather.location.is_empty() {
        "Weather"
    } else {
        weather.location.as_str()
    };
    let mut out = format!("  [{place}]");
    if !weather.conditions.is_empty() {
        let _ = write!(out, " {}", weather.conditions);
    }
    let _ = write!(
        out,
        "\n  {:.1}°C (feels like {:.1}°C), humidity {:.0}%, wind {:.1} km/h (gusts {:.1} km/h)",
        weather.temperature,
        weather.feels_like,
        weather.humidity,
        weather.wind_speed,
        weather.wind_gust,
    );
    out
}

/// Format one finalized message, with its weather card if present.
#[must_use]
pub fn format_message(message: &Message) -> String {
    let time = message.timestamp.with_timezone(&Local).format("%H:%M");
    let speaker = match message.role {
        Role::User => "you",
        Role::Agent => "agent",
    };
    let mut out = format!("[{time}] {speaker}> {}", message.content);
    if let Some(weather) = &message.weather_data {
        out.push('\n');
        out.push_str(&format_weather(weather));
    }
    if message.is_error_reply() {
        out.push_str("\n  (type /retry to send it again)");
    }
    out
}

/// Numbered thread list; the active thread is marked with `*`.
#[must_use]
pub fn format_thread_list(state: &ChatState) -> String {
    let active = state.active_thread_id();
    state
        .threads()
        .iter()
        .enumerate()
        .map(|(i, thread)| {
            let marker = if Some(&thread.id) == active { '*' } else { ' ' };
            format!(
                "{marker} {}. {} ({} messages, updated {})",
                i + 1,
                thread.name,
                thread.messages.len(),
                thread.updated_at.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Tracks what has already been printed so each state revision only emits
/// new lines.
#[derive(Debug, Default)]
pub struct Transcript {
    thread_id: Option<ThreadId>,
    shown: HashSet<MessageId>,
    typing: Option<MessageId>,
}

impl Transcript {
    /// Create an empty transcript.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines to print for the given state.
    ///
    /// Switching threads prints a header and the thread's history. Streaming
    /// messages are announced once and printed in full when finalized.
    pub fn update(&mut self, state: &ChatState) -> Vec<String> {
        let mut lines = Vec::new();

        let Some(thread) = state.active_thread() else {
            self.thread_id = None;
            self.shown.clear();
            return lines;
        };

        if self.thread_id.as_ref() != Some(&thread.id) {
            self.thread_id = Some(thread.id.clone());
            self.shown.clear();
            self.typing = None;
            lines.push(format!("--- {} ---", thread.name));
        }

        self.shown
            .retain(|id| thread.messages.iter().any(|m| &m.id == id));

        for message in &thread.messages {
            if self.shown.contains(&message.id) {
                continue;
            }
            if message.is_streaming {
                if self.typing.as_ref() != Some(&message.id) {
                    self.typing = Some(message.id.clone());
                    lines.push(format!("agent> {}", message.content));
                }
                continue;
            }
            self.shown.insert(message.id.clone());
            lines.push(format_message(message));
        }

        lines
    }
}
