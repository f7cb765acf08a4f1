//! Decoder for the agent's line-prefixed streaming protocol.
//!
//! Each line of the response body is `<tag>:<json payload>`:
//!
//! | Tag | Meaning      | Payload                                   |
//! |-----|--------------|-------------------------------------------|
//! | `0` | text delta   | JSON string                               |
//! | `9` | tool call    | `{"toolCallId", "toolName", "args"}`      |
//! | `a` | tool result  | `{"toolCallId", "result"}`                |
//! | `f` | message id   | `{"messageId"}`                           |
//! | `e` | step finish  | any JSON                                  |
//! | `d` | finish       | any JSON                                  |
//! | `3` | error        | JSON string                               |
//!
//! Lines with an unknown tag or an unparseable payload are skipped; they never
//! abort the decode. The decoder keeps only the unconsumed tail of the input, so
//! feeding it chunk by chunk costs time linear in the stream length.

use serde_json::Value;

use crate::types::WeatherData;
use crate::weather::weather_from_value;

/// A tool invocation announced by the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCall {
    /// Tool call ID, if the agent sent one.
    pub id: Option<String>,
    /// Tool name.
    pub name: String,
}

/// One decoded protocol line.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A fragment of conversational text.
    TextDelta(String),
    /// The agent invoked a tool.
    ToolCall(ToolCall),
    /// A tool returned. `weather` is set when the result carries weather data.
    ToolResult {
        /// Tool call ID, if present.
        tool_call_id: Option<String>,
        /// Weather data extracted from the result.
        weather: Option<WeatherData>,
    },
    /// The agent's own identifier for this turn.
    MessageId(String),
    /// A reasoning step finished.
    StepFinish,
    /// The agent finished its reply.
    Done,
    /// The agent reported an error.
    Error(String),
}

/// Cumulative result of decoding a stream so far.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedStream {
    /// All text deltas concatenated in arrival order.
    pub text: String,
    /// First weather result seen.
    pub weather: Option<WeatherData>,
    /// Advisory message ID from the agent.
    pub message_id: Option<String>,
    /// Tool calls in arrival order.
    pub tool_calls: Vec<ToolCall>,
    /// First error reported by the agent.
    pub error: Option<String>,
    /// Whether a finish line has been seen.
    pub done: bool,
}

impl DecodedStream {
    fn apply(&mut self, event: &StreamEvent) {
        match event {
            StreamEvent::TextDelta(text) => self.text.push_str(text),
            StreamEvent::ToolCall(call) => self.tool_calls.push(call.clone()),
            StreamEvent::ToolResult { weather, .. } => {
                if self.weather.is_none() {
                    self.weather.clone_from(weather);
                }
            }
            StreamEvent::MessageId(id) => {
                self.message_id.get_or_insert_with(|| id.clone());
            }
            StreamEvent::StepFinish => {}
            StreamEvent::Done => self.done = true,
            StreamEvent::Error(message) => {
                self.error.get_or_insert_with(|| message.clone());
            }
        }
    }
}

/// Incremental decoder; feed it raw body chunks as they arrive.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    pending: Vec<u8>,
    decoded: DecodedStream,
    skipped: usize,
}

impl StreamDecoder {
    /// Create an empty decoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of the body. Chunks may split lines (and UTF-8 sequences)
    /// anywhere; only complete lines are decoded.
    ///
    /// Returns the events decoded from lines completed by this chunk.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.pending.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(newline) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=newline).collect();
            if let Some(event) = self.take_line(&line[..line.len() - 1]) {
                events.push(event);
            }
        }
        events
    }

    /// Signal end of stream: decode the final line even if it lacks a newline.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        let rest = std::mem::take(&mut self.pending);
        self.take_line(&rest).into_iter().collect()
    }

    /// The cumulative result so far.
    #[must_use]
    pub fn decoded(&self) -> &DecodedStream {
        &self.decoded
    }

    /// Consume the decoder, returning the cumulative result.
    #[must_use]
    pub fn into_decoded(self) -> DecodedStream {
        self.decoded
    }

    /// Number of non-empty lines that were skipped as malformed or unknown.
    #[must_use]
    pub fn skipped_lines(&self) -> usize {
        self.skipped
    }

    fn take_line(&mut self, raw: &[u8]) -> Option<StreamEvent> {
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        if raw.iter().all(u8::is_ascii_whitespace) {
            return None;
        }

        let line = String::from_utf8_lossy(raw);
        match decode_line(&line) {
            Some(event) => {
                self.decoded.apply(&event);
                Some(event)
            }
            None => {
                self.skipped += 1;
                tracing::debug!(line = %line, "Skipping unrecognized stream line");
                None
            }
        }
    }
}

/// Decode a single protocol line (without its newline).
///
/// Returns `None` for unknown tags and malformed payloads.
#[must_use]
pub fn decode_line(line: &str) -> Option<StreamEvent> {
    let (tag, payload) = line.split_once(':')?;
    let payload: Value = serde_json::from_str(payload.trim()).ok()?;

    match tag.trim() {
        "0" => payload.as_str().map(|text| StreamEvent::TextDelta(text.to_string())),
        "9" => {
            let name = payload.get("toolName")?.as_str()?.to_string();
            Some(StreamEvent::ToolCall(ToolCall {
                id: string_field(&payload, "toolCallId"),
                name,
            }))
        }
        "a" => {
            if !payload.is_object() {
                return None;
            }
            Some(StreamEvent::ToolResult {
                tool_call_id: string_field(&payload, "toolCallId"),
                weather: weather_from_value(&payload),
            })
        }
        "f" => string_field(&payload, "messageId").map(StreamEvent::MessageId),
        "e" => Some(StreamEvent::StepFinish),
        "d" => Some(StreamEvent::Done),
        "3" => Some(StreamEvent::Error(
            payload
                .as_str()
                .map_or_else(|| payload.to_string(), str::to_string),
        )),
        _ => None,
    }
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Decode a whole buffer from scratch.
///
/// A trailing line without a newline is treated as still in transit and ignored,
/// so decoding `buffer` and then `buffer + more` always yields a result whose text
/// starts with the earlier text.
#[must_use]
pub fn decode_stream(buffer: &str) -> DecodedStream {
    let mut decoder = StreamDecoder::new();
    decoder.push(buffer.as_bytes());
    decoder.into_decoded()
}
