//! Transport for the agent's streaming endpoint.

use std::collections::VecDeque;
use std::fmt::Display;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, Stream, StreamExt};
use serde_json::Map;
use weather_chat_core::wire::{AgentStreamMessage, AgentStreamRequest};
use weather_chat_core::{StreamDecoder, StreamEvent};

use super::{build_http_client, error_from_response, AgentTransport, EventStream, ExchangeRequest, TransportEvent};
use crate::config::{ClientConfig, RequestTuning};
use crate::error::{ChatError, Result};

/// Posts the user input to the agent endpoint and decodes the streamed reply.
#[derive(Debug, Clone)]
pub struct DirectTransport {
    client: reqwest::Client,
    endpoint: String,
    tuning: RequestTuning,
    response_timeout: Duration,
    idle_timeout: Duration,
}

const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

impl DirectTransport {
    /// Create a transport for `config.stream_endpoint`.
    ///
    /// # Errors
    ///
    /// Returns `ChatError::Configuration` if the HTTP client cannot be created.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        // No total timeout: the body may stream for longer than it takes to start.
        let client = build_http_client(config.connect_timeout(), None)?;
        Ok(Self::with_client(
            client,
            &config.stream_endpoint,
            config.tuning.clone(),
            config.request_timeout(),
        )
        .with_idle_timeout(config.stream_idle_timeout()))
    }

    /// Create a transport with a custom reqwest client.
    #[must_use]
    pub fn with_client(
        client: reqwest::Client,
        endpoint: &str,
        tuning: RequestTuning,
        response_timeout: Duration,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.to_string(),
            tuning,
            response_timeout,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }

    /// Fail the stream when no body data arrives for `idle_timeout`.
    #[must_use]
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    fn body(&self, input: String) -> AgentStreamRequest {
        AgentStreamRequest {
            messages: vec![AgentStreamMessage {
                role: "user".to_string(),
                content: input,
            }],
            run_id: self.tuning.run_id.clone(),
            max_retries: self.tuning.max_retries,
            max_steps: self.tuning.max_steps,
            temperature: self.tuning.temperature,
            top_p: self.tuning.top_p,
            runtime_context: Map::new(),
            thread_id: self.tuning.thread_id.clone(),
            resource_id: self.tuning.resource_id.clone(),
        }
    }
}

#[async_trait]
impl AgentTransport for DirectTransport {
    async fn open(&self, request: ExchangeRequest) -> Result<EventStream> {
        let send = self
            .client
            .post(&self.endpoint)
            .json(&self.body(request.input))
            .send();

        let response = tokio::time::timeout(self.response_timeout, send)
            .await
            .map_err(|_| {
                ChatError::Network(format!(
                    "no response within {}s",
                    self.response_timeout.as_secs()
                ))
            })??;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        tracing::debug!(endpoint = %self.endpoint, "Agent stream opened");
        Ok(decode_body(response.bytes_stream(), self.idle_timeout))
    }

    fn name(&self) -> &'static str {
        "direct"
    }
}

struct DecodeState<S> {
    body: Pin<Box<S>>,
    decoder: StreamDecoder,
    queue: VecDeque<Result<TransportEvent>>,
    idle_timeout: Duration,
    finished: bool,
}

impl<S> DecodeState<S> {
    fn enqueue(&mut self, events: Vec<StreamEvent>) {
        self.queue.extend(events.into_iter().filter_map(normalize));
    }
}

/// Feed body chunks through the line decoder, yielding normalized events.
///
/// The stream fails with a network error if the body goes quiet for longer than
/// `idle_timeout`.
fn decode_body<S, B, E>(body: S, idle_timeout: Duration) -> EventStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = DecodeState {
        body: Box::pin(body),
        decoder: StreamDecoder::new(),
        queue: VecDeque::new(),
        idle_timeout,
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(event) = state.queue.pop_front() {
                return Some((event, state));
            }
            if state.finished {
                return None;
            }

            let Ok(next) = tokio::time::timeout(state.idle_timeout, state.body.next()).await else {
                state.finished = true;
                state.queue.push_back(Err(ChatError::Network(format!(
                    "stream stalled: no data for {}s",
                    state.idle_timeout.as_secs()
                ))));
                continue;
            };

            match next {
                Some(Ok(chunk)) => {
                    let events = state.decoder.push(chunk.as_ref());
                    state.enqueue(events);
                }
                Some(Err(e)) => {
                    state.finished = true;
                    state
                        .queue
                        .push_back(Err(ChatError::Network(format!("stream read failed: {e}"))));
                }
                None => {
                    state.finished = true;
                    let events = state.decoder.finish();
                    state.enqueue(events);
                    if state.decoder.skipped_lines() > 0 {
                        tracing::debug!(
                            skipped = state.decoder.skipped_lines(),
                            "Agent stream contained unrecognized lines"
                        );
                    }
                }
            }
        }
    })
    .boxed()
}

fn normalize(event: StreamEvent) -> Option<Result<TransportEvent>> {
    match event {
        StreamEvent::TextDelta(text) => Some(Ok(TransportEvent::TextDelta(text))),
        StreamEvent::ToolResult {
            weather: Some(weather),
            ..
        } => Some(Ok(TransportEvent::StructuredResult(weather))),
        StreamEvent::MessageId(id) => Some(Ok(TransportEvent::MessageId(id))),
        StreamEvent::Done => Some(Ok(TransportEvent::Done)),
        StreamEvent::Error(message) => Some(Err(ChatError::Upstream {
            status: None,
            message,
        })),
        StreamEvent::ToolCall(call) => {
            tracing::debug!(tool = %call.name, id = ?call.id, "Agent invoked tool");
            None
        }
        StreamEvent::ToolResult { weather: None, .. } | StreamEvent::StepFinish => None,
    }
}

#[cfg(test)]
mod tests {
    use futures::TryStreamExt;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    const BODY: &str = concat!(
        "f:{\"messageId\":\"msg-1\"}\n",
        "9:{\"toolCallId\":\"c1\",\"toolName\":\"weatherTool\",\"args\":{\"location\":\"Paris\"}}\n",
        "a:{\"toolCallId\":\"c1\",\"result\":{\"temperature\":20,\"feelsLike\":21,\"humidity\":50,\"windSpeed\":3,\"windGust\":6,\"conditions\":\"Sunny\",\"location\":\"Paris\"}}\n",
        "0:\"Hello \"\n",
        "garbage line\n",
        "0:\"world\"\n",
        "d:{\"finishReason\":\"stop\"}",
    );

    fn transport(server: &MockServer) -> DirectTransport {
        DirectTransport::with_client(
            reqwest::Client::new(),
            &format!("{}/api/agents/weatherAgent/stream", server.uri()),
            RequestTuning::default(),
            Duration::from_secs(5),
        )
    }

    fn request() -> ExchangeRequest {
        ExchangeRequest {
            input: "Weather in Paris".to_string(),
            history: Vec::new(),
        }
    }

    #[tokio::test]
    async fn posts_tuning_and_decodes_stream() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/agents/weatherAgent/stream"))
            .and(body_partial_json(json!({
                "messages": [{"role": "user", "content": "Weather in Paris"}],
                "runId": "weatherAgent",
                "maxRetries": 2,
                "maxSteps": 5,
                "runtimeContext": {},
                "resourceId": "weatherAgent"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string(BODY))
            .expect(1)
            .mount(&server)
            .await;

        let events: Vec<_> = transport(&server)
            .open(request())
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();

        assert_eq!(events[0], TransportEvent::MessageId("msg-1".to_string()));
        assert!(matches!(&events[1], TransportEvent::StructuredResult(w) if w.location == "Paris"));
        assert_eq!(
            &events[2..],
            &[
                TransportEvent::TextDelta("Hello ".to_string()),
                TransportEvent::TextDelta("world".to_string()),
                TransportEvent::Done,
            ]
        );
    }

    #[tokio::test]
    async fn error_line_fails_the_stream() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("0:\"Par\"\n3:\"model overloaded\"\n"),
            )
            .mount(&server)
            .await;

        let result: Result<Vec<_>> = transport(&server).open(request()).await.unwrap().try_collect().await;
        assert_eq!(
            result.unwrap_err(),
            ChatError::Upstream {
                status: None,
                message: "model overloaded".to_string()
            }
        );
    }

    #[tokio::test]
    async fn http_error_is_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&server)
            .await;

        let error = transport(&server).open(request()).await.err().unwrap();
        assert!(matches!(error, ChatError::Upstream { status: Some(503), .. }));
        assert!(error.is_retriable());
    }

    #[tokio::test]
    async fn slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("0:\"late\"\n")
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let transport = DirectTransport::with_client(
            reqwest::Client::new(),
            &server.uri(),
            RequestTuning::default(),
            Duration::from_millis(100),
        );
        let error = transport.open(request()).await.err().unwrap();
        assert!(matches!(error, ChatError::Network(_)));
    }

    #[tokio::test]
    async fn chunked_body_is_decoded_across_splits() {
        let chunks: Vec<std::io::Result<Vec<u8>>> =
            BODY.as_bytes().chunks(5).map(|c| Ok(c.to_vec())).collect();

        let events: Vec<_> = decode_body(stream::iter(chunks), DEFAULT_IDLE_TIMEOUT)
            .try_collect()
            .await
            .unwrap();

        let text: String = events
            .iter()
            .filter_map(|e| match e {
                TransportEvent::TextDelta(t) => Some(t.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(text, "Hello world");
        assert_eq!(events.last(), Some(&TransportEvent::Done));
    }

    #[tokio::test]
    async fn stalled_body_fails_after_idle_timeout() {
        let first: Vec<std::io::Result<Vec<u8>>> = vec![Ok(b"0:\"Cloudy\"\n".to_vec())];
        let body = stream::iter(first).chain(stream::pending());

        let mut events = decode_body(body, Duration::from_millis(50));
        assert_eq!(
            events.next().await,
            Some(Ok(TransportEvent::TextDelta("Cloudy".to_string())))
        );

        let error = events.next().await.unwrap().unwrap_err();
        assert!(matches!(&error, ChatError::Network(m) if m.starts_with("stream stalled")));
        assert!(events.next().await.is_none());
    }
}
