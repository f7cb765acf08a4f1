//! End-to-end exchanges against mocked backends, persisted to a real data directory.

use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;
use weather_chat_client::{BackendMode, ChatClient, ClientConfig, ExchangeOutcome};
use weather_chat_core::ERROR_SENTINEL;
use weather_chat_store::FileStore;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// =============================================================================
// Helpers
// =============================================================================

const AGENT_STREAM: &str = concat!(
    "f:{\"messageId\":\"msg-42\"}\n",
    "9:{\"toolCallId\":\"call-1\",\"toolName\":\"weatherTool\",\"args\":{\"location\":\"Tokyo\"}}\n",
    "a:{\"toolCallId\":\"call-1\",\"result\":{\"temperature\":26.4,\"feelsLike\":28.1,\"humidity\":70,\"windSpeed\":8.2,\"windGust\":15.5,\"conditions\":\"Partly cloudy\",\"location\":\"Tokyo\"}}\n",
    "e:{\"finishReason\":\"tool-calls\"}\n",
    "0:\"It's 26°C \"\n",
    "0:\"and partly cloudy in Tokyo.\"\n",
    "e:{\"finishReason\":\"stop\"}\n",
    "d:{\"finishReason\":\"stop\"}\n",
);

fn direct_config(server: &MockServer) -> ClientConfig {
    ClientConfig {
        mode: BackendMode::Direct,
        stream_endpoint: format!("{}/api/agents/weatherAgent/stream", server.uri()),
        ..ClientConfig::default()
    }
}

fn proxy_config(server: &MockServer) -> ClientConfig {
    ClientConfig {
        mode: BackendMode::Proxy,
        proxy_url: server.uri(),
        ..ClientConfig::default()
    }
}

fn open_store(dir: &TempDir) -> Arc<FileStore> {
    Arc::new(FileStore::open(dir.path()).unwrap())
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn direct_stream_exchange_survives_restart() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/agents/weatherAgent/stream"))
        .respond_with(ResponseTemplate::new(200).set_body_string(AGENT_STREAM))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = direct_config(&server);

    let client = ChatClient::from_config(&config, open_store(&dir)).unwrap();
    let outcome = client.send_message("Weather in Tokyo?").await.unwrap();
    assert_eq!(outcome, ExchangeOutcome::Completed);

    let reply = client.snapshot().messages()[1].clone();
    assert_eq!(reply.content, "It's 26°C and partly cloudy in Tokyo.");
    let weather = reply.weather_data.unwrap();
    assert_eq!(weather.conditions, "Partly cloudy");
    assert!((weather.wind_gust - 15.5).abs() < f64::EPSILON);
    drop(client);

    let restored = ChatClient::from_config(&config, open_store(&dir)).unwrap();
    let state = restored.snapshot();
    assert_eq!(state.messages().len(), 2);
    assert_eq!(state.messages()[1].content, "It's 26°C and partly cloudy in Tokyo.");
    assert!(state.messages()[1].weather_data.is_some());
}

#[tokio::test]
async fn proxy_exchange_with_embedded_weather() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "text": "{\"temperature\": 4, \"feelsLike\": 1, \"humidity\": 85, \"windSpeed\": 20, \"windGust\": 35, \"conditions\": \"Sleet\", \"location\": \"Reykjavik\"}",
            "interactionId": "int-1",
            "status": "completed"
        })))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let client = ChatClient::from_config(&proxy_config(&server), open_store(&dir)).unwrap();
    client.send_message("Reykjavik?").await.unwrap();

    let reply = client.snapshot().messages()[1].clone();
    assert_eq!(reply.weather_data.unwrap().location, "Reykjavik");
}

#[tokio::test]
async fn failed_exchange_can_be_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "error": "Interaction failed. Please try again."
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "text": "Clear skies."
        })))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let client = ChatClient::from_config(&proxy_config(&server), open_store(&dir)).unwrap();

    assert_eq!(client.send_message("Lima?").await.unwrap(), ExchangeOutcome::Failed);
    let state = client.snapshot();
    let failed = state.messages()[1].clone();
    assert!(failed.content.starts_with(ERROR_SENTINEL));
    assert_eq!(state.error(), Some("Interaction failed. Please try again."));

    let target = client.retry_target(&failed.id).unwrap();
    assert_eq!(client.retry_message(&target).await.unwrap(), ExchangeOutcome::Completed);

    let state = client.snapshot();
    assert!(state.error().is_none());
    let contents: Vec<_> = state.messages().iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["Lima?", "Lima?", "Clear skies."]);
}
