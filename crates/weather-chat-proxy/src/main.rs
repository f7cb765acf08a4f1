//! Weather chat proxy server.
//!
//! Reads its configuration from flags or the environment, then serves
//! `POST /api/chat` and `GET /health`.

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use weather_chat_proxy::{create_router, HttpInteractionsClient, ProxyConfig, ProxyState};

#[derive(Parser, Debug)]
#[command(name = "weather-chat-proxy", version, about = "Weather chat HTTP proxy")]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:3000")]
    listen_addr: String,

    /// API key for the generative-language backend.
    #[arg(long, env = "GOOGLE_GENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Model used for interactions.
    #[arg(long, env = "GENAI_MODEL", default_value = "gemini-2.5-flash")]
    model: String,

    /// Base URL of the generative-language API.
    #[arg(
        long,
        env = "GENAI_BASE_URL",
        default_value = "https://generativelanguage.googleapis.com"
    )]
    genai_base_url: String,

    /// Delay in milliseconds before polling an in-progress interaction.
    #[arg(long, env = "POLL_DELAY_MS", default_value_t = 1000)]
    poll_delay_ms: u64,

    /// Request timeout in seconds.
    #[arg(long, env = "REQUEST_TIMEOUT_SECONDS", default_value_t = 60)]
    request_timeout_seconds: u64,

    /// Allowed CORS origins, comma separated.
    #[arg(long, env = "CORS_ORIGINS", value_delimiter = ',', default_value = "*")]
    cors_origins: Vec<String>,
}

impl Args {
    fn into_config(self) -> ProxyConfig {
        ProxyConfig {
            listen_addr: self.listen_addr,
            api_key: self.api_key,
            model: self.model,
            genai_base_url: self.genai_base_url,
            poll_delay_ms: self.poll_delay_ms,
            request_timeout_seconds: self.request_timeout_seconds,
            cors_origins: self.cors_origins,
            ..ProxyConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,weather_chat=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Args::parse().into_config();

    tracing::info!(
        listen_addr = %config.listen_addr,
        model = %config.model,
        genai_base_url = %config.genai_base_url,
        api_key_configured = config.api_key.as_deref().is_some_and(|k| !k.trim().is_empty()),
        "Proxy configuration loaded"
    );
    if config.api_key.is_none() {
        tracing::warn!("GOOGLE_GENAI_API_KEY is not set - chat requests will fail");
    }

    let api = HttpInteractionsClient::new(
        config.genai_base_url.clone(),
        config.api_key.clone(),
        config.request_timeout(),
    )?;

    let listen_addr = config.listen_addr.clone();
    let app = create_router(ProxyState::new(Arc::new(api), config));

    tracing::info!(listen_addr = %listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
