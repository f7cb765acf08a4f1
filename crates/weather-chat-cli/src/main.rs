//! Weather chat terminal client.
//!
//! This is the entry point for the `weather-chat` binary. Lines typed at the
//! prompt are sent to the weather agent; lines starting with `/` are commands
//! (see `/help`).

mod commands;
mod render;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use weather_chat_client::{BackendMode, ChatClient, ClientConfig};
use weather_chat_store::{FileStore, KeyValueStore, MemoryStore};

use commands::{Command, HELP};
use render::{format_thread_list, Transcript};

/// Weather chat - talk to the weather agent from a terminal.
#[derive(Parser, Debug)]
#[command(name = "weather-chat")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Backend: `proxy` (POST /api/chat) or `direct` (agent stream endpoint).
    #[arg(long, env = "WEATHER_CHAT_MODE", default_value = "proxy")]
    mode: BackendMode,

    /// Base URL of the proxy server.
    #[arg(long, env = "WEATHER_CHAT_PROXY_URL")]
    proxy_url: Option<String>,

    /// Agent stream endpoint for direct mode.
    #[arg(long, env = "WEATHER_CHAT_STREAM_ENDPOINT")]
    stream_endpoint: Option<String>,

    /// Seconds to wait for a response to start.
    #[arg(long, env = "WEATHER_CHAT_TIMEOUT")]
    timeout: Option<u64>,

    /// Directory for saved threads.
    #[arg(long, env = "WEATHER_CHAT_DATA_DIR", default_value = ".weather-chat")]
    data_dir: PathBuf,

    /// Keep threads in memory only.
    #[arg(long, default_value = "false")]
    ephemeral: bool,

    /// Enable debug logging.
    #[arg(long, default_value = "false")]
    debug: bool,
}

impl Args {
    fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig {
            mode: self.mode,
            ..ClientConfig::default()
        };
        if let Some(url) = &self.proxy_url {
            config.proxy_url.clone_from(url);
        }
        if let Some(endpoint) = &self.stream_endpoint {
            config.stream_endpoint.clone_from(endpoint);
        }
        if let Some(seconds) = self.timeout {
            config.request_timeout_seconds = seconds;
        }
        config
    }

    fn store(&self) -> anyhow::Result<Arc<dyn KeyValueStore>> {
        if self.ephemeral {
            return Ok(Arc::new(MemoryStore::new()));
        }
        let store = FileStore::open(&self.data_dir)
            .with_context(|| format!("failed to open data directory {}", self.data_dir.display()))?;
        Ok(Arc::new(store))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.debug {
        tracing_subscriber::fmt()
            .with_env_filter("weather_chat=debug,warn")
            .with_writer(std::io::stderr)
            .init();
    }

    let config = args.client_config();
    let client = ChatClient::from_config(&config, args.store()?)?;

    println!(
        "weather-chat ({} mode). Type /help for commands.",
        config.mode
    );

    let renderer = tokio::spawn(render_loop(client.clone()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match commands::parse(&line) {
            Ok(None) => {}
            Ok(Some(Command::Quit)) => break,
            Ok(Some(command)) => handle_command(&client, command),
            Err(e) => eprintln!("{e}"),
        }
    }

    client.cancel();
    renderer.abort();
    Ok(())
}

/// Print new transcript lines whenever the conversation changes.
async fn render_loop(client: ChatClient) {
    let mut revisions = client.subscribe();
    let mut transcript = Transcript::new();
    loop {
        for line in transcript.update(&client.snapshot()) {
            println!("{line}");
        }
        if revisions.changed().await.is_err() {
            break;
        }
    }
}

fn handle_command(client: &ChatClient, command: Command) {
    match command {
        Command::Send(text) => {
            let client = client.clone();
            tokio::spawn(async move {
                match client.send_message(&text).await {
                    Ok(outcome) => tracing::debug!(?outcome, "Exchange finished"),
                    Err(e) => eprintln!("{e}"),
                }
            });
        }
        Command::Retry => {
            let snapshot = client.snapshot();
            let target = snapshot
                .messages()
                .iter()
                .rev()
                .find(|m| m.is_error_reply())
                .and_then(|m| client.retry_target(&m.id));
            let Some(target) = target else {
                println!("Nothing to retry.");
                return;
            };
            let client = client.clone();
            tokio::spawn(async move {
                match client.retry_message(&target).await {
                    Ok(outcome) => tracing::debug!(?outcome, "Retry finished"),
                    Err(e) => eprintln!("{e}"),
                }
            });
        }
        Command::Cancel => {
            if !client.cancel() {
                println!("Nothing in flight.");
            }
        }
        Command::NewThread(name) => {
            client.create_thread(name.as_deref());
        }
        Command::Threads => println!("{}", format_thread_list(&client.snapshot())),
        Command::Switch(n) => match thread_at(client, n) {
            Some(id) => {
                client.switch_thread(&id);
            }
            None => println!("No thread {n}."),
        },
        Command::Rename(name) => {
            let snapshot = client.snapshot();
            match snapshot.active_thread_id() {
                Some(id) => {
                    client.rename_thread(id, &name);
                    println!("Renamed to {name}.");
                }
                None => println!("No active thread."),
            }
        }
        Command::Delete(index) => {
            let id = match index {
                Some(n) => thread_at(client, n),
                None => client.snapshot().active_thread_id().cloned(),
            };
            match id {
                Some(id) if client.delete_thread(&id) => {
                    if client.snapshot().threads().is_empty() {
                        client.create_thread(None);
                    }
                }
                _ => println!("No such thread."),
            }
        }
        Command::Clear => {
            client.clear_chat();
            println!("Cleared.");
        }
        Command::Reset => {
            client.clear_all_data();
            client.create_thread(None);
        }
        Command::Help => println!("{HELP}"),
        Command::Quit => {}
    }
}

fn thread_at(client: &ChatClient, n: usize) -> Option<weather_chat_core::ThreadId> {
    client
        .snapshot()
        .threads()
        .get(n - 1)
        .map(|t| t.id.clone())
}
