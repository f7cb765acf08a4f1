//! The chat client: conversation state plus single-flight exchanges.
//!
//! `ChatClient` owns a [`ChatState`] behind a mutex and drives exchanges through
//! an [`AgentTransport`]. At most one exchange is in flight: starting a new one
//! cancels the previous one, and every state mutation an exchange makes is applied
//! only while its serial is still the current one, so a superseded exchange can
//! never touch the conversation after its successor has started.
//!
//! Every state change is announced on a revision channel that front ends can
//! watch and mirrored to the [`ThreadRepository`] (best effort). Streamed text
//! is saved at most once per `DELTA_SAVE_INTERVAL`; the finished reply always is.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use weather_chat_core::wire::HistoryEntry;
use weather_chat_core::{
    ChatState, MessageDraft, MessageId, MessageUpdate, Role, ThreadId, WeatherData, EMPTY_REPLY,
};
use weather_chat_store::{KeyValueStore, ThreadRepository};

use crate::config::ClientConfig;
use crate::error::{ChatError, Result};
use crate::transport::{transport_from_config, AgentTransport, ExchangeRequest, TransportEvent};

/// How an exchange ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeOutcome {
    /// The placeholder was finalized with the agent's reply.
    Completed,
    /// The placeholder was replaced with an error message.
    Failed,
    /// A newer exchange (or an explicit cancel) took over; nothing was changed.
    Superseded,
    /// Nothing was sent (retry of an unknown or non-user message).
    Skipped,
}

/// The exchange currently allowed to mutate state.
#[derive(Debug)]
struct InFlight {
    serial: u64,
    token: CancellationToken,
    thread_id: ThreadId,
    placeholder_id: MessageId,
}

/// Minimum time between saves caused by streamed text alone.
const DELTA_SAVE_INTERVAL: Duration = Duration::from_millis(500);

struct Shared {
    state: ChatState,
    in_flight: Option<InFlight>,
    next_serial: u64,
    last_saved: Option<Instant>,
}

/// Handle to a started exchange, held by the task driving it.
struct Exchange {
    serial: u64,
    token: CancellationToken,
    thread_id: ThreadId,
    placeholder_id: MessageId,
    request: ExchangeRequest,
}

struct Inner {
    transport: Arc<dyn AgentTransport>,
    repository: ThreadRepository<Arc<dyn KeyValueStore>>,
    shared: Mutex<Shared>,
    revision: watch::Sender<u64>,
}

/// The chat client. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct ChatClient {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatClient")
            .field("transport", &self.inner.transport.name())
            .finish_non_exhaustive()
    }
}

impl ChatClient {
    /// Create a client, restoring threads from `store`.
    #[must_use]
    pub fn new(transport: Arc<dyn AgentTransport>, store: Arc<dyn KeyValueStore>) -> Self {
        let repository = ThreadRepository::new(store);
        let state = ChatState::restore(repository.load());
        tracing::info!(
            transport = transport.name(),
            threads = state.threads().len(),
            "Chat client ready"
        );

        let (revision, _) = watch::channel(0);
        let client = Self {
            inner: Arc::new(Inner {
                transport,
                repository,
                shared: Mutex::new(Shared {
                    state,
                    in_flight: None,
                    next_serial: 0,
                    last_saved: None,
                }),
                revision,
            }),
        };
        client.commit(&mut client.inner.shared.lock());
        client
    }

    /// Create a client using the transport selected by `config`.
    ///
    /// # Errors
    ///
    /// Returns `ChatError::Configuration` if the transport cannot be created.
    pub fn from_config(config: &ClientConfig, store: Arc<dyn KeyValueStore>) -> Result<Self> {
        Ok(Self::new(transport_from_config(config)?, store))
    }

    // =========================================================================
    // Observation
    // =========================================================================

    /// A copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> ChatState {
        self.inner.shared.lock().state.clone()
    }

    /// Subscribe to state changes. The value is a revision counter bumped on
    /// every change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.revision.subscribe()
    }

    // =========================================================================
    // Exchanges
    // =========================================================================

    /// Send a message in the active thread and wait for the exchange to end.
    ///
    /// Failures of the exchange itself are recorded in the conversation (the
    /// placeholder is replaced with an error message and the aggregate error is
    /// set); they are reported through the returned outcome, not as `Err`.
    ///
    /// # Errors
    ///
    /// Returns `ChatError::InvalidInput` if the trimmed content is empty or there
    /// is no active thread. Nothing is sent in that case.
    pub async fn send_message(&self, content: &str) -> Result<ExchangeOutcome> {
        let input = content.trim();
        if input.is_empty() {
            return Err(ChatError::InvalidInput("message is empty".to_string()));
        }

        let exchange = self.begin_exchange(input)?;
        let result = self.drive(&exchange).await;
        Ok(self.finish_exchange(&exchange, result))
    }

    /// Send a user message again.
    ///
    /// Agent messages that come after it in its thread are removed first; the user
    /// message itself stays. Unknown IDs and agent-authored IDs are ignored.
    ///
    /// # Errors
    ///
    /// Same as [`ChatClient::send_message`].
    pub async fn retry_message(&self, message_id: &MessageId) -> Result<ExchangeOutcome> {
        let content = {
            let mut shared = self.inner.shared.lock();
            let Some(thread_id) = shared.state.active_thread_id().cloned() else {
                return Ok(ExchangeOutcome::Skipped);
            };
            let content = match shared
                .state
                .thread(&thread_id)
                .and_then(|t| t.message(message_id))
            {
                Some(message) if message.role == Role::User => message.content.clone(),
                _ => {
                    tracing::debug!(message_id = %message_id, "Ignoring retry of unknown or agent message");
                    return Ok(ExchangeOutcome::Skipped);
                }
            };

            let removed = shared.state.prune_agent_replies_after(&thread_id, message_id);
            tracing::debug!(message_id = %message_id, removed, "Retrying message");
            self.commit(&mut shared);
            content
        };

        self.send_message(&content).await
    }

    /// Find the user message a retry of `agent_message_id` should resend: the
    /// closest user message before it in the active thread.
    #[must_use]
    pub fn retry_target(&self, agent_message_id: &MessageId) -> Option<MessageId> {
        let shared = self.inner.shared.lock();
        let thread = shared.state.active_thread()?;
        let agent = thread.message(agent_message_id).filter(|m| m.is_agent())?;
        thread
            .messages
            .iter()
            .rev()
            .find(|m| m.is_user() && m.seq < agent.seq)
            .map(|m| m.id.clone())
    }

    /// Cancel the in-flight exchange, if any. Returns `true` if one was cancelled.
    pub fn cancel(&self) -> bool {
        let mut shared = self.inner.shared.lock();
        let cancelled = Self::supersede(&mut shared);
        if cancelled {
            shared.state.end_exchange();
            self.commit(&mut shared);
        }
        cancelled
    }

    /// Under the lock: cancel the previous exchange, append the user message and
    /// placeholder, install the new token.
    fn begin_exchange(&self, input: &str) -> Result<Exchange> {
        let mut shared = self.inner.shared.lock();
        let thread_id = shared
            .state
            .active_thread_id()
            .cloned()
            .ok_or_else(|| ChatError::InvalidInput("no active thread".to_string()))?;

        Self::supersede(&mut shared);

        let history: Vec<HistoryEntry> = if self.inner.transport.wants_history() {
            shared
                .state
                .thread(&thread_id)
                .map(|t| t.messages.iter().map(HistoryEntry::from).collect())
                .unwrap_or_default()
        } else {
            Vec::new()
        };

        shared
            .state
            .add_message_to(&thread_id, MessageDraft::user(input))
            .ok_or_else(|| ChatError::InvalidInput("no active thread".to_string()))?;
        let placeholder = shared
            .state
            .add_message_to(&thread_id, MessageDraft::agent_placeholder())
            .ok_or_else(|| ChatError::InvalidInput("no active thread".to_string()))?;
        shared.state.begin_exchange();

        shared.next_serial += 1;
        let serial = shared.next_serial;
        let token = CancellationToken::new();
        shared.in_flight = Some(InFlight {
            serial,
            token: token.clone(),
            thread_id: thread_id.clone(),
            placeholder_id: placeholder.id.clone(),
        });
        self.commit(&mut shared);

        tracing::debug!(
            serial,
            thread_id = %thread_id,
            history = history.len(),
            transport = self.inner.transport.name(),
            "Starting exchange"
        );

        Ok(Exchange {
            serial,
            token,
            thread_id,
            placeholder_id: placeholder.id,
            request: ExchangeRequest {
                input: input.to_string(),
                history,
            },
        })
    }

    /// Cancel and forget the in-flight exchange. Its placeholder stops streaming
    /// but keeps whatever content it had.
    fn supersede(shared: &mut Shared) -> bool {
        let Some(previous) = shared.in_flight.take() else {
            return false;
        };
        previous.token.cancel();
        shared.state.update_message_in(
            &previous.thread_id,
            &previous.placeholder_id,
            MessageUpdate::new().streaming(false),
        );
        tracing::debug!(serial = previous.serial, "Superseded in-flight exchange");
        true
    }

    async fn drive(&self, exchange: &Exchange) -> Result<(String, Option<WeatherData>)> {
        let token = &exchange.token;

        let mut events = tokio::select! {
            biased;
            () = token.cancelled() => return Err(ChatError::Cancelled),
            opened = self.inner.transport.open(exchange.request.clone()) => opened?,
        };

        let mut text = String::new();
        let mut weather = None;
        loop {
            let next = tokio::select! {
                biased;
                () = token.cancelled() => return Err(ChatError::Cancelled),
                next = events.next() => next,
            };

            match next {
                None | Some(Ok(TransportEvent::Done)) => break,
                Some(Err(e)) => return Err(e),
                Some(Ok(TransportEvent::TextDelta(delta))) => {
                    if delta.is_empty() {
                        continue;
                    }
                    text.push_str(&delta);
                    let update = MessageUpdate::new().content(text.clone()).streaming(true);
                    if !self.apply_if_current(exchange, update) {
                        return Err(ChatError::Cancelled);
                    }
                }
                Some(Ok(TransportEvent::StructuredResult(result))) => {
                    weather.get_or_insert(result);
                }
                Some(Ok(TransportEvent::MessageId(id))) => {
                    tracing::debug!(serial = exchange.serial, agent_message_id = %id, "Agent turn started");
                }
            }
        }

        Ok((text, weather))
    }

    /// Apply an update to the exchange's placeholder if the exchange is still current.
    fn apply_if_current(&self, exchange: &Exchange, update: MessageUpdate) -> bool {
        let mut shared = self.inner.shared.lock();
        if !Self::is_current(&shared, exchange) {
            return false;
        }
        shared
            .state
            .update_message_in(&exchange.thread_id, &exchange.placeholder_id, update);
        let save_due = match shared.last_saved {
            Some(at) => at.elapsed() >= DELTA_SAVE_INTERVAL,
            None => true,
        };
        if save_due {
            self.commit(&mut shared);
        } else {
            self.notify();
        }
        true
    }

    fn is_current(shared: &Shared, exchange: &Exchange) -> bool {
        shared
            .in_flight
            .as_ref()
            .is_some_and(|f| f.serial == exchange.serial)
    }

    fn finish_exchange(
        &self,
        exchange: &Exchange,
        result: Result<(String, Option<WeatherData>)>,
    ) -> ExchangeOutcome {
        let mut shared = self.inner.shared.lock();
        if !Self::is_current(&shared, exchange) || matches!(result, Err(ChatError::Cancelled)) {
            tracing::debug!(serial = exchange.serial, "Abandoning superseded exchange");
            return ExchangeOutcome::Superseded;
        }

        let outcome = match result {
            Ok((text, weather)) => {
                let content = if text.is_empty() {
                    EMPTY_REPLY.to_string()
                } else {
                    text
                };
                tracing::debug!(
                    serial = exchange.serial,
                    len = content.len(),
                    has_weather = weather.is_some(),
                    "Exchange complete"
                );
                shared.state.update_message_in(
                    &exchange.thread_id,
                    &exchange.placeholder_id,
                    MessageUpdate::new()
                        .content(content)
                        .weather(weather)
                        .streaming(false),
                );
                ExchangeOutcome::Completed
            }
            Err(e) => {
                tracing::warn!(serial = exchange.serial, error = %e, "Exchange failed");
                shared.state.update_message_in(
                    &exchange.thread_id,
                    &exchange.placeholder_id,
                    MessageUpdate::new()
                        .content(e.user_message())
                        .streaming(false),
                );
                shared.state.set_error(Some(e.to_string()));
                ExchangeOutcome::Failed
            }
        };

        shared.state.end_exchange();
        shared.in_flight = None;
        self.commit(&mut shared);
        outcome
    }

    // =========================================================================
    // Threads
    // =========================================================================

    /// Create a thread and make it active.
    pub fn create_thread(&self, name: Option<&str>) -> ThreadId {
        self.mutate(|state| state.create_thread(name))
    }

    /// Make a thread active. Returns `false` if it does not exist.
    pub fn switch_thread(&self, id: &ThreadId) -> bool {
        self.mutate(|state| state.switch_thread(id))
    }

    /// Delete a thread. Returns `false` if it does not exist.
    pub fn delete_thread(&self, id: &ThreadId) -> bool {
        self.mutate(|state| state.delete_thread(id))
    }

    /// Rename a thread. Returns `false` if it does not exist.
    pub fn rename_thread(&self, id: &ThreadId, name: &str) -> bool {
        self.mutate(|state| state.rename_thread(id, name))
    }

    /// Empty the active thread.
    pub fn clear_chat(&self) {
        self.mutate(ChatState::clear_chat);
    }

    /// Drop every thread and the persisted copy. Cancels any in-flight exchange.
    pub fn clear_all_data(&self) {
        let mut shared = self.inner.shared.lock();
        Self::supersede(&mut shared);
        shared.state.clear_all();
        if let Err(e) = self.inner.repository.clear() {
            tracing::warn!(error = %e, "Failed to clear stored threads");
        }
        self.commit(&mut shared);
        tracing::info!("Cleared all chat data");
    }

    fn mutate<T>(&self, f: impl FnOnce(&mut ChatState) -> T) -> T {
        let mut shared = self.inner.shared.lock();
        let value = f(&mut shared.state);
        self.commit(&mut shared);
        value
    }

    /// Persist the state and notify subscribers. Must be called with the lock held.
    fn commit(&self, shared: &mut Shared) {
        if let Err(e) = self.inner.repository.save(shared.state.threads()) {
            tracing::warn!(error = %e, "Failed to persist threads");
        }
        shared.last_saved = Some(Instant::now());
        self.notify();
    }

    fn notify(&self) {
        self.inner.revision.send_modify(|revision| *revision += 1);
    }
}
