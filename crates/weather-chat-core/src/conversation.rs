//! Conversation state: threads, messages and the in-flight flags.
//!
//! `ChatState` is the single source of truth for the chat. Every mutation keeps the
//! active-thread invariant: at most one thread has `is_active == true`, and it is
//! the thread named by `active_thread_id`.

use crate::ids::{MessageId, ThreadId};
use crate::time;
use crate::types::{Message, MessageDraft, MessageUpdate, Role, Thread};

/// Name of the thread synthesized when nothing was restored.
pub const DEFAULT_THREAD_NAME: &str = "Weather Chat";

/// The root aggregate of the chat client.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatState {
    threads: Vec<Thread>,
    active_thread_id: Option<ThreadId>,
    is_loading: bool,
    error: Option<String>,
    is_streaming: bool,
}

impl ChatState {
    /// Create an empty state with no threads.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild state from persisted threads.
    ///
    /// Threads are ordered most recently updated first and the first one becomes
    /// active. Streaming flags left over from an interrupted session are cleared,
    /// and messages whose sequence numbers do not strictly increase (older data
    /// stored without them) are renumbered in stored order.
    /// If `threads` is empty a single default thread is created.
    #[must_use]
    pub fn restore(mut threads: Vec<Thread>) -> Self {
        let mut state = Self::new();

        if threads.is_empty() {
            state.create_thread(Some(DEFAULT_THREAD_NAME));
            return state;
        }

        threads.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        for thread in &mut threads {
            let ordered = thread.messages.windows(2).all(|w| w[0].seq < w[1].seq);
            if !ordered {
                tracing::debug!(thread_id = %thread.id, "Renumbering message sequence");
            }
            for (seq, message) in (0u64..).zip(thread.messages.iter_mut()) {
                message.is_streaming = false;
                if !ordered {
                    message.seq = seq;
                }
            }
        }

        let first = threads[0].id.clone();
        state.threads = threads;
        state.switch_thread(&first);
        state
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// All threads in display order.
    #[must_use]
    pub fn threads(&self) -> &[Thread] {
        &self.threads
    }

    /// Look up a thread by ID.
    #[must_use]
    pub fn thread(&self, id: &ThreadId) -> Option<&Thread> {
        self.threads.iter().find(|t| &t.id == id)
    }

    /// ID of the active thread, if any.
    #[must_use]
    pub fn active_thread_id(&self) -> Option<&ThreadId> {
        self.active_thread_id.as_ref()
    }

    /// The active thread, if any.
    #[must_use]
    pub fn active_thread(&self) -> Option<&Thread> {
        self.active_thread_id.as_ref().and_then(|id| self.thread(id))
    }

    /// Messages of the active thread (empty when there is none).
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        self.active_thread()
            .map(|t| t.messages.as_slice())
            .unwrap_or_default()
    }

    /// Whether an exchange is being set up or is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// Whether an exchange is in flight.
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.is_streaming
    }

    /// Underlying message of the last failed exchange.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    // =========================================================================
    // Threads
    // =========================================================================

    /// Create a thread and make it active.
    ///
    /// Without a name (or with a blank one) the thread is called
    /// `"Weather Chat N"`, where N is the new thread count.
    pub fn create_thread(&mut self, name: Option<&str>) -> ThreadId {
        let name = match name.map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("{DEFAULT_THREAD_NAME} {}", self.threads.len() + 1),
        };

        let thread = Thread::new(name);
        let id = thread.id.clone();
        tracing::debug!(thread_id = %id, name = %thread.name, "Creating thread");

        self.threads.push(thread);
        self.activate(&id);
        id
    }

    /// Make a thread active. Returns `false` (and changes nothing) if it does not exist.
    pub fn switch_thread(&mut self, id: &ThreadId) -> bool {
        if self.thread(id).is_none() {
            return false;
        }
        self.activate(id);
        true
    }

    /// Remove a thread. If it was active, the first remaining thread becomes active.
    ///
    /// Returns `false` if the thread does not exist.
    pub fn delete_thread(&mut self, id: &ThreadId) -> bool {
        let before = self.threads.len();
        self.threads.retain(|t| &t.id != id);
        if self.threads.len() == before {
            return false;
        }

        if self.active_thread_id.as_ref() == Some(id) {
            match self.threads.first().map(|t| t.id.clone()) {
                Some(next) => self.activate(&next),
                None => self.active_thread_id = None,
            }
        }
        tracing::debug!(thread_id = %id, "Deleted thread");
        true
    }

    /// Replace a thread's name. `updated_at` is left untouched.
    pub fn rename_thread(&mut self, id: &ThreadId, name: &str) -> bool {
        match self.thread_mut(id) {
            Some(thread) => {
                thread.name = name.to_string();
                true
            }
            None => false,
        }
    }

    /// Empty the active thread's message list.
    pub fn clear_chat(&mut self) {
        if let Some(thread) = self.active_thread_mut() {
            thread.messages.clear();
            thread.updated_at = time::now();
        }
    }

    /// Drop every thread and reset all flags.
    pub fn clear_all(&mut self) {
        *self = Self::new();
    }

    fn activate(&mut self, id: &ThreadId) {
        for thread in &mut self.threads {
            thread.is_active = &thread.id == id;
        }
        self.active_thread_id = Some(id.clone());
    }

    fn thread_mut(&mut self, id: &ThreadId) -> Option<&mut Thread> {
        self.threads.iter_mut().find(|t| &t.id == id)
    }

    fn active_thread_mut(&mut self) -> Option<&mut Thread> {
        let id = self.active_thread_id.clone()?;
        self.thread_mut(&id)
    }

    // =========================================================================
    // Messages
    // =========================================================================

    /// Append a message to the active thread. Returns `None` if there is no active thread.
    pub fn add_message(&mut self, draft: MessageDraft) -> Option<Message> {
        let id = self.active_thread_id.clone()?;
        self.add_message_to(&id, draft)
    }

    /// Append a message to a specific thread.
    pub fn add_message_to(&mut self, thread_id: &ThreadId, draft: MessageDraft) -> Option<Message> {
        let thread = self.thread_mut(thread_id)?;
        let now = time::now();
        let message = Message {
            id: MessageId::generate(),
            seq: thread.next_seq(),
            role: draft.role,
            content: draft.content,
            timestamp: now,
            is_streaming: draft.is_streaming,
            weather_data: draft.weather_data,
        };
        thread.messages.push(message.clone());
        thread.updated_at = now;
        Some(message)
    }

    /// Merge an update into a message of the active thread.
    ///
    /// Returns `false` if there is no active thread or no such message.
    pub fn update_message(&mut self, message_id: &MessageId, update: MessageUpdate) -> bool {
        match self.active_thread_id.clone() {
            Some(thread_id) => self.update_message_in(&thread_id, message_id, update),
            None => false,
        }
    }

    /// Merge an update into a message of a specific thread.
    pub fn update_message_in(
        &mut self,
        thread_id: &ThreadId,
        message_id: &MessageId,
        update: MessageUpdate,
    ) -> bool {
        let Some(thread) = self.thread_mut(thread_id) else {
            return false;
        };
        let Some(message) = thread.messages.iter_mut().find(|m| &m.id == message_id) else {
            return false;
        };
        update.apply(message);
        thread.updated_at = time::now();
        true
    }

    /// Remove every agent message appended after `message_id` in a thread.
    ///
    /// User messages are kept. Returns the number of messages removed.
    pub fn prune_agent_replies_after(&mut self, thread_id: &ThreadId, message_id: &MessageId) -> usize {
        let Some(thread) = self.thread_mut(thread_id) else {
            return 0;
        };
        let Some(cutoff) = thread.message(message_id).map(|m| m.seq) else {
            return 0;
        };

        let before = thread.messages.len();
        thread
            .messages
            .retain(|m| !(m.role == Role::Agent && m.seq > cutoff));
        let removed = before - thread.messages.len();
        if removed > 0 {
            thread.updated_at = time::now();
        }
        removed
    }

    // =========================================================================
    // Exchange flags
    // =========================================================================

    /// Mark an exchange as started: loading and streaming, no error.
    pub fn begin_exchange(&mut self) {
        self.is_loading = true;
        self.is_streaming = true;
        self.error = None;
    }

    /// Mark the in-flight exchange as finished, whatever its outcome.
    pub fn end_exchange(&mut self) {
        self.is_loading = false;
        self.is_streaming = false;
    }

    /// Record (or clear) the aggregate error.
    pub fn set_error(&mut self, error: Option<String>) {
        self.error = error;
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::types::PLACEHOLDER_CONTENT;

    fn assert_single_active(state: &ChatState) {
        let active: Vec<_> = state.threads().iter().filter(|t| t.is_active).collect();
        match state.active_thread_id() {
            Some(id) => {
                assert_eq!(active.len(), 1);
                assert_eq!(&active[0].id, id);
            }
            None => assert!(active.is_empty()),
        }
    }

    #[test]
    fn restore_empty_creates_default_thread() {
        let state = ChatState::restore(Vec::new());
        assert_eq!(state.threads().len(), 1);
        assert_eq!(state.active_thread().unwrap().name, DEFAULT_THREAD_NAME);
        assert_single_active(&state);
    }

    #[test]
    fn restore_renumbers_messages_stored_without_seq() {
        let stored = serde_json::json!([{
            "id": "thread-1",
            "name": "Lima",
            "messages": [
                {"id": "msg-1", "role": "user", "content": "Lima?", "timestamp": "2024-05-01T12:30:00.000Z", "isStreaming": false},
                {"id": "msg-2", "role": "agent", "content": "Sorry, I encountered an error. Please try again.", "timestamp": "2024-05-01T12:30:01.000Z", "isStreaming": true}
            ],
            "createdAt": "2024-05-01T12:30:00.000Z",
            "updatedAt": "2024-05-01T12:30:01.000Z",
            "isActive": true
        }]);
        let threads: Vec<Thread> = serde_json::from_value(stored).unwrap();
        let mut state = ChatState::restore(threads);

        let seqs: Vec<u64> = state.messages().iter().map(|m| m.seq).collect();
        assert_eq!(seqs, vec![0, 1]);
        assert!(state.messages().iter().all(|m| !m.is_streaming));

        let thread_id = state.active_thread_id().unwrap().clone();
        let user_id = state.messages()[0].id.clone();
        assert_eq!(state.prune_agent_replies_after(&thread_id, &user_id), 1);
        assert_eq!(state.messages().len(), 1);
        assert_eq!(state.add_message(MessageDraft::agent("Sunny.")).unwrap().seq, 1);
    }

    #[test]
    fn restore_orders_by_most_recent_update() {
        let mut old = Thread::new("Old");
        old.updated_at = old.updated_at - Duration::hours(1);
        old.is_active = true;
        let mut recent = Thread::new("Recent");
        recent.messages.push(Message {
            id: MessageId::generate(),
            seq: 0,
            role: Role::Agent,
            content: PLACEHOLDER_CONTENT.to_string(),
            timestamp: time::now(),
            is_streaming: true,
            weather_data: None,
        });

        let state = ChatState::restore(vec![old, recent]);
        assert_eq!(state.threads()[0].name, "Recent");
        assert_eq!(state.active_thread().unwrap().name, "Recent");
        assert!(!state.messages()[0].is_streaming);
        assert_single_active(&state);
    }

    #[test]
    fn create_thread_uses_numbered_default_names() {
        let mut state = ChatState::restore(Vec::new());
        let second = state.create_thread(None);
        assert_eq!(state.thread(&second).unwrap().name, "Weather Chat 2");
        assert_eq!(state.active_thread_id(), Some(&second));

        let named = state.create_thread(Some("Trip planning"));
        assert_eq!(state.thread(&named).unwrap().name, "Trip planning");

        let blank = state.create_thread(Some("   "));
        assert_eq!(state.thread(&blank).unwrap().name, "Weather Chat 4");
        assert_single_active(&state);
    }

    #[test]
    fn switch_is_idempotent_and_ignores_unknown_ids() {
        let mut state = ChatState::new();
        let a = state.create_thread(None);
        let b = state.create_thread(None);

        assert!(state.switch_thread(&a));
        let snapshot = state.clone();
        assert!(state.switch_thread(&a));
        assert_eq!(state, snapshot);

        let unknown: ThreadId = "thread_missing".parse().unwrap();
        assert!(!state.switch_thread(&unknown));
        assert_eq!(state, snapshot);

        assert!(state.switch_thread(&b));
        assert_single_active(&state);
    }

    #[test]
    fn deleting_active_thread_activates_first_remaining() {
        let mut state = ChatState::new();
        let a = state.create_thread(None);
        let b = state.create_thread(None);
        let c = state.create_thread(None);

        assert!(state.delete_thread(&c));
        assert_eq!(state.active_thread_id(), Some(&a));

        state.switch_thread(&b);
        assert!(state.delete_thread(&a));
        assert_eq!(state.active_thread_id(), Some(&b));

        assert!(state.delete_thread(&b));
        assert!(state.active_thread_id().is_none());
        assert!(state.threads().is_empty());
        assert!(!state.delete_thread(&b));
    }

    #[test]
    fn active_invariant_holds_across_mixed_operations() {
        let mut state = ChatState::restore(Vec::new());
        let mut ids = vec![state.active_thread_id().cloned().unwrap()];

        for step in 0_usize..60 {
            match step % 5 {
                0 | 3 => ids.push(state.create_thread(None)),
                1 if !ids.is_empty() => {
                    let target = ids[(step * 7) % ids.len()].clone();
                    state.switch_thread(&target);
                }
                2 | 4 => {
                    if !ids.is_empty() {
                        let victim = ids.remove((step * 3) % ids.len());
                        state.delete_thread(&victim);
                        if !state.threads().is_empty() {
                            assert!(state.active_thread().is_some());
                        }
                    }
                }
                _ => {}
            }
            assert_single_active(&state);
        }
    }

    #[test]
    fn rename_does_not_bump_updated_at() {
        let mut state = ChatState::restore(Vec::new());
        let id = state.active_thread_id().cloned().unwrap();
        let before = state.thread(&id).unwrap().updated_at;

        assert!(state.rename_thread(&id, "Renamed"));
        let thread = state.thread(&id).unwrap();
        assert_eq!(thread.name, "Renamed");
        assert_eq!(thread.updated_at, before);
    }

    #[test]
    fn add_then_update_message() {
        let mut state = ChatState::restore(Vec::new());
        let message = state.add_message(MessageDraft::agent_placeholder()).unwrap();
        assert!(message.is_streaming);

        assert!(state.update_message(&message.id, MessageUpdate::new().content("X")));
        let stored = &state.messages()[0];
        assert_eq!(stored.content, "X");
        assert!(stored.is_streaming);

        state.update_message(&message.id, MessageUpdate::new().streaming(false));
        assert!(!state.messages()[0].is_streaming);
    }

    #[test]
    fn message_operations_without_active_thread_are_noops() {
        let mut state = ChatState::new();
        assert!(state.add_message(MessageDraft::user("hi")).is_none());
        assert!(!state.update_message(&MessageId::generate(), MessageUpdate::new().content("x")));
        state.clear_chat();
        assert_eq!(state, ChatState::new());
    }

    #[test]
    fn sequence_numbers_increase() {
        let mut state = ChatState::restore(Vec::new());
        let a = state.add_message(MessageDraft::user("a")).unwrap();
        let b = state.add_message(MessageDraft::agent("b")).unwrap();
        let c = state.add_message(MessageDraft::user("c")).unwrap();
        assert!(a.seq < b.seq && b.seq < c.seq);
    }

    #[test]
    fn prune_removes_only_later_agent_messages() {
        let mut state = ChatState::restore(Vec::new());
        let thread_id = state.active_thread_id().cloned().unwrap();
        state.add_message(MessageDraft::agent("earlier reply"));
        let question = state.add_message(MessageDraft::user("question")).unwrap();
        state.add_message(MessageDraft::agent("failed reply"));
        state.add_message(MessageDraft::user("follow-up"));
        state.add_message(MessageDraft::agent("another reply"));

        let removed = state.prune_agent_replies_after(&thread_id, &question.id);
        assert_eq!(removed, 2);

        let contents: Vec<_> = state.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["earlier reply", "question", "follow-up"]);
    }

    #[test]
    fn clear_chat_empties_active_thread_only() {
        let mut state = ChatState::new();
        let a = state.create_thread(None);
        state.add_message(MessageDraft::user("in a"));
        let b = state.create_thread(None);
        state.add_message(MessageDraft::user("in b"));

        state.clear_chat();
        assert!(state.thread(&b).unwrap().messages.is_empty());
        assert_eq!(state.thread(&a).unwrap().messages.len(), 1);
    }

    #[test]
    fn exchange_flags() {
        let mut state = ChatState::restore(Vec::new());
        state.set_error(Some("boom".to_string()));
        state.begin_exchange();
        assert!(state.is_loading() && state.is_streaming());
        assert!(state.error().is_none());

        state.end_exchange();
        assert!(!state.is_loading() && !state.is_streaming());

        state.clear_all();
        assert!(state.threads().is_empty());
        assert!(state.active_thread_id().is_none());
    }
}
