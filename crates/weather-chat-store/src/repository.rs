//! Persistence of the thread collection.

use weather_chat_core::Thread;

use crate::error::Result;
use crate::KeyValueStore;

/// Key under which the thread collection is stored.
pub const THREADS_KEY: &str = "weather-chat-threads";

/// Loads and saves the whole thread collection as one JSON array.
#[derive(Debug)]
pub struct ThreadRepository<S> {
    store: S,
    key: String,
}

impl<S: KeyValueStore> ThreadRepository<S> {
    /// Create a repository using the default key.
    pub fn new(store: S) -> Self {
        Self::with_key(store, THREADS_KEY)
    }

    /// Create a repository storing its document under `key`.
    pub fn with_key(store: S, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// The underlying key-value store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Load the persisted threads.
    ///
    /// Never fails: unreadable or structurally invalid data is logged, removed from
    /// the store, and an empty collection is returned.
    pub fn load(&self) -> Vec<Thread> {
        let raw = match self.store.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "Failed to read stored threads");
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<Thread>>(&raw) {
            Ok(threads) => {
                tracing::debug!(count = threads.len(), "Loaded threads");
                threads
            }
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "Discarding corrupted thread data");
                if let Err(e) = self.store.remove(&self.key) {
                    tracing::warn!(key = %self.key, error = %e, "Failed to remove corrupted thread data");
                }
                Vec::new()
            }
        }
    }

    /// Persist the thread collection. An empty collection is not written.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the backend write fails.
    pub fn save(&self, threads: &[Thread]) -> Result<()> {
        if threads.is_empty() {
            return Ok(());
        }
        let json = serde_json::to_string(threads)?;
        self.store.set(&self.key, &json)
    }

    /// Remove the persisted collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend write fails.
    pub fn clear(&self) -> Result<()> {
        self.store.remove(&self.key)
    }
}
