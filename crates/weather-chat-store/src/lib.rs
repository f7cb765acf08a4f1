//! Local persistence for weather-chat.
//!
//! Threads are kept as a single JSON document under one key of a small key-value
//! store. Two backends are provided:
//!
//! - [`FileStore`]: one file per key inside a data directory
//! - [`MemoryStore`]: a process-local map, for tests and ephemeral sessions
//!
//! [`ThreadRepository`] sits on top of either backend and owns the document format.
//!
//! # Example
//!
//! ```no_run
//! use weather_chat_store::{FileStore, ThreadRepository};
//!
//! let store = FileStore::open("/tmp/weather-chat").unwrap();
//! let repository = ThreadRepository::new(store);
//! let threads = repository.load();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod file;
pub mod memory;
pub mod repository;

pub use error::{Result, StoreError};
pub use file::FileStore;
pub use memory::MemoryStore;
pub use repository::{ThreadRepository, THREADS_KEY};

/// A durable string key-value store.
///
/// Implementations must be safe to share between tasks.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn remove(&self, key: &str) -> Result<()>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for std::sync::Arc<S> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}
