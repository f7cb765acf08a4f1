//! Identifier types for threads and messages.
//!
//! IDs are opaque strings of the form `<prefix>_<unix-millis>_<random>`. The time
//! component keeps them roughly chronological; ordering decisions never rely on it
//! (messages carry an explicit sequence number for that).

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    /// The identifier was empty or only whitespace.
    #[error("identifier is empty")]
    Empty,
}

/// Length of the random suffix appended to generated IDs.
const SUFFIX_LEN: usize = 9;

fn generate_with_prefix(prefix: &str) -> String {
    let millis = Utc::now().timestamp_millis();
    let random = uuid::Uuid::new_v4().simple().to_string();
    format!("{prefix}_{millis}_{}", &random[..SUFFIX_LEN])
}

fn validate(value: String) -> Result<String, IdError> {
    if value.trim().is_empty() {
        Err(IdError::Empty)
    } else {
        Ok(value)
    }
}

/// Identifier of a conversation thread.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ThreadId(String);

impl ThreadId {
    /// Generate a fresh, unique thread ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(generate_with_prefix("thread"))
    }

    /// Return the string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ThreadId({})", self.0)
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ThreadId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        validate(s.to_string()).map(Self)
    }
}

impl TryFrom<String> for ThreadId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        validate(value).map(Self)
    }
}

impl From<ThreadId> for String {
    fn from(id: ThreadId) -> Self {
        id.0
    }
}

/// Identifier of a single message within a thread.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MessageId(String);

impl MessageId {
    /// Generate a fresh, unique message ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(generate_with_prefix("msg"))
    }

    /// Return the string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageId({})", self.0)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for MessageId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        validate(s.to_string()).map(Self)
    }
}

impl TryFrom<String> for MessageId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        validate(value).map(Self)
    }
}

impl From<MessageId> for String {
    fn from(id: MessageId) -> Self {
        id.0
    }
}
