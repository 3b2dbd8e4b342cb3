//! Conversation types
//!
//! These are the values the presentation layer reads out of the conversation log.
//! A message is immutable once created; the only way to change what a user sees is
//! to append another message or clear the whole log.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identity of a message inside a conversation
///
/// Ids are handed out by a [`MessageIdGenerator`] and strictly increase in
/// creation order, so they double as a stable list key for renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(u64);

impl MessageId {
    /// Wrap a raw id value
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw id value
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic source of [`MessageId`]s
#[derive(Debug)]
pub struct MessageIdGenerator {
    next: AtomicU64,
}

impl MessageIdGenerator {
    /// Create a generator whose first id is 1
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Hand out the next id
    pub fn next_id(&self) -> MessageId {
        MessageId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for MessageIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Who produced a message
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Typed (or picked from a suggestion) by the clinician
    User,

    /// Produced by the assistant, either remotely or by the fallback rules
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single entry of the conversation log
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    id: MessageId,
    role: MessageRole,
    text: String,
    created_at: DateTime<Local>,
}

impl Message {
    /// Create a message stamped with the current wall-clock time
    pub fn new(id: MessageId, role: MessageRole, text: impl Into<String>) -> Self {
        Self {
            id,
            role,
            text: text.into(),
            created_at: Local::now(),
        }
    }

    /// Create a user message
    pub fn user(id: MessageId, text: impl Into<String>) -> Self {
        Self::new(id, MessageRole::User, text)
    }

    /// Create an assistant message
    pub fn assistant(id: MessageId, text: impl Into<String>) -> Self {
        Self::new(id, MessageRole::Assistant, text)
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn role(&self) -> MessageRole {
        self.role
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn created_at(&self) -> DateTime<Local> {
        self.created_at
    }

    /// Creation time at display precision, e.g. `10:00 AM`
    pub fn display_time(&self) -> String {
        self.created_at.format("%I:%M %p").to_string()
    }
}
