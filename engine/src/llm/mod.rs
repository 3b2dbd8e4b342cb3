//! Model Backend Abstraction Layer
//!
//! This module provides the common interface the assistant uses to talk to a
//! remote language-model backend. A backend sees the hidden session history plus
//! the new utterance and returns generated text; everything about transport and
//! authentication stays behind the [`ModelBackend`] trait.

use crate::secrets::SecretString;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod gemini;

/// Result type for backend operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// Errors that can occur while talking to a backend
#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Timeout")]
    Timeout,

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// One turn of the hidden session history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Turn {
    /// Who spoke
    pub role: TurnRole,

    /// What was said
    pub text: String,
}

impl Turn {
    /// Create a user turn
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            text: text.into(),
        }
    }

    /// Create a model turn
    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Model,
            text: text.into(),
        }
    }
}

/// Speaker of a session turn
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    /// Clinician input
    User,

    /// Backend output
    Model,
}

impl fmt::Display for TurnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnRole::User => write!(f, "user"),
            TurnRole::Model => write!(f, "model"),
        }
    }
}

/// Everything a backend needs for one exchange
#[derive(Debug, Clone, Copy)]
pub struct GenerateRequest<'a> {
    /// Credential validated when the session was created
    pub credential: &'a SecretString,

    /// Persona instruction sent with every exchange
    pub system_instruction: &'a str,

    /// Prior turns of the session, oldest first
    pub history: &'a [Turn],

    /// The new utterance
    pub utterance: &'a str,
}

/// Backend trait that remote model transports implement
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Returns the name of the backend (e.g., "gemini")
    fn name(&self) -> &str;

    /// Generate a reply for `request.utterance` in the context of `request.history`
    ///
    /// # Returns
    /// * `Ok(String)` - The generated reply text
    /// * `Err(LLMError)` - Transport, authentication, quota or parse failure
    async fn generate(&self, request: GenerateRequest<'_>) -> Result<String>;
}
