//! Clinical assistant messaging core
//!
//! The assistant turns one clinician utterance into exactly one assistant reply.
//! Replies come from the remote model backend when it is configured and
//! answering, and from the offline [`FallbackRuleEngine`] otherwise. Backend
//! failures never reach the clinician as errors.
//!
//! # Components
//!
//! - [`ConversationStore`]: the visible, append-only conversation log
//! - [`RemoteAssistantClient`]: one remote session plus its hidden history
//! - [`FallbackRuleEngine`]: keyword rules for offline answers
//! - [`AssistantOrchestrator`]: the per-submission state machine tying them together

pub mod client;
pub mod fallback;
pub mod orchestrator;
pub mod session;
pub mod store;

pub use client::{RemoteAssistant, RemoteAssistantClient};
pub use fallback::{FallbackRuleEngine, RuleCategory, CLINICAL_DISCLAIMER};
pub use orchestrator::{AssistantOrchestrator, AssistantState, RemoteFactory};
pub use session::RemoteSession;
pub use store::{ConversationSnapshot, ConversationStore};

use crate::llm::LLMError;
use crate::secrets::CredentialError;
use sdk::errors::ErrorExt;

/// Canned prompts offered to the clinician
pub const SUGGESTED_QUESTIONS: [&str; 4] = [
    "Check Patient P-8429 status",
    "Summarize last Chest X-Ray",
    "Set medication reminder",
    "Symptom check protocols",
];

/// Why the remote path could not produce a reply
#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    /// The backend credential is missing or invalid; nothing was sent
    #[error("assistant is not configured: {0}")]
    Configuration(#[from] CredentialError),

    /// The backend was called and failed
    #[error("assistant backend failed: {0}")]
    Backend(#[from] LLMError),
}

impl AssistantError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

impl ErrorExt for AssistantError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Configuration(_) => {
                "Set GEMINI_API_KEY or run `medassist key set` to enable the remote assistant"
            }
            Self::Backend(LLMError::AuthenticationFailed(_)) => {
                "The backend rejected the API key. Check it with `medassist key status`"
            }
            Self::Backend(LLMError::RateLimitExceeded) => {
                "The backend quota is exhausted. Try again later"
            }
            Self::Backend(_) => "The remote assistant is unreachable. Offline answers are in use",
        }
    }

    fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Self::Configuration(_) | Self::Backend(LLMError::AuthenticationFailed(_))
        )
    }
}

/// Reasons a submission produces no reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    /// Blank after trimming; nothing was recorded
    #[error("utterance is empty")]
    EmptyUtterance,

    /// Another exchange is still in flight
    #[error("assistant is busy with another message")]
    Busy,

    /// A reset discarded the exchange before it resolved
    #[error("exchange was abandoned by a reset")]
    Abandoned,
}

impl ErrorExt for SubmitError {
    fn user_hint(&self) -> &str {
        match self {
            Self::EmptyUtterance => "Type a question first",
            Self::Busy => "Wait for the current answer before sending another message",
            Self::Abandoned => "The conversation was reset before the answer arrived",
        }
    }

    fn is_recoverable(&self) -> bool {
        true
    }
}

/// How one exchange resolved
#[derive(Debug)]
pub enum ExchangeOutcome {
    /// The backend answered
    Remote { text: String },

    /// The fallback rules answered because the remote path failed
    Fallback {
        text: String,
        reason: AssistantError,
    },
}

impl ExchangeOutcome {
    pub fn text(&self) -> &str {
        match self {
            Self::Remote { text } | Self::Fallback { text, .. } => text,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}
