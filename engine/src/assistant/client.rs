//! Remote assistant client
//!
//! Owns at most one [`RemoteSession`] and forwards utterances to a
//! [`ModelBackend`]. The credential is resolved and validated when the session is
//! created; a rejected credential means no network request is ever made.

use super::session::{RemoteSession, DEFAULT_CONTEXT_LIMIT};
use super::AssistantError;
use crate::config::AssistantConfig;
use crate::llm::gemini::GeminiBackend;
use crate::llm::{GenerateRequest, LLMError, ModelBackend};
use crate::secrets::{CredentialSource, SecretString};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// The remote side of an exchange, as seen by the orchestrator
#[async_trait]
pub trait RemoteAssistant: Send {
    /// Create the session if there is none yet and return its id
    fn ensure_session(&mut self) -> Result<Uuid, AssistantError>;

    /// Send one utterance and return the reply text
    ///
    /// Creates the session on first use. A failed call leaves the session
    /// history untouched.
    async fn send(&mut self, utterance: &str) -> Result<String, AssistantError>;

    /// Discard the session; the next `send` starts a new one
    fn reset(&mut self);

    /// Id of the live session, if any
    fn session_id(&self) -> Option<Uuid>;
}

/// [`RemoteAssistant`] backed by a [`ModelBackend`]
pub struct RemoteAssistantClient {
    backend: Arc<dyn ModelBackend>,
    credentials: CredentialSource,
    system_instruction: String,
    timeout: Duration,
    context_limit: usize,
    session: Option<RemoteSession>,
}

impl RemoteAssistantClient {
    pub fn new(backend: Arc<dyn ModelBackend>, credentials: CredentialSource) -> Self {
        Self {
            backend,
            credentials,
            system_instruction: String::new(),
            timeout: DEFAULT_TIMEOUT,
            context_limit: DEFAULT_CONTEXT_LIMIT,
            session: None,
        }
    }

    /// Gemini client configured from the `[assistant]` section
    pub fn from_config(config: &AssistantConfig, credentials: CredentialSource) -> Self {
        Self::new(Arc::new(GeminiBackend::from_config(config)), credentials)
            .with_system_instruction(config.system_instruction.clone())
            .with_timeout(config.request_timeout())
            .with_context_limit(config.context_limit_tokens)
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = instruction.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_context_limit(mut self, context_limit: usize) -> Self {
        self.context_limit = context_limit;
        self
    }

    /// Live session, if one has been opened
    pub fn session(&self) -> Option<&RemoteSession> {
        self.session.as_ref()
    }
}

fn start_session(credential: SecretString, context_limit: usize) -> RemoteSession {
    let session = RemoteSession::open(credential, context_limit);
    tracing::info!("Opened remote session {}", session.id());
    session
}

#[async_trait]
impl RemoteAssistant for RemoteAssistantClient {
    fn ensure_session(&mut self) -> Result<Uuid, AssistantError> {
        if let Some(session) = &self.session {
            return Ok(session.id());
        }
        let credential = self.credentials.resolve()?;
        Ok(self
            .session
            .insert(start_session(credential, self.context_limit))
            .id())
    }

    async fn send(&mut self, utterance: &str) -> Result<String, AssistantError> {
        let session = match self.session.take() {
            Some(session) => session,
            None => start_session(self.credentials.resolve_async().await?, self.context_limit),
        };
        let session = self.session.insert(session);

        let request = GenerateRequest {
            credential: session.credential(),
            system_instruction: &self.system_instruction,
            history: session.history(),
            utterance,
        };

        let reply = match tokio::time::timeout(self.timeout, self.backend.generate(request)).await
        {
            Ok(result) => result?,
            Err(_) => {
                tracing::debug!(
                    "{} backend did not answer within {:?}",
                    self.backend.name(),
                    self.timeout
                );
                return Err(LLMError::Timeout.into());
            }
        };

        session.record_exchange(utterance, &reply);
        Ok(reply)
    }

    fn reset(&mut self) {
        if let Some(session) = self.session.take() {
            tracing::info!("Discarded remote session {}", session.id());
        }
    }

    fn session_id(&self) -> Option<Uuid> {
        self.session.as_ref().map(RemoteSession::id)
    }
}
