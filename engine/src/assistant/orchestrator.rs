//! Assistant Orchestrator
//!
//! Runs one submission at a time through
//!
//! ```text
//! Idle -> Submitted -> AwaitingRemote -> Resolved   -> Idle
//!                                     \-> FallenBack -> Idle
//! ```
//!
//! 1. Record the clinician's utterance
//! 2. Raise the typing indicator
//! 3. Ask the remote assistant, or the fallback rules if that fails
//! 4. Record exactly one assistant reply
//! 5. Lower the typing indicator and return to `Idle`
//!
//! A submission made while another one is in flight is rejected with
//! [`SubmitError::Busy`]. [`AssistantOrchestrator::reset`] abandons an in-flight
//! exchange, discards the remote session and clears the conversation.
//!
//! Utterance text is never logged; only its length is.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::secrets::{scrub, CredentialSource, SecretManager};
use sdk::Message;

use super::client::{RemoteAssistant, RemoteAssistantClient};
use super::fallback::{ensure_disclaimer, FallbackRuleEngine};
use super::store::{ConversationSnapshot, ConversationStore};
use super::{AssistantError, ExchangeOutcome, SubmitError};

/// Keychain service the backend key is stored under
pub const KEYCHAIN_SERVICE: &str = "medassist";

/// Builds the remote assistant the first time one is needed, and again after a reset
pub type RemoteFactory = Box<dyn Fn() -> Box<dyn RemoteAssistant> + Send + Sync>;

/// Where the orchestrator is in the life of a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssistantState {
    /// Ready for a new utterance
    Idle,

    /// Utterance recorded
    Submitted,

    /// Waiting on the remote assistant
    AwaitingRemote,

    /// The remote assistant answered
    Resolved,

    /// The fallback rules answered
    FallenBack,
}

/// Remote slot shared between submissions and resets
struct Inflight {
    /// Taken out for the duration of an exchange
    remote: Option<Box<dyn RemoteAssistant>>,

    /// Cancels the current exchange
    cancel: CancellationToken,

    /// Bumped by every reset
    generation: u64,

    /// Configuration errors are logged loudly once per session lifetime
    configuration_warned: bool,
}

/// Coordinates the store, the remote assistant and the fallback rules
pub struct AssistantOrchestrator {
    store: ConversationStore,
    fallback: FallbackRuleEngine,
    factory: RemoteFactory,
    enforce_disclaimer: bool,
    state: watch::Sender<AssistantState>,
    typing: watch::Sender<bool>,
    inflight: Mutex<Inflight>,
}

impl AssistantOrchestrator {
    /// Create an orchestrator; the factory is not called until the first submission.
    pub fn new(store: ConversationStore, factory: RemoteFactory) -> Self {
        let (state, _) = watch::channel(AssistantState::Idle);
        let (typing, _) = watch::channel(false);

        Self {
            store,
            fallback: FallbackRuleEngine::new(),
            factory,
            enforce_disclaimer: true,
            state,
            typing,
            inflight: Mutex::new(Inflight {
                remote: None,
                cancel: CancellationToken::new(),
                generation: 0,
                configuration_warned: false,
            }),
        }
    }

    /// Orchestrator backed by Gemini, reading the key from the configured
    /// environment variable and then the OS keychain
    pub fn from_config(config: &Config) -> Self {
        let keychain = Arc::new(SecretManager::new(KEYCHAIN_SERVICE));
        let credentials =
            CredentialSource::env_with_keychain(config.assistant.api_key_env.clone(), keychain);
        Self::with_credentials(config, credentials)
    }

    /// Orchestrator backed by Gemini with an explicit credential source
    pub fn with_credentials(config: &Config, credentials: CredentialSource) -> Self {
        let assistant = config.assistant.clone();
        let factory: RemoteFactory = Box::new(move || {
            Box::new(RemoteAssistantClient::from_config(
                &assistant,
                credentials.clone(),
            ))
        });

        Self::new(ConversationStore::from_config(&config.conversation), factory)
            .with_disclaimer_enforcement(config.assistant.enforce_disclaimer)
    }

    /// Whether remote replies missing the clinical disclaimer get it appended
    pub fn with_disclaimer_enforcement(mut self, enforce: bool) -> Self {
        self.enforce_disclaimer = enforce;
        self
    }

    /// Submit one utterance and wait for the assistant's reply.
    ///
    /// Returns the reply that was appended to the conversation.
    ///
    /// # Errors
    ///
    /// - [`SubmitError::EmptyUtterance`]: blank input; nothing is recorded
    /// - [`SubmitError::Busy`]: another exchange is in flight; nothing is recorded
    /// - [`SubmitError::Abandoned`]: a reset happened before the reply arrived
    ///
    /// Dropping the returned future mid-exchange records the fallback answer
    /// instead, keeps the remote session and returns to `Idle`.
    pub async fn submit_utterance(&self, text: &str) -> Result<Message, SubmitError> {
        let utterance = text.trim();
        if utterance.is_empty() {
            debug!("Ignoring blank utterance");
            return Err(SubmitError::EmptyUtterance);
        }

        let accepted = self.state.send_if_modified(|state| {
            if *state == AssistantState::Idle {
                *state = AssistantState::Submitted;
                true
            } else {
                false
            }
        });
        if !accepted {
            debug!("Rejected utterance while another exchange is in flight");
            return Err(SubmitError::Busy);
        }

        let (remote, cancel, generation) = self.begin_exchange();
        let started = Instant::now();

        self.store
            .append(Message::user(self.store.next_id(), utterance));

        let mut guard = ExchangeGuard {
            orchestrator: self,
            remote: None,
            utterance,
            generation,
        };
        let remote = guard.remote.insert(remote);

        self.state.send_replace(AssistantState::AwaitingRemote);
        self.typing.send_replace(true);

        let outcome = tokio::select! {
            outcome = self.exchange(&mut **remote, utterance) => Some(outcome),
            _ = cancel.cancelled() => None,
        };
        let Some(outcome) = outcome else {
            drop(guard.finish());
            debug!("Exchange abandoned after {}ms", started.elapsed().as_millis());
            return Err(SubmitError::Abandoned);
        };

        let session_id = remote.session_id();
        let remote = guard.finish();
        let warn_configuration = {
            let mut inflight = self.lock_inflight();
            if inflight.generation != generation {
                debug!("Exchange finished after a reset; dropping its reply");
                return Err(SubmitError::Abandoned);
            }
            inflight.remote = remote;

            let unconfigured = matches!(
                outcome,
                ExchangeOutcome::Fallback {
                    reason: AssistantError::Configuration(_),
                    ..
                }
            );
            let first = unconfigured && !inflight.configuration_warned;
            inflight.configuration_warned |= unconfigured;
            first
        };

        self.log_outcome(
            &outcome,
            utterance,
            session_id,
            started.elapsed().as_millis(),
            warn_configuration,
        );

        let (text, resolved) = match outcome {
            ExchangeOutcome::Remote { text } if self.enforce_disclaimer => {
                (ensure_disclaimer(&text), AssistantState::Resolved)
            }
            ExchangeOutcome::Remote { text } => (text, AssistantState::Resolved),
            ExchangeOutcome::Fallback { text, .. } => (text, AssistantState::FallenBack),
        };

        let reply = Message::assistant(self.store.next_id(), text);
        self.store.append(reply.clone());

        self.state.send_replace(resolved);
        self.typing.send_replace(false);
        self.state.send_replace(AssistantState::Idle);

        Ok(reply)
    }

    /// Clear the visible conversation.
    ///
    /// Only allowed while idle. The remote session, and what the backend
    /// remembers, is kept.
    pub fn clear(&self) -> Result<(), SubmitError> {
        let mut cleared = false;
        self.state.send_if_modified(|state| {
            if *state == AssistantState::Idle {
                self.store.clear();
                cleared = true;
            }
            false
        });

        if cleared {
            info!("Conversation cleared");
            Ok(())
        } else {
            Err(SubmitError::Busy)
        }
    }

    /// Abandon any in-flight exchange, discard the remote session and clear the
    /// conversation.
    pub fn reset(&self) {
        {
            let mut inflight = self.lock_inflight();
            inflight.generation += 1;
            inflight.cancel.cancel();
            if let Some(mut remote) = inflight.remote.take() {
                remote.reset();
            }
            inflight.configuration_warned = false;
        }

        self.store.clear();
        self.typing.send_replace(false);
        self.state.send_replace(AssistantState::Idle);
        info!("Assistant reset");
    }

    /// Current conversation
    pub fn conversation(&self) -> ConversationSnapshot {
        self.store.snapshot()
    }

    pub fn subscribe_conversation(&self) -> watch::Receiver<ConversationSnapshot> {
        self.store.subscribe()
    }

    pub fn state(&self) -> AssistantState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<AssistantState> {
        self.state.subscribe()
    }

    /// Whether the typing indicator is up
    pub fn is_typing(&self) -> bool {
        *self.typing.borrow()
    }

    pub fn subscribe_typing(&self) -> watch::Receiver<bool> {
        self.typing.subscribe()
    }

    /// Id of the idle remote session; `None` before the first exchange, after a
    /// reset, or while an exchange holds the session
    pub fn session_id(&self) -> Option<Uuid> {
        self.lock_inflight()
            .remote
            .as_ref()
            .and_then(|remote| remote.session_id())
    }

    fn lock_inflight(&self) -> MutexGuard<'_, Inflight> {
        self.inflight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take the remote assistant out of its slot and arm a fresh cancel token.
    fn begin_exchange(&self) -> (Box<dyn RemoteAssistant>, CancellationToken, u64) {
        let mut inflight = self.lock_inflight();
        let remote = match inflight.remote.take() {
            Some(remote) => remote,
            None => (self.factory)(),
        };
        let cancel = CancellationToken::new();
        inflight.cancel = cancel.clone();
        (remote, cancel, inflight.generation)
    }

    async fn exchange(&self, remote: &mut dyn RemoteAssistant, utterance: &str) -> ExchangeOutcome {
        match remote.send(utterance).await {
            Ok(text) => ExchangeOutcome::Remote { text },
            Err(reason) => ExchangeOutcome::Fallback {
                text: self.fallback.respond(utterance),
                reason,
            },
        }
    }

    fn log_outcome(
        &self,
        outcome: &ExchangeOutcome,
        utterance: &str,
        session_id: Option<Uuid>,
        elapsed_ms: u128,
        warn_configuration: bool,
    ) {
        let utterance_len = utterance.chars().count();
        let session = session_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "none".to_string());

        match outcome {
            ExchangeOutcome::Remote { text } => {
                info!(
                    utterance_len,
                    reply_len = text.chars().count(),
                    elapsed_ms = elapsed_ms as u64,
                    session = %session,
                    "Remote assistant replied"
                );
            }
            ExchangeOutcome::Fallback {
                reason: reason @ AssistantError::Configuration(_),
                ..
            } => {
                if warn_configuration {
                    warn!(
                        utterance_len,
                        error = %reason,
                        "Remote assistant not configured; answering from fallback rules"
                    );
                } else {
                    debug!(
                        utterance_len,
                        error = %reason,
                        "Remote assistant not configured; answering from fallback rules"
                    );
                }
            }
            ExchangeOutcome::Fallback {
                reason: reason @ AssistantError::Backend(_),
                ..
            } => {
                warn!(
                    utterance_len,
                    elapsed_ms = elapsed_ms as u64,
                    session = %session,
                    at = %chrono::Utc::now().to_rfc3339(),
                    error = %scrub(&reason.to_string()),
                    "Remote assistant failed; answering from fallback rules"
                );
            }
        }
    }
}

/// Holds the remote assistant for one exchange and settles the orchestrator if
/// the submission is dropped before it finishes
struct ExchangeGuard<'a> {
    orchestrator: &'a AssistantOrchestrator,
    remote: Option<Box<dyn RemoteAssistant>>,
    utterance: &'a str,
    generation: u64,
}

impl ExchangeGuard<'_> {
    /// Hand back the remote assistant; dropping the guard afterwards is a no-op.
    fn finish(mut self) -> Option<Box<dyn RemoteAssistant>> {
        self.remote.take()
    }
}

impl Drop for ExchangeGuard<'_> {
    fn drop(&mut self) {
        let Some(remote) = self.remote.take() else {
            return;
        };

        let orchestrator = self.orchestrator;
        {
            let mut inflight = orchestrator.lock_inflight();
            if inflight.generation != self.generation {
                return;
            }
            inflight.remote = Some(remote);
        }

        let text = orchestrator.fallback.respond(self.utterance);
        orchestrator
            .store
            .append(Message::assistant(orchestrator.store.next_id(), text));

        orchestrator.state.send_replace(AssistantState::FallenBack);
        orchestrator.typing.send_replace(false);
        orchestrator.state.send_replace(AssistantState::Idle);

        debug!(
            utterance_len = self.utterance.chars().count(),
            "Submission dropped mid-exchange; recorded fallback answer"
        );
    }
}

impl std::fmt::Debug for AssistantOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssistantOrchestrator")
            .field("state", &self.state())
            .field("typing", &self.is_typing())
            .field("messages", &self.store.len())
            .finish()
    }
}
