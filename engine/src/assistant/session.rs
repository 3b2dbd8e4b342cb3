//! Remote session state
//!
//! A session holds the validated credential and the hidden history sent to the
//! backend with every exchange. The history starts with a fixed opening pair that
//! establishes who the clinician is; that pair is never trimmed. Older exchanges
//! are dropped, a whole pair at a time, once the estimated size passes the
//! context limit.

use crate::llm::Turn;
use crate::secrets::SecretString;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Default context limit in tokens
pub const DEFAULT_CONTEXT_LIMIT: usize = 8000;

/// Rough estimate: 1 token ≈ 4 characters
const CHARS_PER_TOKEN: usize = 4;

/// Per-turn overhead for role and structure
const TURN_OVERHEAD_TOKENS: usize = 10;

const OPENING_USER_TURN: &str = "Hello, I am a radiologist using this platform.";
const OPENING_MODEL_TURN: &str =
    "Hello, Dr. Doe. I am your AI Virtual Health Assistant. How can I help you with clinical analysis today?";

/// Turns at the head of the history that trimming never touches
const PINNED_TURNS: usize = 2;

/// One conversation context held by the remote backend
pub struct RemoteSession {
    id: Uuid,
    created_at: DateTime<Utc>,
    credential: SecretString,
    history: Vec<Turn>,
    context_limit: usize,
    token_count: usize,
}

impl RemoteSession {
    /// Open a session seeded with the opening exchange
    pub fn open(credential: SecretString, context_limit: usize) -> Self {
        let history = vec![
            Turn::user(OPENING_USER_TURN),
            Turn::model(OPENING_MODEL_TURN),
        ];
        let token_count = history.iter().map(estimate_tokens).sum();

        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            credential,
            history,
            context_limit,
            token_count,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn credential(&self) -> &SecretString {
        &self.credential
    }

    /// Hidden history, oldest first
    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    /// Estimated size of the history in tokens
    pub fn token_count(&self) -> usize {
        self.token_count
    }

    /// Record a completed exchange.
    ///
    /// Only successful exchanges are recorded; a failed call leaves the history
    /// exactly as it was.
    pub fn record_exchange(&mut self, utterance: &str, reply: &str) {
        for turn in [Turn::user(utterance), Turn::model(reply)] {
            self.token_count += estimate_tokens(&turn);
            self.history.push(turn);
        }

        if self.token_count > self.context_limit {
            self.trim_history();
        }
    }

    /// Drop the oldest exchanges after the opening pair, keeping the latest one.
    fn trim_history(&mut self) {
        while self.token_count > self.context_limit && self.history.len() > PINNED_TURNS + 2 {
            for removed in self.history.drain(PINNED_TURNS..PINNED_TURNS + 2) {
                self.token_count = self.token_count.saturating_sub(estimate_tokens(&removed));
            }
        }

        tracing::debug!(
            "Trimmed session {} history to {} turns (~{} tokens)",
            self.id,
            self.history.len(),
            self.token_count
        );
    }
}

impl std::fmt::Debug for RemoteSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteSession")
            .field("id", &self.id)
            .field("created_at", &self.created_at)
            .field("turns", &self.history.len())
            .field("token_count", &self.token_count)
            .finish()
    }
}

fn estimate_tokens(turn: &Turn) -> usize {
    turn.text.len().div_ceil(CHARS_PER_TOKEN) + TURN_OVERHEAD_TOKENS
}
