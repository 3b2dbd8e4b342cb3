//! Visible conversation log
//!
//! The log is append-only apart from [`ConversationStore::clear`], which swaps the
//! whole log for the single "chat cleared" message in one step. Observers get
//! whole snapshots through a `tokio::sync::watch` channel, so a reader never sees
//! a half-applied clear.

use crate::config::ConversationConfig;
use sdk::{Message, MessageId, MessageIdGenerator};
use std::sync::Arc;
use tokio::sync::watch;

/// Immutable view of the log at one point in time
pub type ConversationSnapshot = Arc<Vec<Message>>;

/// Ordered log of everything shown to the clinician
pub struct ConversationStore {
    log: watch::Sender<ConversationSnapshot>,
    ids: MessageIdGenerator,
    cleared_message: String,
}

impl ConversationStore {
    /// Create a log holding only the greeting
    pub fn new(greeting: impl Into<String>, cleared_message: impl Into<String>) -> Self {
        let ids = MessageIdGenerator::new();
        let first = Message::assistant(ids.next_id(), greeting);
        let (log, _) = watch::channel(Arc::new(vec![first]));

        Self {
            log,
            ids,
            cleared_message: cleared_message.into(),
        }
    }

    pub fn from_config(config: &ConversationConfig) -> Self {
        Self::new(config.greeting.clone(), config.cleared_message.clone())
    }

    /// Allocate the id for the next message
    pub fn next_id(&self) -> MessageId {
        self.ids.next_id()
    }

    /// Append a message at the end of the log
    pub fn append(&self, message: Message) {
        self.log.send_modify(|log| Arc::make_mut(log).push(message));
    }

    /// Replace the whole log with the "chat cleared" message
    pub fn clear(&self) {
        let cleared = Message::assistant(self.ids.next_id(), self.cleared_message.clone());
        self.log.send_replace(Arc::new(vec![cleared]));
    }

    /// Current log
    pub fn snapshot(&self) -> ConversationSnapshot {
        self.log.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.log.borrow().len()
    }

    /// Never true; the log always holds at least one message
    pub fn is_empty(&self) -> bool {
        self.log.borrow().is_empty()
    }

    /// Watch the log; the receiver sees a new snapshot after every change
    pub fn subscribe(&self) -> watch::Receiver<ConversationSnapshot> {
        self.log.subscribe()
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::from_config(&ConversationConfig::default())
    }
}

impl std::fmt::Debug for ConversationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationStore")
            .field("messages", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdk::MessageRole;

    #[test]
    fn test_new_store_holds_greeting() {
        let store = ConversationStore::new("Hello, Dr. Doe.", "Chat cleared.");
        let log = store.snapshot();

        assert_eq!(log.len(), 1);
        assert_eq!(log[0].role(), MessageRole::Assistant);
        assert_eq!(log[0].text(), "Hello, Dr. Doe.");
        assert!(!store.is_empty());
    }

    #[test]
    fn test_append_preserves_order() {
        let store = ConversationStore::default();
        store.append(Message::user(store.next_id(), "first"));
        store.append(Message::assistant(store.next_id(), "second"));

        let log = store.snapshot();
        assert_eq!(log.len(), 3);
        assert_eq!(log[1].text(), "first");
        assert_eq!(log[2].text(), "second");
        assert!(log[0].id() < log[1].id());
        assert!(log[1].id() < log[2].id());
    }

    #[test]
    fn test_clear_leaves_single_cleared_message() {
        let store = ConversationStore::new("Hello", "Chat cleared.");
        store.append(Message::user(store.next_id(), "one"));
        store.append(Message::assistant(store.next_id(), "two"));
        let before = store.snapshot();

        store.clear();

        let log = store.snapshot();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].text(), "Chat cleared.");
        assert_eq!(log[0].role(), MessageRole::Assistant);
        // ids keep increasing across clears
        assert!(log[0].id() > before[2].id());
        // earlier snapshots are unaffected
        assert_eq!(before.len(), 3);
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let store = ConversationStore::default();
        let mut rx = store.subscribe();

        store.append(Message::user(store.next_id(), "Check Patient P-8429 status"));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().len(), 2);

        store.clear();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().len(), 1);
    }
}
