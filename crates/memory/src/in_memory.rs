//! In-memory conversation store — per-user bounded turn logs.
//!
//! Logs live for the lifetime of the process. Each log is a ring buffer
//! capped at `history_limit` turns, so a long-running bot does not grow
//! without bound; the context window is the last `context_turns` of it.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use relaybot_core::error::MemoryError;
use relaybot_core::memory::{ConversationStore, DEFAULT_CONTEXT_TURNS};
use relaybot_core::message::{ConversationTurn, Speaker};
use tokio::sync::RwLock;
use tracing::debug;

/// Default cap on stored turns per user.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// A conversation store that keeps every user's log in a `HashMap`.
pub struct InMemoryConversationStore {
    logs: Arc<RwLock<HashMap<String, VecDeque<ConversationTurn>>>>,
    context_turns: usize,
    history_limit: usize,
}

impl InMemoryConversationStore {
    /// Create a store with the given window size and per-user cap.
    ///
    /// The cap is raised to the window size if it is smaller, so the window
    /// can always be filled.
    pub fn new(context_turns: usize, history_limit: usize) -> Self {
        Self {
            logs: Arc::new(RwLock::new(HashMap::new())),
            context_turns,
            history_limit: history_limit.max(context_turns),
        }
    }

    pub fn context_turns(&self) -> usize {
        self.context_turns
    }

    pub fn history_limit(&self) -> usize {
        self.history_limit
    }

    /// Number of users with a log.
    pub async fn user_count(&self) -> usize {
        self.logs.read().await.len()
    }
}

impl Default for InMemoryConversationStore {
    fn default() -> Self {
        Self::new(DEFAULT_CONTEXT_TURNS, DEFAULT_HISTORY_LIMIT)
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    fn name(&self) -> &str { "in_memory" }

    async fn recent_turns(&self, user_id: &str) -> Result<Vec<ConversationTurn>, MemoryError> {
        let logs = self.logs.read().await;
        let Some(log) = logs.get(user_id) else {
            return Ok(Vec::new());
        };
        let skip = log.len().saturating_sub(self.context_turns);
        Ok(log.iter().skip(skip).cloned().collect())
    }

    async fn append_turn(
        &self,
        user_id: &str,
        speaker: Speaker,
        text: &str,
    ) -> Result<(), MemoryError> {
        let mut logs = self.logs.write().await;
        let log = logs.entry(user_id.to_string()).or_default();
        log.push_back(ConversationTurn::new(speaker, text));
        while log.len() > self.history_limit {
            log.pop_front();
        }
        debug!(user_id = %user_id, ?speaker, stored = log.len(), "Appended turn");
        Ok(())
    }

    async fn reset(&self, user_id: &str) -> Result<bool, MemoryError> {
        let removed = self.logs.write().await.remove(user_id);
        Ok(removed.is_some_and(|log| !log.is_empty()))
    }

    async fn turn_count(&self, user_id: &str) -> Result<usize, MemoryError> {
        Ok(self.logs.read().await.get(user_id).map_or(0, VecDeque::len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_user_has_empty_context() {
        let store = InMemoryConversationStore::default();
        assert_eq!(store.context("nobody").await.unwrap(), "");
        assert!(store.recent_turns("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn context_formats_turns_oldest_first() {
        let store = InMemoryConversationStore::default();
        store.append_turn("u1", Speaker::User, "what is 2+2").await.unwrap();
        store.append_turn("u1", Speaker::Assistant, "4").await.unwrap();

        assert_eq!(
            store.context("u1").await.unwrap(),
            "User: what is 2+2\nAssistant: 4"
        );
    }

    #[tokio::test]
    async fn context_never_exceeds_five_turns() {
        let store = InMemoryConversationStore::default();
        for i in 0..12 {
            store.append_turn("u1", Speaker::User, &format!("msg {i}")).await.unwrap();
        }

        let turns = store.recent_turns("u1").await.unwrap();
        assert_eq!(turns.len(), 5);
        assert_eq!(turns[0].text(), "msg 7");
        assert_eq!(turns[4].text(), "msg 11");
        assert_eq!(store.context("u1").await.unwrap().lines().count(), 5);
    }

    #[tokio::test]
    async fn stored_log_is_capped_at_history_limit() {
        let store = InMemoryConversationStore::new(2, 4);
        for i in 0..10 {
            store.append_turn("u1", Speaker::User, &format!("msg {i}")).await.unwrap();
        }
        assert_eq!(store.turn_count("u1").await.unwrap(), 4);
        let turns = store.recent_turns("u1").await.unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1].text(), "msg 9");
    }

    #[tokio::test]
    async fn history_limit_is_never_below_window() {
        let store = InMemoryConversationStore::new(5, 1);
        assert_eq!(store.history_limit(), 5);
    }

    #[tokio::test]
    async fn reset_clears_the_log() {
        let store = InMemoryConversationStore::default();
        store.append_turn("u1", Speaker::User, "hello").await.unwrap();
        assert!(store.reset("u1").await.unwrap());

        assert_eq!(store.context("u1").await.unwrap(), "");
        assert_eq!(store.turn_count("u1").await.unwrap(), 0);
        assert!(!store.reset("u1").await.unwrap());
    }

    #[tokio::test]
    async fn users_are_keyed_separately() {
        let store = InMemoryConversationStore::default();
        store.append_turn("alice", Speaker::User, "a").await.unwrap();
        store.append_turn("bob", Speaker::User, "b").await.unwrap();
        store.reset("alice").await.unwrap();

        assert_eq!(store.context("bob").await.unwrap(), "User: b");
        assert_eq!(store.user_count().await, 1);
    }
}
