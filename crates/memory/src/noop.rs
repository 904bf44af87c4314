//! No-op conversation store — used when conversation memory is disabled.

use async_trait::async_trait;
use relaybot_core::error::MemoryError;
use relaybot_core::memory::ConversationStore;
use relaybot_core::message::{ConversationTurn, Speaker};

/// A store that remembers nothing: every context is empty.
pub struct NoopConversationStore;

#[async_trait]
impl ConversationStore for NoopConversationStore {
    fn name(&self) -> &str { "none" }

    async fn recent_turns(&self, _user_id: &str) -> Result<Vec<ConversationTurn>, MemoryError> {
        Ok(Vec::new())
    }

    async fn append_turn(
        &self,
        _user_id: &str,
        _speaker: Speaker,
        _text: &str,
    ) -> Result<(), MemoryError> {
        Ok(())
    }

    async fn reset(&self, _user_id: &str) -> Result<bool, MemoryError> {
        Ok(false)
    }

    async fn turn_count(&self, _user_id: &str) -> Result<usize, MemoryError> {
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn appended_turns_are_forgotten() {
        let store = NoopConversationStore;
        store.append_turn("u1", Speaker::User, "hello").await.unwrap();
        assert_eq!(store.turn_count("u1").await.unwrap(), 0);
        assert_eq!(store.context("u1").await.unwrap(), "");
    }
}
