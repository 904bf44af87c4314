//! Conversation store trait — bounded per-user conversation memory.
//!
//! The store keeps an ordered log of [`ConversationTurn`]s per user id and
//! exposes a fixed-size suffix of it as the context window for the next
//! completion request. Most recent turns win; the window is a turn count,
//! not a token budget.

use async_trait::async_trait;
use crate::error::MemoryError;
use crate::message::{ConversationTurn, Speaker};

/// Default number of turns in the context window.
pub const DEFAULT_CONTEXT_TURNS: usize = 5;

/// The core conversation store trait.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Backend name (e.g., "in_memory").
    fn name(&self) -> &str;

    /// The last `min(window, len)` turns for `user_id`, oldest first.
    async fn recent_turns(&self, user_id: &str) -> Result<Vec<ConversationTurn>, MemoryError>;

    /// Append a turn to the user's log, creating the log if absent.
    async fn append_turn(
        &self,
        user_id: &str,
        speaker: Speaker,
        text: &str,
    ) -> Result<(), MemoryError>;

    /// Clear the user's log entirely. Returns whether anything was removed.
    async fn reset(&self, user_id: &str) -> Result<bool, MemoryError>;

    /// Number of turns currently stored for `user_id`.
    async fn turn_count(&self, user_id: &str) -> Result<usize, MemoryError>;

    /// The context window as a transcript: one `"<Speaker>: <text>"` line per
    /// turn, oldest first. Empty when the user has no history.
    async fn context(&self, user_id: &str) -> Result<String, MemoryError> {
        let turns = self.recent_turns(user_id).await?;
        Ok(format_transcript(&turns))
    }
}

/// Join turns into newline-separated transcript lines.
pub fn format_transcript(turns: &[ConversationTurn]) -> String {
    turns
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
