//! Conversation memory implementations for RelayBot.

pub mod noop;
pub mod in_memory;

pub use noop::NoopConversationStore;
pub use in_memory::{DEFAULT_HISTORY_LIMIT, InMemoryConversationStore};
