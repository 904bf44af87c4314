//! # RelayBot Core
//!
//! Domain types, traits, and error definitions for the RelayBot chat relay.
//! This crate has **no gateway or HTTP dependencies** — it defines the domain
//! model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every collaborator of the command handler is a trait here: the completion
//! backend ([`Provider`]), the chat platform ([`Channel`]) and the per-user
//! conversation log ([`ConversationStore`]). Implementations live in their
//! respective crates, so the handler can be tested against mocks without a
//! live gateway connection.

pub mod error;
pub mod message;
pub mod provider;
pub mod channel;
pub mod memory;
pub mod chunk;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use message::{ConversationTurn, Message, Role, Speaker};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
pub use channel::{Channel, ChannelId, ChannelMessage};
pub use memory::ConversationStore;
pub use chunk::{DISCORD_MESSAGE_LIMIT, split};
