//! Chat channel implementations for RelayBot.
//!
//! Each channel connects to a chat platform and relays messages to/from
//! the command handler. Channels are trait-based and platform-agnostic.
//!
//! Available channels:
//! - **Discord** — Discord gateway and REST API via `serenity`
//! - **CLI** — Interactive terminal chat (stdin/stdout)

pub mod cli;
pub mod discord;

pub use cli::CliChannel;
pub use discord::{DiscordChannel, DiscordConfig};
