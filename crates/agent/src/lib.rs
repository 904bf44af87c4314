//! Command handling for RelayBot.
//!
//! Each inbound chat message goes through the same cycle:
//!
//! 1. **Parse** the command (`!ask <prompt>`, `!forget`, or ignore)
//! 2. **Build context** from the sender's recent conversation turns
//! 3. **Send to LLM** via the configured provider
//! 4. **Record** the exchange in the sender's conversation log
//! 5. **Reply** in one or more chunks that fit the platform limit
//!
//! Steps 2–4 run under a per-user lock, so one user's questions are answered
//! in order while different users proceed concurrently.

pub mod command;
pub mod handler;
pub mod locks;
pub mod runner;

pub use command::Command;
pub use handler::{CommandHandler, HandlerSettings};
pub use locks::UserLocks;
pub use runner::BotRunner;
