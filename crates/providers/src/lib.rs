//! LLM completion clients for RelayBot.
//!
//! - **openai_compat** — OpenAI, OpenRouter, and any `/chat/completions` endpoint
//! - **router** — builds the configured provider from [`relaybot_config::AppConfig`]

pub mod openai_compat;
pub mod router;

pub use openai_compat::OpenAiCompatProvider;
pub use router::build_from_config;
