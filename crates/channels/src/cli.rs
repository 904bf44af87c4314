//! CLI channel — interactive terminal-based chat.
//!
//! Reads from stdin, writes to stdout. Used by `relaybot chat` to exercise
//! the command handler without a Discord connection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use relaybot_core::channel::{Channel, ChannelId, ChannelMessage};
use relaybot_core::error::ChannelError;
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

const CHAT_ID: &str = "cli_session";
const SENDER_ID: &str = "local_user";

/// Interactive CLI channel for terminal-based chat.
pub struct CliChannel {
    id: ChannelId,
    default_command: Option<String>,
    next_message_id: Arc<AtomicU64>,
}

impl CliChannel {
    pub fn new() -> Self {
        Self {
            id: ChannelId("cli".into()),
            default_command: None,
            next_message_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Prefix lines that are not already a `!command` with `command`,
    /// so plain text in the terminal is treated as a question.
    pub fn with_default_command(mut self, command: impl Into<String>) -> Self {
        self.default_command = Some(command.into());
        self
    }

    fn to_content(default_command: Option<&str>, line: &str) -> String {
        match default_command {
            Some(command) if !line.starts_with('!') => format!("{command} {line}"),
            _ => line.to_string(),
        }
    }
}

impl Default for CliChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Channel for CliChannel {
    fn name(&self) -> &str {
        "cli"
    }

    fn id(&self) -> &ChannelId {
        &self.id
    }

    async fn start(
        &self,
    ) -> Result<mpsc::Receiver<Result<ChannelMessage, ChannelError>>, ChannelError> {
        let (tx, rx) = mpsc::channel(32);
        let channel_id = self.id.clone();
        let default_command = self.default_command.clone();
        let counter = Arc::clone(&self.next_message_id);

        tokio::spawn(async move {
            let reader = BufReader::new(io::stdin());
            let mut lines = reader.lines();

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let line = line.trim();
                        if line.is_empty() {
                            continue;
                        }

                        if matches!(line, "exit" | "quit" | "/exit" | "/quit" | ":q") {
                            break;
                        }

                        let msg = ChannelMessage {
                            channel_id: channel_id.clone(),
                            message_id: counter.fetch_add(1, Ordering::Relaxed).to_string(),
                            sender_id: SENDER_ID.into(),
                            sender_name: Some("User".into()),
                            from_bot: false,
                            content: Self::to_content(default_command.as_deref(), line),
                            chat_id: CHAT_ID.into(),
                            metadata: serde_json::Map::new(),
                        };

                        if tx.send(Ok(msg)).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => break, // EOF (Ctrl+D)
                    Err(e) => {
                        let _ = tx.send(Err(ChannelError::ConnectionLost(e.to_string()))).await;
                        break;
                    }
                }
            }
        });

        Ok(rx)
    }

    async fn send(
        &self,
        _chat_id: &str,
        content: &str,
        _reply_to: Option<&str>,
    ) -> Result<(), ChannelError> {
        println!("  Bot > {content}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_channel_properties() {
        let ch = CliChannel::new();
        assert_eq!(ch.name(), "cli");
        assert_eq!(ch.id().0, "cli");
    }

    #[test]
    fn plain_lines_get_the_default_command() {
        assert_eq!(CliChannel::to_content(Some("!ask"), "what is 2+2"), "!ask what is 2+2");
        assert_eq!(CliChannel::to_content(Some("!ask"), "!forget"), "!forget");
        assert_eq!(CliChannel::to_content(None, "hello"), "hello");
    }

    #[tokio::test]
    async fn send_prints_and_succeeds() {
        let ch = CliChannel::new().with_default_command("!ask");
        assert!(ch.send(CHAT_ID, "hi", Some("1")).await.is_ok());
        assert!(ch.health_check().await.unwrap());
    }
}
