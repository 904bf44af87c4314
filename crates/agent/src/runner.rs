//! Dispatch loop: reads a channel and handles each message on its own task.

use std::sync::Arc;

use relaybot_core::channel::Channel;
use relaybot_core::error::ChannelError;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::handler::CommandHandler;

/// Drives a [`CommandHandler`] from a [`Channel`]'s inbound stream.
pub struct BotRunner {
    channel: Arc<dyn Channel>,
    handler: Arc<CommandHandler>,
}

impl BotRunner {
    pub fn new(channel: Arc<dyn Channel>, handler: Arc<CommandHandler>) -> Self {
        Self { channel, handler }
    }

    /// Start the channel and serve messages until it closes.
    ///
    /// Every message is handled on a spawned task, so a slow completion for
    /// one user does not hold up anyone else, while each user's commands
    /// still run in arrival order. In-flight tasks are awaited
    /// before returning. Returns the last receive error, if any.
    pub async fn run(&self) -> Result<(), ChannelError> {
        let mut inbound = self.channel.start().await?;
        info!(
            channel = %self.channel.name(),
            channel_id = %self.channel.id(),
            "Listening for commands"
        );

        let mut tasks = JoinSet::new();
        let mut last_error = None;

        while let Some(event) = inbound.recv().await {
            while let Some(finished) = tasks.try_join_next() {
                if let Err(e) = finished {
                    error!(error = %e, "Message task panicked");
                }
            }

            let message = match event {
                Ok(message) => message,
                Err(e) => {
                    error!(channel = %self.channel.name(), error = %e, "Channel receive error");
                    last_error = Some(e);
                    continue;
                }
            };

            // Reserved here, in receive order, so one user's commands are
            // answered in the order they were sent.
            let turn = self.handler.reserve(&message);
            let channel = Arc::clone(&self.channel);
            let handler = Arc::clone(&self.handler);
            tasks.spawn(async move {
                if let Err(e) = handler.handle_reserved(channel.as_ref(), &message, turn).await {
                    warn!(
                        chat_id = %message.chat_id,
                        user_id = %message.sender_id,
                        error = %e,
                        "Failed to deliver reply"
                    );
                }
            });
        }

        while let Some(finished) = tasks.join_next().await {
            if let Err(e) = finished {
                error!(error = %e, "Message task panicked");
            }
        }

        info!(channel = %self.channel.name(), "Channel closed");
        match last_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Stop the underlying channel.
    pub async fn shutdown(&self) -> Result<(), ChannelError> {
        self.channel.stop().await
    }
}
