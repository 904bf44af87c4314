//! The command handler: turns one inbound message into zero or more replies.

use std::sync::Arc;

use relaybot_config::{AppConfig, ContextMode, RepliesConfig};
use relaybot_core::channel::{Channel, ChannelMessage};
use relaybot_core::chunk::split;
use relaybot_core::error::ChannelError;
use relaybot_core::memory::ConversationStore;
use relaybot_core::message::{Message, Speaker};
use relaybot_core::provider::{Provider, ProviderRequest};
use relaybot_memory::{InMemoryConversationStore, NoopConversationStore};
use tracing::{debug, error, info};

use crate::command::Command;
use crate::locks::{UserLocks, UserTurn};

/// Everything the handler needs to know besides its collaborators.
#[derive(Debug, Clone)]
pub struct HandlerSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub system_prompt: Option<String>,
    pub command_prefix: String,
    pub forget_command: String,
    pub context_mode: ContextMode,
    pub max_message_length: usize,
    pub memory_enabled: bool,
    pub replies: RepliesConfig,
}

impl HandlerSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            system_prompt: config.system_prompt.clone(),
            command_prefix: config.bot.command_prefix.clone(),
            forget_command: config.bot.forget_command.clone(),
            context_mode: config.bot.context_mode,
            max_message_length: config.bot.max_message_length,
            memory_enabled: config.bot.memory_enabled,
            replies: config.replies.clone(),
        }
    }
}

impl Default for HandlerSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Handles `!ask` and `!forget` against a provider and a conversation store.
pub struct CommandHandler {
    provider: Arc<dyn Provider>,
    store: Arc<dyn ConversationStore>,
    settings: HandlerSettings,
    locks: UserLocks,
}

impl CommandHandler {
    pub fn new(
        provider: Arc<dyn Provider>,
        store: Arc<dyn ConversationStore>,
        settings: HandlerSettings,
    ) -> Self {
        Self {
            provider,
            store,
            settings,
            locks: UserLocks::new(),
        }
    }

    /// Build a handler with the store selected by `bot.memory_enabled`.
    pub fn from_config(config: &AppConfig, provider: Arc<dyn Provider>) -> Self {
        let store: Arc<dyn ConversationStore> = if config.bot.memory_enabled {
            Arc::new(InMemoryConversationStore::new(
                config.bot.context_turns,
                config.bot.history_limit,
            ))
        } else {
            Arc::new(NoopConversationStore)
        };
        Self::new(provider, store, HandlerSettings::from_config(config))
    }

    pub fn settings(&self) -> &HandlerSettings {
        &self.settings
    }

    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        &self.store
    }

    /// Reserve the sender's place in line if `message` needs one.
    ///
    /// Call this in receive order, before spawning, so same-user commands are
    /// answered in the order they arrived. Messages that never touch the
    /// conversation log get `None`.
    pub fn reserve(&self, message: &ChannelMessage) -> Option<UserTurn> {
        match self.parse(message) {
            Command::Forget => Some(self.locks.reserve(&message.sender_id)),
            Command::Ask(prompt) if !prompt.is_empty() => {
                Some(self.locks.reserve(&message.sender_id))
            }
            _ => None,
        }
    }

    /// Handle one inbound message and send the replies through `channel`.
    ///
    /// Returns the number of messages sent. Only delivery failures are
    /// errors; upstream failures become the configured failure reply.
    pub async fn handle(
        &self,
        channel: &dyn Channel,
        message: &ChannelMessage,
    ) -> Result<usize, ChannelError> {
        let turn = self.reserve(message);
        self.handle_reserved(channel, message, turn).await
    }

    /// [`handle`](Self::handle) with a turn taken earlier by
    /// [`reserve`](Self::reserve).
    pub async fn handle_reserved(
        &self,
        channel: &dyn Channel,
        message: &ChannelMessage,
        turn: Option<UserTurn>,
    ) -> Result<usize, ChannelError> {
        let command = self.parse(message);
        if command != Command::Ignore {
            debug!(
                user_id = %message.sender_id,
                sender = message.sender_name.as_deref().unwrap_or("unknown"),
                guild_id = message.metadata.get("guild_id").and_then(|v| v.as_str()),
                chat_id = %message.chat_id,
                "Command received"
            );
        }

        // Held until the replies are delivered, so one user's replies never
        // interleave either.
        let mut held = None;
        let replies = match command {
            Command::Ignore => return Ok(0),
            Command::Forget => {
                held = Some(self.turn_for(&message.sender_id, turn).await);
                vec![self.forget(&message.sender_id).await]
            }
            Command::Ask(prompt) if prompt.is_empty() => {
                debug!(user_id = %message.sender_id, "Empty prompt");
                vec![self.settings.replies.empty_prompt.clone()]
            }
            Command::Ask(prompt) => {
                if let Err(e) = channel.send_typing(&message.chat_id).await {
                    debug!(chat_id = %message.chat_id, error = %e, "Typing indicator failed");
                }
                held = Some(self.turn_for(&message.sender_id, turn).await);
                match self.exchange(&message.sender_id, &prompt).await {
                    Ok(chunks) => chunks,
                    Err(e) => {
                        error!(
                            user_id = %message.sender_id,
                            provider = %self.provider.name(),
                            error = %e,
                            "Completion failed"
                        );
                        vec![self.settings.replies.failure.clone()]
                    }
                }
            }
        };

        let delivered = self.deliver(channel, message, &replies).await;
        drop(held);
        delivered
    }

    /// Run one exchange for `user_id` and return the reply chunks.
    pub async fn ask(&self, user_id: &str, prompt: &str) -> relaybot_core::Result<Vec<String>> {
        let _turn = self.locks.acquire(user_id).await;
        self.exchange(user_id, prompt).await
    }

    fn parse(&self, message: &ChannelMessage) -> Command {
        Command::parse(
            message,
            &self.settings.command_prefix,
            &self.settings.forget_command,
        )
    }

    /// Wait for a reserved turn, or reserve and wait for a fresh one.
    async fn turn_for(&self, user_id: &str, turn: Option<UserTurn>) -> UserTurn {
        match turn {
            Some(mut turn) => {
                turn.wait().await;
                turn
            }
            None => self.locks.acquire(user_id).await,
        }
    }

    /// The exchange proper. Callers hold the user's turn.
    ///
    /// The turns are recorded only once the reply is in hand, so a failed
    /// request leaves the log untouched.
    async fn exchange(
        &self,
        user_id: &str,
        prompt: &str,
    ) -> relaybot_core::Result<Vec<String>> {
        let request = ProviderRequest {
            model: self.settings.model.clone(),
            messages: self.build_messages(user_id, prompt).await?,
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };

        debug!(
            user_id = %user_id,
            model = %request.model,
            messages = request.messages.len(),
            "Requesting completion"
        );
        let response = self.provider.complete(request).await?;

        let completed = !response.message.content.trim().is_empty();
        let text = if completed {
            response.message.content
        } else {
            self.settings.replies.empty_completion.clone()
        };
        let chunks = split(&text, self.settings.max_message_length)?;

        if self.settings.memory_enabled && completed {
            self.store.append_turn(user_id, Speaker::User, prompt).await?;
            self.store.append_turn(user_id, Speaker::Assistant, &text).await?;
        }

        info!(
            user_id = %user_id,
            model = %response.model,
            prompt_tokens = response.usage.as_ref().map(|u| u.prompt_tokens),
            completion_tokens = response.usage.as_ref().map(|u| u.completion_tokens),
            total_tokens = response.usage.as_ref().map(|u| u.total_tokens),
            chunks = chunks.len(),
            "Reply ready"
        );
        Ok(chunks)
    }

    /// Clear `user_id`'s history and return the reply to send.
    async fn forget(&self, user_id: &str) -> String {
        match self.store.reset(user_id).await {
            Ok(removed) => {
                info!(user_id = %user_id, removed, "Conversation history cleared");
                self.settings.replies.forgotten.clone()
            }
            Err(e) => {
                error!(user_id = %user_id, error = %e, "Failed to clear history");
                self.settings.replies.failure.clone()
            }
        }
    }

    /// Upstream messages for `prompt`, shaped by the context mode.
    async fn build_messages(
        &self,
        user_id: &str,
        prompt: &str,
    ) -> relaybot_core::Result<Vec<Message>> {
        let mut messages = Vec::new();
        if let Some(system) = &self.settings.system_prompt {
            messages.push(Message::system(system.as_str()));
        }

        if !self.settings.memory_enabled {
            messages.push(Message::user(prompt));
            return Ok(messages);
        }

        match self.settings.context_mode {
            ContextMode::Messages => {
                let turns = self.store.recent_turns(user_id).await?;
                messages.extend(turns.iter().map(|turn| turn.to_message()));
                messages.push(Message::user(prompt));
            }
            ContextMode::Transcript => {
                let context = self.store.context(user_id).await?;
                let content = if context.is_empty() {
                    prompt.to_string()
                } else {
                    format!("{context}\n\n{}: {prompt}", Speaker::User)
                };
                messages.push(Message::user(content));
            }
        }

        Ok(messages)
    }

    /// Send `replies` in order; the first one threads onto the trigger.
    async fn deliver(
        &self,
        channel: &dyn Channel,
        message: &ChannelMessage,
        replies: &[String],
    ) -> Result<usize, ChannelError> {
        for (i, reply) in replies.iter().enumerate() {
            let reply_to = (i == 0).then_some(message.message_id.as_str());
            channel.send(&message.chat_id, reply, reply_to).await?;
        }
        Ok(replies.len())
    }
}
