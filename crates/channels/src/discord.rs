//! Discord channel adapter.
//!
//! Connects to the Discord gateway through `serenity` and forwards every
//! message it can see (guild channels and DMs) into the channel's receiver.
//! Outbound messages go through the REST client, so `send` works whether or
//! not the gateway is connected.

use std::sync::Arc;

use async_trait::async_trait;
use relaybot_core::channel::{Channel, ChannelId, ChannelMessage};
use relaybot_core::error::ChannelError;
use serenity::builder::CreateMessage;
use serenity::client::{Client, Context, EventHandler};
use serenity::gateway::ShardManager;
use serenity::http::Http;
use serenity::model::channel::Message as DiscordMessage;
use serenity::model::gateway::{GatewayIntents, Ready};
use serenity::model::id::{ChannelId as DiscordChannelId, MessageId};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, error, info, warn};

/// Discord channel configuration.
#[derive(Clone)]
pub struct DiscordConfig {
    /// Bot token from the Discord Developer Portal.
    pub bot_token: String,
}

impl std::fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("bot_token", &"[REDACTED]")
            .finish()
    }
}

/// Discord channel adapter.
pub struct DiscordChannel {
    config: DiscordConfig,
    channel_id: ChannelId,
    http: Arc<Http>,
    shard_manager: Mutex<Option<Arc<ShardManager>>>,
}

impl DiscordChannel {
    pub fn new(config: DiscordConfig) -> Self {
        let http = Arc::new(Http::new(&config.bot_token));
        Self {
            config,
            channel_id: ChannelId("discord".into()),
            http,
            shard_manager: Mutex::new(None),
        }
    }

    /// Gateway intents: guild and DM messages, including their content.
    pub fn intents() -> GatewayIntents {
        GatewayIntents::GUILDS
            | GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::DIRECT_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT
    }
}

/// Parse a Discord snowflake id. Zero is not a valid snowflake.
fn parse_snowflake(raw: &str) -> Result<u64, ChannelError> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|id| *id != 0)
        .ok_or_else(|| ChannelError::InvalidChatId(raw.to_string()))
}

/// Gateway event handler that forwards messages into the channel receiver.
struct Forwarder {
    channel_id: ChannelId,
    tx: mpsc::Sender<Result<ChannelMessage, ChannelError>>,
}

impl Forwarder {
    fn to_channel_message(&self, msg: &DiscordMessage) -> ChannelMessage {
        let mut metadata = serde_json::Map::new();
        if let Some(guild_id) = msg.guild_id {
            metadata.insert("guild_id".into(), serde_json::json!(guild_id.to_string()));
        }

        ChannelMessage {
            channel_id: self.channel_id.clone(),
            message_id: msg.id.to_string(),
            sender_id: msg.author.id.to_string(),
            sender_name: Some(msg.author.name.clone()),
            from_bot: msg.author.bot,
            content: msg.content.clone(),
            chat_id: msg.channel_id.to_string(),
            metadata,
        }
    }
}

#[serenity::async_trait]
impl EventHandler for Forwarder {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!(user = %ready.user.name, id = %ready.user.id, "Discord gateway connected");
    }

    async fn message(&self, _ctx: Context, msg: DiscordMessage) {
        let inbound = self.to_channel_message(&msg);
        debug!(
            sender = %inbound.sender_id,
            chat_id = %inbound.chat_id,
            from_bot = inbound.from_bot,
            "Discord message received"
        );
        if self.tx.send(Ok(inbound)).await.is_err() {
            warn!("Discord receiver dropped, message discarded");
        }
    }
}

#[async_trait]
impl Channel for DiscordChannel {
    fn name(&self) -> &str {
        "discord"
    }

    fn id(&self) -> &ChannelId {
        &self.channel_id
    }

    async fn start(
        &self,
    ) -> Result<mpsc::Receiver<Result<ChannelMessage, ChannelError>>, ChannelError> {
        if self.config.bot_token.trim().is_empty() {
            return Err(ChannelError::NotConfigured("Discord bot token is empty".into()));
        }

        let (tx, rx) = mpsc::channel(64);
        let handler = Forwarder {
            channel_id: self.channel_id.clone(),
            tx: tx.clone(),
        };

        let mut client = Client::builder(&self.config.bot_token, Self::intents())
            .event_handler(handler)
            .await
            .map_err(|e| ChannelError::NotConfigured(format!("Discord client build failed: {e}")))?;

        *self.shard_manager.lock().await = Some(client.shard_manager.clone());

        info!("Discord channel starting");
        tokio::spawn(async move {
            if let Err(e) = client.start().await {
                error!(error = %e, "Discord gateway stopped");
                let _ = tx.send(Err(ChannelError::ConnectionLost(e.to_string()))).await;
            }
        });

        Ok(rx)
    }

    async fn send(
        &self,
        chat_id: &str,
        content: &str,
        reply_to: Option<&str>,
    ) -> Result<(), ChannelError> {
        let channel = DiscordChannelId::new(parse_snowflake(chat_id)?);

        let mut builder = CreateMessage::new().content(content);
        if let Some(message_id) = reply_to {
            let message = MessageId::new(parse_snowflake(message_id)?);
            builder = builder.reference_message((channel, message));
        }

        channel
            .send_message(&*self.http, builder)
            .await
            .map_err(|e| ChannelError::DeliveryFailed {
                channel: "discord".into(),
                reason: e.to_string(),
            })?;

        debug!(chat_id = %chat_id, chars = content.chars().count(), "Discord message sent");
        Ok(())
    }

    async fn send_typing(&self, chat_id: &str) -> Result<(), ChannelError> {
        let channel = DiscordChannelId::new(parse_snowflake(chat_id)?);
        channel
            .broadcast_typing(&*self.http)
            .await
            .map_err(|e| ChannelError::DeliveryFailed {
                channel: "discord".into(),
                reason: e.to_string(),
            })
    }

    async fn stop(&self) -> Result<(), ChannelError> {
        if let Some(manager) = self.shard_manager.lock().await.take() {
            info!("Discord channel stopping");
            manager.shutdown_all().await;
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<bool, ChannelError> {
        Ok(!self.config.bot_token.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> DiscordConfig {
        DiscordConfig {
            bot_token: "test-discord-token".into(),
        }
    }

    #[test]
    fn channel_name_and_id() {
        let ch = DiscordChannel::new(test_config());
        assert_eq!(ch.name(), "discord");
        assert_eq!(ch.id().0, "discord");
    }

    #[test]
    fn debug_redacts_token() {
        let debug = format!("{:?}", test_config());
        assert!(!debug.contains("test-discord-token"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn intents_include_message_content() {
        let intents = DiscordChannel::intents();
        assert!(intents.contains(GatewayIntents::MESSAGE_CONTENT));
        assert!(intents.contains(GatewayIntents::DIRECT_MESSAGES));
    }

    #[test]
    fn snowflake_parsing() {
        assert_eq!(parse_snowflake("123456789012345678").unwrap(), 123456789012345678);
        assert!(matches!(parse_snowflake("0"), Err(ChannelError::InvalidChatId(_))));
        assert!(matches!(parse_snowflake("general"), Err(ChannelError::InvalidChatId(_))));
    }

    #[tokio::test]
    async fn send_rejects_invalid_chat_id() {
        let ch = DiscordChannel::new(test_config());
        let err = ch.send("not-a-channel", "Hello!", None).await.unwrap_err();
        assert!(matches!(err, ChannelError::InvalidChatId(_)));
    }

    #[tokio::test]
    async fn start_without_token_is_not_configured() {
        let ch = DiscordChannel::new(DiscordConfig {
            bot_token: "  ".into(),
        });
        assert!(matches!(ch.start().await, Err(ChannelError::NotConfigured(_))));
        assert!(!ch.health_check().await.unwrap());
    }

    #[tokio::test]
    async fn stop_before_start_is_a_noop() {
        let ch = DiscordChannel::new(test_config());
        assert!(ch.stop().await.is_ok());
    }
}
