//! `relaybot run` — Serve `!ask` and `!forget` on Discord.

use std::path::Path;
use std::sync::Arc;

use relaybot_agent::{BotRunner, CommandHandler};
use relaybot_channels::{DiscordChannel, DiscordConfig};
use relaybot_config::AppConfig;
use tracing::{info, warn};

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load(config_path).map_err(|e| format!("Failed to load config: {e}"))?;
    let secrets = config.require_secrets()?;

    let provider = relaybot_providers::build_from_config(&config)?;
    let handler = Arc::new(CommandHandler::from_config(&config, provider));
    let channel = Arc::new(DiscordChannel::new(DiscordConfig {
        bot_token: secrets.discord_token,
    }));
    let runner = BotRunner::new(channel, handler);

    info!(
        provider = %config.provider,
        model = %config.model,
        prefix = %config.bot.command_prefix,
        memory = config.bot.memory_enabled,
        "RelayBot starting"
    );

    tokio::select! {
        result = runner.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown requested");
            if let Err(e) = runner.shutdown().await {
                warn!(error = %e, "Channel did not stop cleanly");
            }
        }
    }

    Ok(())
}
