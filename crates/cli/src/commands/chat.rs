//! `relaybot chat` — Talk to the bot from the terminal.
//!
//! Runs the same command handler as the Discord bot against a stdin/stdout
//! channel. Plain lines are treated as questions; `!forget` works as usual.

use std::path::Path;
use std::sync::Arc;

use relaybot_agent::{BotRunner, CommandHandler};
use relaybot_channels::CliChannel;
use relaybot_config::AppConfig;

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load(config_path).map_err(|e| format!("Failed to load config: {e}"))?;

    // Check for API key early — give a clear error
    if let Err(e) = config.require_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables (or put it in .env):");
        eprintln!("    OPENAI_API_KEY=sk-...          (provider = \"openai\")");
        eprintln!("    OPENROUTER_API_KEY=sk-or-...   (provider = \"openrouter\")");
        eprintln!("    RELAYBOT_API_KEY=...           (any provider)");
        eprintln!();
        return Err(e.into());
    }

    let provider = relaybot_providers::build_from_config(&config)?;
    let handler = Arc::new(CommandHandler::from_config(&config, provider));
    let channel = Arc::new(CliChannel::new().with_default_command(&config.bot.command_prefix));
    let runner = BotRunner::new(channel, handler);

    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║          RelayBot — Terminal Chat            ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Provider:  {}", config.provider);
    println!("  Model:     {}", config.model);
    println!("  Memory:    {}", if config.bot.memory_enabled {
        format!("last {} turns", config.bot.context_turns)
    } else {
        "disabled".to_string()
    });
    println!();
    println!("  Type a question and press Enter. `{}` clears the history.", config.bot.forget_command);
    println!("  Type 'exit' or Ctrl+D to quit.");
    println!();

    runner.run().await?;
    println!("  Goodbye!");
    Ok(())
}
