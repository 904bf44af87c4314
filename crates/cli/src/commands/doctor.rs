//! `relaybot doctor` — Diagnose configuration health.

use std::path::Path;

use relaybot_channels::{DiscordChannel, DiscordConfig};
use relaybot_config::{AppConfig, DISCORD_TOKEN_ENV};
use relaybot_core::channel::Channel;

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 RelayBot Doctor — Configuration Diagnostics");
    println!("==============================================\n");

    let mut issues = 0;

    let path = config_path.map_or_else(AppConfig::default_path, Path::to_path_buf);
    if path.exists() {
        println!("  ✅ Config file found: {}", path.display());
    } else {
        println!("  ⚠️  No config file at {} — using defaults", path.display());
    }

    let config = match AppConfig::load(Some(&path)) {
        Ok(config) => {
            println!("  ✅ Config valid (provider: {}, model: {})", config.provider, config.model);
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            return verdict(1);
        }
    };

    if let Some(token) = &config.discord.token {
        let channel = DiscordChannel::new(DiscordConfig {
            bot_token: token.clone(),
        });
        match channel.health_check().await {
            Ok(true) => println!("  ✅ Discord token configured"),
            Ok(false) => {
                println!("  ❌ Discord token is blank — set {DISCORD_TOKEN_ENV}");
                issues += 1;
            }
            Err(e) => {
                println!("  ❌ Discord channel not usable: {e}");
                issues += 1;
            }
        }
    } else {
        println!("  ❌ No Discord token — set {DISCORD_TOKEN_ENV}");
        issues += 1;
    }

    if config.api_key.is_some() {
        println!("  ✅ API key configured");
    } else {
        println!("  ❌ No API key — set {}", config.api_key_env());
        issues += 1;
    }

    match relaybot_providers::build_from_config(&config) {
        Ok(provider) => match provider.health_check().await {
            Ok(true) => println!("  ✅ Provider '{}' reachable", provider.name()),
            Ok(false) => {
                println!("  ⚠️  Provider '{}' answered but rejected the health check", provider.name());
                issues += 1;
            }
            Err(e) => {
                println!("  ❌ Provider '{}' unreachable: {e}", provider.name());
                issues += 1;
            }
        },
        Err(e) => {
            println!("  ❌ Provider not usable: {e}");
            issues += 1;
        }
    }

    verdict(issues)
}

/// Print the summary line; any issue makes the command fail.
fn verdict(issues: usize) -> Result<(), Box<dyn std::error::Error>> {
    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
        Ok(())
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
        Err(format!("{issues} issue(s) found").into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_fails_on_issues() {
        assert!(verdict(0).is_ok());
        let err = verdict(2).unwrap_err();
        assert_eq!(err.to_string(), "2 issue(s) found");
    }

    #[tokio::test]
    async fn invalid_config_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "provider = [unterminated\n").unwrap();

        let err = run(Some(&path)).await.unwrap_err();
        assert_eq!(err.to_string(), "1 issue(s) found");
    }
}
