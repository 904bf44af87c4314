//! Configuration loading, validation, and secret resolution for RelayBot.
//!
//! Loads configuration from `~/.relaybot/config.toml` (or an explicit path)
//! with environment variable overrides. Validates all settings at startup.
//! The Discord token and the completion API key are required secrets; their
//! absence is a fatal startup error.

use relaybot_core::chunk::DISCORD_MESSAGE_LIMIT;
use relaybot_core::memory::DEFAULT_CONTEXT_TURNS;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable holding the Discord bot token.
pub const DISCORD_TOKEN_ENV: &str = "DISCORD_TOKEN";
/// Accepted alias for [`DISCORD_TOKEN_ENV`].
pub const DISCORD_TOKEN_ENV_ALIAS: &str = "DISCORD_BOT_TOKEN";
/// Provider-agnostic API key variable (highest priority).
pub const API_KEY_ENV: &str = "RELAYBOT_API_KEY";
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const OPENROUTER_API_KEY_ENV: &str = "OPENROUTER_API_KEY";

/// The root configuration structure.
///
/// Maps directly to `~/.relaybot/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Completion provider: "openai", "openrouter", or any name with `api_url`
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model identifier sent upstream
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature in [0, 1]
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Optional cap on generated tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Override the provider's base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Completion API key (usually supplied through the environment)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Optional system prompt prepended to every request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,

    /// Discord gateway settings
    #[serde(default)]
    pub discord: DiscordSettings,

    /// Command handler behavior
    #[serde(default)]
    pub bot: BotConfig,

    /// User-visible reply texts
    #[serde(default)]
    pub replies: RepliesConfig,
}

fn default_provider() -> String {
    "openai".into()
}
fn default_model() -> String {
    "gpt-3.5-turbo".into()
}
fn default_temperature() -> f32 {
    0.7
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("api_url", &self.api_url)
            .field("api_key", &redact(&self.api_key))
            .field("system_prompt", &self.system_prompt)
            .field("discord", &self.discord)
            .field("bot", &self.bot)
            .field("replies", &self.replies)
            .finish()
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct DiscordSettings {
    /// Bot token (usually supplied through `DISCORD_TOKEN`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl std::fmt::Debug for DiscordSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordSettings")
            .field("token", &redact(&self.token))
            .finish()
    }
}

/// How prior turns are presented to the completion API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextMode {
    /// Each prior turn is sent as its own role-tagged message
    #[default]
    Messages,
    /// Prior turns are folded into the prompt as a `Speaker: text` transcript
    Transcript,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Prefix that marks a question, e.g. `!ask what is 2+2`
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,

    /// Command that clears the sender's conversation history
    #[serde(default = "default_forget_command")]
    pub forget_command: String,

    /// Number of most recent turns sent as context
    #[serde(default = "default_context_turns")]
    pub context_turns: usize,

    /// Turns retained per user before the oldest are evicted
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Maximum characters per outbound message
    #[serde(default = "default_max_message_length")]
    pub max_message_length: usize,

    /// Whether per-user conversation history is kept at all
    #[serde(default = "default_true")]
    pub memory_enabled: bool,

    #[serde(default)]
    pub context_mode: ContextMode,
}

fn default_command_prefix() -> String {
    "!ask".into()
}
fn default_forget_command() -> String {
    "!forget".into()
}
fn default_context_turns() -> usize {
    DEFAULT_CONTEXT_TURNS
}
fn default_history_limit() -> usize {
    50
}
fn default_max_message_length() -> usize {
    DISCORD_MESSAGE_LIMIT
}
fn default_true() -> bool {
    true
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            command_prefix: default_command_prefix(),
            forget_command: default_forget_command(),
            context_turns: default_context_turns(),
            history_limit: default_history_limit(),
            max_message_length: default_max_message_length(),
            memory_enabled: true,
            context_mode: ContextMode::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepliesConfig {
    /// Sent when the command carries no question
    #[serde(default = "default_empty_prompt_reply")]
    pub empty_prompt: String,

    /// Sent when the completion request fails for any reason
    #[serde(default = "default_failure_reply")]
    pub failure: String,

    /// Substituted when the model returns no text
    #[serde(default = "default_empty_completion_reply")]
    pub empty_completion: String,

    /// Confirms a forget command
    #[serde(default = "default_forgotten_reply")]
    pub forgotten: String,
}

fn default_empty_prompt_reply() -> String {
    "❌ Please provide a question.".into()
}
fn default_failure_reply() -> String {
    "⚠️ Sorry, I could not get a reply right now.".into()
}
fn default_empty_completion_reply() -> String {
    "❌ I could not come up with a reply.".into()
}
fn default_forgotten_reply() -> String {
    "🧹 Conversation history cleared.".into()
}

impl Default for RepliesConfig {
    fn default() -> Self {
        Self {
            empty_prompt: default_empty_prompt_reply(),
            failure: default_failure_reply(),
            empty_completion: default_empty_completion_reply(),
            forgotten: default_forgotten_reply(),
        }
    }
}

/// Both secrets needed to run the Discord bot.
#[derive(Clone)]
pub struct Secrets {
    pub discord_token: String,
    pub api_key: String,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("discord_token", &"[REDACTED]")
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from `path`, or the default location when `None`,
    /// then apply environment variable overrides:
    /// - `DISCORD_TOKEN` / `DISCORD_BOT_TOKEN`
    /// - `RELAYBOT_API_KEY`, then `OPENROUTER_API_KEY` or `OPENAI_API_KEY`
    ///   depending on the provider
    /// - `RELAYBOT_PROVIDER`, `RELAYBOT_MODEL`
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::default_path);
        let mut config = Self::load_from(&path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides using `lookup` to read variables.
    ///
    /// Provider and model are applied first so the API key lookup follows the
    /// effective provider. Empty values are treated as unset.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(provider) = get("RELAYBOT_PROVIDER") {
            self.provider = provider;
        }
        if let Some(model) = get("RELAYBOT_MODEL") {
            self.model = model;
        }

        if let Some(token) = get(DISCORD_TOKEN_ENV).or_else(|| get(DISCORD_TOKEN_ENV_ALIAS)) {
            self.discord.token = Some(token);
        }

        let provider_key_env = self.api_key_env();
        if let Some(key) = get(API_KEY_ENV).or_else(|| get(provider_key_env)) {
            self.api_key = Some(key);
        }
    }

    /// The provider-specific API key variable for the configured provider.
    pub fn api_key_env(&self) -> &'static str {
        if self.provider == "openrouter" {
            OPENROUTER_API_KEY_ENV
        } else {
            OPENAI_API_KEY_ENV
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".relaybot")
    }

    /// Default config file location.
    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 1.0".into(),
            ));
        }

        if self.bot.max_message_length == 0 || self.bot.max_message_length > DISCORD_MESSAGE_LIMIT {
            return Err(ConfigError::ValidationError(format!(
                "bot.max_message_length must be between 1 and {DISCORD_MESSAGE_LIMIT}"
            )));
        }

        if self.bot.command_prefix.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "bot.command_prefix must not be empty".into(),
            ));
        }

        if self.bot.forget_command.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "bot.forget_command must not be empty".into(),
            ));
        }

        if self.model.trim().is_empty() {
            return Err(ConfigError::ValidationError("model must not be empty".into()));
        }

        Ok(())
    }

    /// The completion API key, or the error naming the variable to set.
    pub fn require_api_key(&self) -> Result<String, ConfigError> {
        self.api_key
            .clone()
            .ok_or_else(|| ConfigError::MissingSecret(self.api_key_env().into()))
    }

    /// Both secrets needed by the Discord bot.
    pub fn require_secrets(&self) -> Result<Secrets, ConfigError> {
        let discord_token = self
            .discord
            .token
            .clone()
            .ok_or_else(|| ConfigError::MissingSecret(DISCORD_TOKEN_ENV.into()))?;
        let api_key = self.require_api_key()?;
        Ok(Secrets {
            discord_token,
            api_key,
        })
    }

    /// Generate a default config TOML string (for the `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: None,
            api_url: None,
            api_key: None,
            system_prompt: None,
            discord: DiscordSettings::default(),
            bot: BotConfig::default(),
            replies: RepliesConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("Missing required secret: set the {0} environment variable")]
    MissingSecret(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.provider, "openai");
        assert_eq!(config.model, "gpt-3.5-turbo");
        assert_eq!(config.bot.command_prefix, "!ask");
        assert_eq!(config.bot.context_turns, 5);
        assert_eq!(config.bot.max_message_length, 2000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.provider, config.provider);
        assert_eq!(parsed.bot.forget_command, config.bot.forget_command);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let config = AppConfig {
            temperature: 1.5,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn oversized_message_length_rejected() {
        let mut config = AppConfig::default();
        config.bot.max_message_length = 4000;
        assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));

        config.bot.max_message_length = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.provider, "openai");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
provider = "openrouter"
model = "openai/gpt-4o-mini"
max_tokens = 512

[bot]
context_turns = 3
context_mode = "transcript"

[replies]
failure = "Upstream is down."
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.provider, "openrouter");
        assert_eq!(config.max_tokens, Some(512));
        assert_eq!(config.bot.context_turns, 3);
        assert_eq!(config.bot.context_mode, ContextMode::Transcript);
        assert_eq!(config.bot.command_prefix, "!ask");
        assert_eq!(config.replies.failure, "Upstream is down.");
        assert_eq!(config.replies.empty_prompt, "❌ Please provide a question.");
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "temperature = \"hot\"").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn env_supplies_secrets() {
        let mut config = AppConfig::default();
        config.apply_env(env(&[
            ("DISCORD_TOKEN", "discord-token"),
            ("OPENAI_API_KEY", "sk-openai"),
        ]));

        let secrets = config.require_secrets().unwrap();
        assert_eq!(secrets.discord_token, "discord-token");
        assert_eq!(secrets.api_key, "sk-openai");
    }

    #[test]
    fn openrouter_reads_its_own_key() {
        let mut config = AppConfig::default();
        config.apply_env(env(&[
            ("RELAYBOT_PROVIDER", "openrouter"),
            ("OPENAI_API_KEY", "sk-openai"),
            ("OPENROUTER_API_KEY", "sk-or"),
        ]));
        assert_eq!(config.provider, "openrouter");
        assert_eq!(config.api_key.as_deref(), Some("sk-or"));
    }

    #[test]
    fn generic_key_wins_and_token_alias_works() {
        let mut config = AppConfig::default();
        config.apply_env(env(&[
            ("RELAYBOT_API_KEY", "sk-generic"),
            ("OPENAI_API_KEY", "sk-openai"),
            ("DISCORD_BOT_TOKEN", "alias-token"),
        ]));
        assert_eq!(config.api_key.as_deref(), Some("sk-generic"));
        assert_eq!(config.discord.token.as_deref(), Some("alias-token"));
    }

    #[test]
    fn missing_discord_token_names_the_variable() {
        let mut config = AppConfig::default();
        config.apply_env(env(&[("OPENAI_API_KEY", "sk-openai")]));
        let err = config.require_secrets().unwrap_err();
        assert!(err.to_string().contains("DISCORD_TOKEN"));
    }

    #[test]
    fn missing_api_key_names_the_variable() {
        let mut config = AppConfig::default();
        config.apply_env(env(&[("DISCORD_TOKEN", "t"), ("OPENAI_API_KEY", "  ")]));
        let err = config.require_secrets().unwrap_err();
        assert!(matches!(err, ConfigError::MissingSecret(ref name) if name == "OPENAI_API_KEY"));
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let mut config = AppConfig::default();
        config.apply_env(env(&[("DISCORD_TOKEN", "super-secret"), ("OPENAI_API_KEY", "sk-secret")]));
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("gpt-3.5-turbo"));
        assert!(toml_str.contains("!forget"));
    }
}
