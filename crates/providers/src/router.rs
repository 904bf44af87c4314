//! Provider selection — builds the configured completion backend.

use std::sync::Arc;

use relaybot_config::AppConfig;
use relaybot_core::error::ProviderError;
use relaybot_core::provider::Provider;
use tracing::info;

use crate::openai_compat::OpenAiCompatProvider;

/// Build the provider named by `config.provider`.
///
/// The API key must already be resolved (config file or environment). An
/// explicit `api_url` wins over the provider's well-known base URL.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let api_key = config
        .api_key
        .clone()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| {
            ProviderError::NotConfigured(format!(
                "no API key for provider '{}' (set {})",
                config.provider,
                config.api_key_env()
            ))
        })?;

    let provider = match (config.provider.as_str(), config.api_url.as_deref()) {
        ("openrouter", None) => OpenAiCompatProvider::openrouter(api_key),
        ("openai", None) => OpenAiCompatProvider::openai(api_key),
        (name, Some(url)) => OpenAiCompatProvider::new(name, url, api_key),
        (name, None) => {
            let base_url = default_base_url(name).ok_or_else(|| {
                ProviderError::NotConfigured(format!(
                    "unknown provider '{name}': set api_url in the config file"
                ))
            })?;
            OpenAiCompatProvider::new(name, base_url, api_key)
        }
    };

    info!(
        provider = %config.provider,
        base_url = %provider.base_url(),
        model = %config.model,
        "Completion provider ready"
    );
    Ok(Arc::new(provider))
}

/// Get the default base URL for well-known OpenAI-compatible providers.
pub fn default_base_url(provider_name: &str) -> Option<&'static str> {
    match provider_name {
        "openrouter" => Some("https://openrouter.ai/api/v1"),
        "openai" => Some("https://api.openai.com/v1"),
        "ollama" => Some("http://localhost:11434/v1"),
        "deepseek" => Some("https://api.deepseek.com/v1"),
        "groq" => Some("https://api.groq.com/openai/v1"),
        "together" => Some("https://api.together.xyz/v1"),
        "vllm" => Some("http://localhost:8000/v1"),
        _ => None,
    }
}
