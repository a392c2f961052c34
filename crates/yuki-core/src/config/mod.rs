mod channels;
mod defaults;
mod engage;
mod providers;

#[cfg(test)]
mod tests;

pub use channels::*;
pub use engage::*;
pub use providers::*;

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::error::YukiError;
use defaults::*;

/// Top-level Yuki configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub yuki: YukiConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub channel: ChannelConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub activity: ActivityConfig,
    #[serde(default)]
    pub interaction: InteractionConfig,
    #[serde(default)]
    pub moderation: ModerationConfig,
}

/// General bot settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YukiConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Character description used for every generated message.
    #[serde(default = "default_persona")]
    pub persona: String,
}

impl Default for YukiConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            persona: default_persona(),
        }
    }
}

/// Shared-memory store config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
    /// Results returned by `/recall`.
    #[serde(default = "default_max_recall")]
    pub max_recall: i64,
    /// Recent chat messages given to the provider when replying to a mention.
    #[serde(default = "default_history_messages")]
    pub history_messages: i64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            max_recall: default_max_recall(),
            history_messages: default_history_messages(),
        }
    }
}

/// Expand `~` to home directory.
pub fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return format!("{}/{rest}", home.to_string_lossy());
        }
    }
    path.to_string()
}

/// Load configuration from a TOML file, then apply environment overrides.
///
/// Falls back to defaults if the file does not exist.
pub fn load(path: &str) -> Result<Config, YukiError> {
    let path = Path::new(path);
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path).map_err(|e| {
            YukiError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&content)
            .map_err(|e| YukiError::Config(format!("failed to parse config: {}", e)))?
    } else {
        info!(
            "Config file not found at {}, using defaults",
            path.display()
        );
        Config::default()
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Secrets from the environment win over the file when non-empty.
pub fn apply_env_overrides(config: &mut Config, get: impl Fn(&str) -> Option<String>) {
    let get = |key: &str| get(key).filter(|v| !v.trim().is_empty());

    if let Some(token) = get("YUKI_TELEGRAM_TOKEN") {
        let tg = config.channel.telegram.get_or_insert_with(|| TelegramConfig {
            enabled: true,
            ..Default::default()
        });
        tg.bot_token = token;
    }
    if let Some(key) = get("GEMINI_API_KEY") {
        config
            .provider
            .gemini
            .get_or_insert_with(GeminiConfig::default)
            .api_key = key;
    }
    if let Some(key) = get("OPENAI_API_KEY") {
        config
            .provider
            .openai
            .get_or_insert_with(OpenAiConfig::default)
            .api_key = key;
    }
}
