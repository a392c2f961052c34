//! Telegram Bot API channel.
//!
//! Uses long polling via `getUpdates` and `sendMessage` for responses.
//! Group messages are delivered with mention/reply flags so the gateway
//! can tell chatter from messages addressed to the bot.
//! Docs: <https://core.telegram.org/bots/api>

mod polling;
pub(crate) mod send;
pub(crate) mod types;


use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use types::{TgResponse, TgUser};
use yuki_core::{config::TelegramConfig, error::YukiError};

/// Who the bot is, as reported by `getMe`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotIdentity {
    pub id: i64,
    pub username: Option<String>,
}

/// Telegram channel using the Bot API with long polling.
pub struct TelegramChannel {
    client: reqwest::Client,
    base_url: String,
    /// Tracks the last update_id to avoid reprocessing.
    last_update_id: Arc<Mutex<Option<i64>>>,
    identity: OnceCell<BotIdentity>,
}

impl TelegramChannel {
    /// Create a new Telegram channel from config.
    pub fn new(config: &TelegramConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: format!("https://api.telegram.org/bot{}", config.bot_token),
            last_update_id: Arc::new(Mutex::new(None)),
            identity: OnceCell::new(),
        }
    }

    /// The bot's identity, fetched once via `getMe` and cached.
    pub async fn identity(&self) -> Result<&BotIdentity, YukiError> {
        self.identity
            .get_or_try_init(|| async {
                let url = format!("{}/getMe", self.base_url);
                let resp: TgResponse<TgUser> = self
                    .client
                    .get(&url)
                    .send()
                    .await
                    .map_err(|e| YukiError::Channel(format!("telegram getMe failed: {e}")))?
                    .json()
                    .await
                    .map_err(|e| YukiError::Channel(format!("telegram getMe parse failed: {e}")))?;

                match resp.result {
                    Some(user) if resp.ok => Ok(BotIdentity {
                        id: user.id,
                        username: user.username,
                    }),
                    _ => Err(YukiError::Channel(format!(
                        "telegram getMe rejected: {}",
                        resp.description.unwrap_or_default()
                    ))),
                }
            })
            .await
    }
}
