//! Long-polling update loop and Channel trait implementation.

use super::types::{TgMessage, TgResponse, TgUpdate};
use super::{BotIdentity, TelegramChannel};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use uuid::Uuid;
use yuki_core::{
    error::YukiError,
    message::{IncomingMessage, OutgoingMessage, SentMessage},
    traits::Channel,
};

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn start(&self) -> Result<mpsc::Receiver<IncomingMessage>, YukiError> {
        let me = self.identity().await?.clone();
        self.register_commands().await;

        let (tx, rx) = mpsc::channel(64);
        let client = self.client.clone();
        let base_url = self.base_url.clone();
        let last_update_id = self.last_update_id.clone();

        info!(
            "Telegram channel starting long polling as {} ({})...",
            me.username.as_deref().unwrap_or("unnamed bot"),
            me.id
        );

        tokio::spawn(async move {
            let mut backoff_secs: u64 = 1;

            loop {
                let last = last_update_id.lock().await;
                let offset = last.map(|id| id + 1);
                drop(last);

                let mut url = format!("{base_url}/getUpdates?timeout=30");
                if let Some(off) = offset {
                    url.push_str(&format!("&offset={off}"));
                }

                let resp = match client
                    .get(&url)
                    .timeout(std::time::Duration::from_secs(35))
                    .send()
                    .await
                {
                    Ok(r) => r,
                    Err(e) => {
                        error!("telegram poll error (retry in {backoff_secs}s): {e}");
                        tokio::time::sleep(std::time::Duration::from_secs(backoff_secs)).await;
                        backoff_secs = (backoff_secs * 2).min(60);
                        continue;
                    }
                };

                let body: TgResponse<Vec<TgUpdate>> = match resp.json().await {
                    Ok(b) => b,
                    Err(e) => {
                        error!("telegram parse error (retry in {backoff_secs}s): {e}");
                        tokio::time::sleep(std::time::Duration::from_secs(backoff_secs)).await;
                        backoff_secs = (backoff_secs * 2).min(60);
                        continue;
                    }
                };

                if !body.ok {
                    error!(
                        "telegram API error (retry in {backoff_secs}s): {}",
                        body.description.unwrap_or_default()
                    );
                    tokio::time::sleep(std::time::Duration::from_secs(backoff_secs)).await;
                    backoff_secs = (backoff_secs * 2).min(60);
                    continue;
                }

                // Successful poll -- reset backoff.
                backoff_secs = 1;

                let updates = body.result.unwrap_or_default();

                if let Some(last_update) = updates.last() {
                    *last_update_id.lock().await = Some(last_update.update_id);
                }

                for update in updates {
                    let Some(msg) = update.message else {
                        continue;
                    };
                    let Some(incoming) = to_incoming(msg, &me) else {
                        continue;
                    };

                    if tx.send(incoming).await.is_err() {
                        info!("telegram channel receiver dropped, stopping poll");
                        return;
                    }
                }
            }
        });

        Ok(rx)
    }

    async fn send(&self, message: OutgoingMessage) -> Result<SentMessage, YukiError> {
        let chat_id = message
            .reply_target
            .ok_or_else(|| YukiError::Channel("no reply_target on outgoing message".into()))?;

        self.send_text(chat_id, &message.text, message.reply_to_message_id)
            .await
    }

    async fn self_id(&self) -> Result<i64, YukiError> {
        Ok(self.identity().await?.id)
    }

    async fn send_typing(&self, chat_id: i64) -> Result<(), YukiError> {
        self.send_chat_action(chat_id, "typing").await
    }

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<(), YukiError> {
        self.delete(chat_id, message_id).await
    }

    async fn stop(&self) -> Result<(), YukiError> {
        info!("Telegram channel stopped");
        Ok(())
    }
}

/// Convert a Telegram message into an [`IncomingMessage`].
///
/// Messages without text or caption, without a sender, or sent by bots
/// are dropped.
pub(crate) fn to_incoming(msg: TgMessage, me: &BotIdentity) -> Option<IncomingMessage> {
    let user = msg.from?;
    if user.is_bot {
        debug!("telegram: ignoring bot message from {}", user.id);
        return None;
    }
    let text = msg.text.or(msg.caption)?;

    let mentions_bot = me.username.as_deref().is_some_and(|name| {
        text.to_lowercase()
            .contains(&format!("@{}", name.to_lowercase()))
    });
    let reply_to_bot = msg
        .reply_to_message
        .as_ref()
        .and_then(|r| r.from.as_ref())
        .is_some_and(|u| u.id == me.id);

    Some(IncomingMessage {
        id: Uuid::new_v4(),
        channel: "telegram".to_string(),
        chat_id: msg.chat.id,
        message_id: msg.message_id,
        sender_id: user.id,
        sender_name: Some(user.display_name()),
        text,
        timestamp: unix_to_utc(msg.date),
        is_group: msg.chat.is_group(),
        mentions_bot,
        reply_to_bot,
    })
}

/// Telegram `date` to UTC; missing or invalid dates become "now".
pub(crate) fn unix_to_utc(secs: i64) -> DateTime<Utc> {
    if secs <= 0 {
        return Utc::now();
    }
    DateTime::from_timestamp(secs, 0).unwrap_or_else(Utc::now)
}
