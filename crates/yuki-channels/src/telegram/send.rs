//! Outbound Bot API calls: messages, chat actions, deletions, command menu.

use super::polling::unix_to_utc;
use super::types::{TgMessage, TgResponse};
use super::TelegramChannel;
use tracing::{debug, info, warn};
use yuki_core::{error::YukiError, message::SentMessage};

/// Telegram's per-message length limit.
const MAX_MESSAGE_LEN: usize = 4096;

impl TelegramChannel {
    /// Send text to a chat, split into chunks if needed.
    ///
    /// Only the first chunk is threaded under `reply_to`. Returns the last
    /// chunk as delivered.
    pub(crate) async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        reply_to: Option<i64>,
    ) -> Result<SentMessage, YukiError> {
        let mut last = None;

        for (i, chunk) in split_message(text, MAX_MESSAGE_LEN).into_iter().enumerate() {
            let mut body = serde_json::json!({
                "chat_id": chat_id,
                "text": chunk,
                "parse_mode": "Markdown",
            });
            if let (0, Some(id)) = (i, reply_to) {
                body["reply_to_message_id"] = id.into();
            }

            let mut resp = self.post_message(&body).await?;
            if !resp.ok
                && resp
                    .description
                    .as_deref()
                    .is_some_and(|d| d.contains("can't parse entities"))
            {
                debug!("Markdown parse failed, retrying as plain text");
                if let Some(obj) = body.as_object_mut() {
                    obj.remove("parse_mode");
                }
                resp = self.post_message(&body).await?;
            }

            match resp.result {
                Some(msg) if resp.ok => last = Some(msg),
                _ => {
                    return Err(YukiError::Channel(format!(
                        "telegram send rejected: {}",
                        resp.description.unwrap_or_default()
                    )))
                }
            }
        }

        let msg = last.ok_or_else(|| YukiError::Channel("nothing to send".into()))?;
        let sender_id = match msg.from {
            Some(ref u) => u.id,
            None => self.identity().await?.id,
        };
        Ok(SentMessage {
            chat_id: msg.chat.id,
            message_id: msg.message_id,
            sender_id,
            timestamp: unix_to_utc(msg.date),
        })
    }

    async fn post_message(
        &self,
        body: &serde_json::Value,
    ) -> Result<TgResponse<TgMessage>, YukiError> {
        let url = format!("{}/sendMessage", self.base_url);
        self.client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| YukiError::Channel(format!("telegram send failed: {e}")))?
            .json()
            .await
            .map_err(|e| YukiError::Channel(format!("telegram send parse failed: {e}")))
    }

    /// Remove a message (requires admin rights in groups).
    pub(crate) async fn delete(&self, chat_id: i64, message_id: i64) -> Result<(), YukiError> {
        let url = format!("{}/deleteMessage", self.base_url);
        let body = serde_json::json!({
            "chat_id": chat_id,
            "message_id": message_id,
        });

        let resp: TgResponse<bool> = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| YukiError::Channel(format!("telegram deleteMessage failed: {e}")))?
            .json()
            .await
            .map_err(|e| {
                YukiError::Channel(format!("telegram deleteMessage parse failed: {e}"))
            })?;

        if !resp.ok {
            return Err(YukiError::Channel(format!(
                "telegram deleteMessage rejected: {}",
                resp.description.unwrap_or_default()
            )));
        }
        Ok(())
    }

    /// Send a chat action (e.g. "typing") to a chat.
    pub(crate) async fn send_chat_action(
        &self,
        chat_id: i64,
        action: &str,
    ) -> Result<(), YukiError> {
        let url = format!("{}/sendChatAction", self.base_url);
        let body = serde_json::json!({
            "chat_id": chat_id,
            "action": action,
        });

        self.client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| YukiError::Channel(format!("telegram sendChatAction failed: {e}")))?;

        Ok(())
    }

    /// Register bot commands with Telegram so users see an autocomplete menu.
    /// Best-effort: logs failures but does not propagate errors.
    pub(crate) async fn register_commands(&self) {
        let commands = serde_json::json!({
            "commands": [
                { "command": "help", "description": "Show available commands" },
                { "command": "recall", "description": "Search what was said in this group" },
                { "command": "topics", "description": "Topics you have talked about" },
                { "command": "yuki_status", "description": "Auto-interaction status (admins)" },
                { "command": "yuki_on", "description": "Start auto-interaction (admins)" },
                { "command": "yuki_off", "description": "Stop auto-interaction (admins)" },
                { "command": "yuki_set", "description": "Change an interaction setting (admins)" },
                { "command": "yuki_check", "description": "Show quiet chats right now (admins)" },
            ]
        });

        let url = format!("{}/setMyCommands", self.base_url);
        match self.client.post(&url).json(&commands).send().await {
            Ok(resp) if resp.status().is_success() => {
                info!("registered Telegram bot commands");
            }
            Ok(resp) => {
                let body = resp.text().await.unwrap_or_default();
                warn!("failed to register Telegram bot commands: {body}");
            }
            Err(e) => {
                warn!("failed to register Telegram bot commands: {e}");
            }
        }
    }
}

/// Split a long message into chunks that respect Telegram's limit.
///
/// Prefers breaking after a newline and never splits inside a UTF-8 character.
pub(crate) fn split_message(text: &str, max_len: usize) -> Vec<&str> {
    if text.len() <= max_len {
        return vec![text];
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let mut end = (start + max_len).min(text.len());
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        if end == start {
            end = start + text[start..].chars().next().map_or(1, char::len_utf8);
        }
        let break_at = if end < text.len() {
            text[start..end]
                .rfind('\n')
                .map(|i| start + i + 1)
                .unwrap_or(end)
        } else {
            end
        };
        chunks.push(&text[start..break_at]);
        start = break_at;
    }

    chunks
}
