//! Telegram Bot API deserialization types.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct TgResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TgUpdate {
    pub update_id: i64,
    pub message: Option<TgMessage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TgMessage {
    pub message_id: i64,
    pub from: Option<TgUser>,
    pub chat: TgChat,
    /// Unix seconds.
    #[serde(default)]
    pub date: i64,
    pub text: Option<String>,
    pub caption: Option<String>,
    pub reply_to_message: Option<Box<TgMessage>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TgUser {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TgChat {
    pub id: i64,
    /// Chat type: "private", "group", "supergroup", or "channel".
    #[serde(default, rename = "type")]
    pub chat_type: String,
}

impl TgChat {
    pub fn is_group(&self) -> bool {
        matches!(self.chat_type.as_str(), "group" | "supergroup")
    }
}

impl TgUser {
    /// `@username`, else "First Last", else "First".
    pub fn display_name(&self) -> String {
        if let Some(ref un) = self.username {
            format!("@{un}")
        } else if let Some(ref ln) = self.last_name {
            format!("{} {ln}", self.first_name)
        } else {
            self.first_name.clone()
        }
    }
}
