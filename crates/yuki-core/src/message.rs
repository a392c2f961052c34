use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An incoming message from a channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub id: Uuid,
    /// Channel name (e.g. "telegram").
    pub channel: String,
    /// Chat the message was posted in (group or private).
    pub chat_id: i64,
    /// Platform message ID, used for replies and deletion.
    pub message_id: i64,
    /// Platform-specific user ID.
    pub sender_id: i64,
    /// Human-readable sender name.
    pub sender_name: Option<String>,
    /// Message text content (caption for media).
    pub text: String,
    pub timestamp: DateTime<Utc>,
    /// Whether this message comes from a group chat.
    #[serde(default)]
    pub is_group: bool,
    /// The bot is @mentioned in the text.
    #[serde(default)]
    pub mentions_bot: bool,
    /// The message replies to one of the bot's messages.
    #[serde(default)]
    pub reply_to_bot: bool,
}

impl IncomingMessage {
    /// Whether the bot is being addressed directly.
    pub fn addresses_bot(&self) -> bool {
        !self.is_group || self.mentions_bot || self.reply_to_bot
    }
}

/// An outgoing message to send back through a channel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub text: String,
    pub metadata: MessageMetadata,
    /// Chat to deliver to.
    #[serde(default)]
    pub reply_target: Option<i64>,
    /// Thread the reply under this message.
    #[serde(default)]
    pub reply_to_message_id: Option<i64>,
}

impl OutgoingMessage {
    /// Plain text message for a chat.
    pub fn text(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: MessageMetadata::default(),
            reply_target: Some(chat_id),
            reply_to_message_id: None,
        }
    }
}

/// A message the channel confirmed as delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentMessage {
    pub chat_id: i64,
    pub message_id: i64,
    /// The account that sent it (the bot itself).
    pub sender_id: i64,
    pub timestamp: DateTime<Utc>,
}

/// Metadata about how a message was generated.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MessageMetadata {
    /// Which provider produced this response.
    pub provider_used: String,
    /// Token count (if available from the provider).
    pub tokens_used: Option<u64>,
    /// Wall-clock processing time in milliseconds.
    pub processing_time_ms: u64,
    /// Model identifier (if applicable).
    pub model: Option<String>,
}
