use crate::{
    context::Context,
    error::YukiError,
    message::{IncomingMessage, OutgoingMessage, SentMessage},
};
use async_trait::async_trait;

/// AI Provider trait: text generation and classification backend.
///
/// Every AI backend (Gemini, OpenAI-compatible, ...) implements this trait
/// to provide a uniform interface.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Human-readable provider name.
    fn name(&self) -> &str;

    /// Whether this provider requires an API key to function.
    fn requires_api_key(&self) -> bool;

    /// Send a conversation context to the provider and get a response.
    async fn complete(&self, context: &Context) -> Result<OutgoingMessage, YukiError>;

    /// Check if the provider is available and ready.
    async fn is_available(&self) -> bool;
}

/// Messaging Channel trait.
///
/// Every messaging platform implements this trait to receive and send messages.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Human-readable channel name.
    fn name(&self) -> &str;

    /// Start listening for incoming messages.
    /// Returns a receiver that yields incoming messages.
    async fn start(&self) -> Result<tokio::sync::mpsc::Receiver<IncomingMessage>, YukiError>;

    /// Send a message and return what the platform delivered.
    async fn send(&self, message: OutgoingMessage) -> Result<SentMessage, YukiError>;

    /// The bot's own user ID on this platform.
    async fn self_id(&self) -> Result<i64, YukiError>;

    /// Send a typing indicator to show the bot is processing.
    async fn send_typing(&self, _chat_id: i64) -> Result<(), YukiError> {
        Ok(())
    }

    /// Remove a message from a chat (moderation).
    async fn delete_message(&self, _chat_id: i64, _message_id: i64) -> Result<(), YukiError> {
        Ok(())
    }

    /// Graceful shutdown.
    async fn stop(&self) -> Result<(), YukiError>;
}
