//! Outbound edge of the scheduler: deliver text, know who "we" are.

use async_trait::async_trait;
use std::sync::Arc;
use yuki_core::{
    error::YukiError,
    message::{OutgoingMessage, SentMessage},
    traits::Channel,
};

/// Delivers proactive messages into a chat.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Post `text` into `chat_id`.
    async fn send(&self, chat_id: i64, text: &str) -> Result<SentMessage, YukiError>;

    /// The bot's own user id, used to recognise its messages in the tracker.
    async fn resolve_self_id(&self) -> Result<i64, YukiError>;
}

/// [`Dispatcher`] backed by a messaging [`Channel`].
pub struct ChannelDispatcher {
    channel: Arc<dyn Channel>,
}

impl ChannelDispatcher {
    pub fn new(channel: Arc<dyn Channel>) -> Self {
        Self { channel }
    }
}

#[async_trait]
impl Dispatcher for ChannelDispatcher {
    async fn send(&self, chat_id: i64, text: &str) -> Result<SentMessage, YukiError> {
        self.channel
            .send(OutgoingMessage::text(chat_id, text))
            .await
    }

    async fn resolve_self_id(&self) -> Result<i64, YukiError> {
        self.channel.self_id().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::Mutex;
    use tokio::sync::mpsc;
    use yuki_core::message::IncomingMessage;

    struct RecordingChannel {
        sent: Mutex<Vec<OutgoingMessage>>,
    }

    #[async_trait]
    impl Channel for RecordingChannel {
        fn name(&self) -> &str {
            "recording"
        }

        async fn start(&self) -> Result<mpsc::Receiver<IncomingMessage>, YukiError> {
            let (_tx, rx) = mpsc::channel(1);
            Ok(rx)
        }

        async fn send(&self, message: OutgoingMessage) -> Result<SentMessage, YukiError> {
            let chat_id = message.reply_target.unwrap_or_default();
            self.sent.lock().unwrap().push(message);
            Ok(SentMessage {
                chat_id,
                message_id: 7,
                sender_id: 555,
                timestamp: Utc::now(),
            })
        }

        async fn self_id(&self) -> Result<i64, YukiError> {
            Ok(555)
        }

        async fn stop(&self) -> Result<(), YukiError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_channel_dispatcher_targets_chat() {
        let channel = Arc::new(RecordingChannel {
            sent: Mutex::new(Vec::new()),
        });
        let dispatcher = ChannelDispatcher::new(channel.clone());

        let sent = dispatcher.send(-42, "anyone around?").await.unwrap();
        assert_eq!(sent.chat_id, -42);
        assert_eq!(dispatcher.resolve_self_id().await.unwrap(), 555);

        let sent = channel.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].reply_target, Some(-42));
        assert_eq!(sent[0].text, "anyone around?");
        assert!(sent[0].reply_to_message_id.is_none());
    }
}
