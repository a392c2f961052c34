//! Gateway: the main event loop connecting the channel, moderation,
//! shared memory, activity tracking and the provider.

mod pipeline;


use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use yuki_core::{
    config::Config,
    message::{IncomingMessage, OutgoingMessage},
    traits::{Channel, Provider},
};
use yuki_engage::{ActivityMonitor, InteractionScheduler};
use yuki_memory::Store;
use yuki_moderation::Moderator;

/// Routes messages between the channel and everything that reacts to them.
pub struct Gateway {
    pub(super) provider: Arc<dyn Provider>,
    pub(super) channel: Arc<dyn Channel>,
    pub(super) store: Store,
    pub(super) monitor: Arc<ActivityMonitor>,
    pub(super) scheduler: Arc<InteractionScheduler>,
    pub(super) moderator: Moderator,
    pub(super) config: Config,
    /// The bot's own user id, resolved once the channel is up.
    pub(super) self_id: OnceLock<i64>,
    /// Chats with a drain task in flight, and the messages queued behind it.
    pub(super) pending: Mutex<HashMap<i64, VecDeque<IncomingMessage>>>,
}

impl Gateway {
    pub fn new(
        provider: Arc<dyn Provider>,
        channel: Arc<dyn Channel>,
        store: Store,
        monitor: Arc<ActivityMonitor>,
        scheduler: Arc<InteractionScheduler>,
        moderator: Moderator,
        config: Config,
    ) -> Self {
        Self {
            provider,
            channel,
            store,
            monitor,
            scheduler,
            moderator,
            config,
            self_id: OnceLock::new(),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Run the main event loop until Ctrl-C.
    pub async fn run(self: Arc<Self>) -> anyhow::Result<()> {
        info!(
            "Yuki gateway running | provider: {} | channel: {} | moderation: {} | auto-interaction: {}",
            self.provider.name(),
            self.channel.name(),
            if self.config.moderation.enabled { "on" } else { "off" },
            if self.config.interaction.enabled { "on" } else { "off" },
        );

        let mut rx = self
            .channel
            .start()
            .await
            .map_err(|e| anyhow::anyhow!("failed to start channel {}: {e}", self.channel.name()))?;
        info!("Channel started: {}", self.channel.name());

        match self.channel.self_id().await {
            Ok(id) => {
                let _ = self.self_id.set(id);
            }
            Err(e) => warn!("could not resolve bot id: {e}"),
        }

        if self.config.interaction.enabled {
            if let Err(e) = self.scheduler.start().await {
                warn!("interaction: scheduler not started: {e}");
            }
        }

        loop {
            tokio::select! {
                msg = rx.recv() => match msg {
                    Some(incoming) => {
                        self.dispatch(incoming);
                    }
                    None => {
                        warn!("channel {} closed its message stream", self.channel.name());
                        break;
                    }
                },
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    break;
                }
            }
        }

        self.shutdown().await;
        Ok(())
    }

    /// Queue a message behind earlier ones from the same chat.
    ///
    /// Moderation, tracking and recording run strictly in arrival order per
    /// chat; replies and commands are spawned off that path. Returns the drain
    /// task when this message started one.
    pub(super) fn dispatch(self: &Arc<Self>, incoming: IncomingMessage) -> Option<JoinHandle<()>> {
        {
            let mut pending = self.lock_pending();
            if let Some(queue) = pending.get_mut(&incoming.chat_id) {
                queue.push_back(incoming);
                return None;
            }
            pending.insert(incoming.chat_id, VecDeque::new());
        }
        let gw = self.clone();
        Some(tokio::spawn(async move { gw.drain_chat(incoming).await }))
    }

    async fn drain_chat(self: Arc<Self>, first: IncomingMessage) {
        let chat_id = first.chat_id;
        let mut next = Some(first);
        while let Some(incoming) = next {
            if self.intake(&incoming).await {
                let gw = self.clone();
                tokio::spawn(async move { gw.respond(incoming).await });
            }
            next = {
                let mut pending = self.lock_pending();
                let queued = pending.get_mut(&chat_id).and_then(|q| q.pop_front());
                if queued.is_none() {
                    pending.remove(&chat_id);
                }
                queued
            };
        }
    }

    fn lock_pending(&self) -> MutexGuard<'_, HashMap<i64, VecDeque<IncomingMessage>>> {
        self.pending.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Graceful shutdown: stop the scheduler (awaited), then the channel.
    pub(super) async fn shutdown(&self) {
        info!("Shutting down...");
        self.scheduler.stop().await;
        if let Err(e) = self.channel.stop().await {
            warn!("failed to stop channel {}: {e}", self.channel.name());
        }
        info!("Shutdown complete.");
    }

    /// Send plain text to a chat, optionally threaded under a message.
    pub(super) async fn send_text(&self, chat_id: i64, text: &str, reply_to: Option<i64>) {
        let msg = OutgoingMessage {
            reply_to_message_id: reply_to,
            ..OutgoingMessage::text(chat_id, text)
        };
        if let Err(e) = self.channel.send(msg).await {
            error!("failed to send message to {chat_id}: {e}");
        }
    }

    pub(super) fn is_admin(&self, user_id: i64) -> bool {
        self.config
            .channel
            .telegram
            .as_ref()
            .is_some_and(|tg| tg.is_admin(user_id))
    }
}
