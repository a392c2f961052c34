//! Bot commands: instant responses, no provider call.

mod control;
mod recall;


use chrono::NaiveDateTime;
use std::sync::Arc;
use yuki_engage::{ActivityMonitor, InteractionScheduler};
use yuki_memory::Store;

/// Grouped context for command execution.
pub struct CommandContext<'a> {
    pub store: &'a Store,
    pub monitor: &'a ActivityMonitor,
    pub scheduler: &'a Arc<InteractionScheduler>,
    pub chat_id: i64,
    pub sender_id: i64,
    pub text: &'a str,
    pub is_admin: bool,
    pub max_recall: i64,
    /// Local wall-clock time the command arrived.
    pub now: NaiveDateTime,
}

/// Known bot commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Status,
    On,
    Off,
    Set,
    Check,
    Recall,
    Topics,
    Help,
}

impl Command {
    /// Parse a command from message text. Returns `None` for unknown `/` prefixes
    /// (which are treated as ordinary chat).
    pub fn parse(text: &str) -> Option<Self> {
        let first = text.split_whitespace().next()?;
        // Strip @botname suffix (e.g. "/help@yuki_bot" → "/help").
        let cmd = first.split('@').next().unwrap_or(first);
        match cmd {
            "/yuki_status" => Some(Self::Status),
            "/yuki_on" => Some(Self::On),
            "/yuki_off" => Some(Self::Off),
            "/yuki_set" => Some(Self::Set),
            "/yuki_check" => Some(Self::Check),
            "/recall" => Some(Self::Recall),
            "/topics" => Some(Self::Topics),
            "/help" | "/start" => Some(Self::Help),
            _ => None,
        }
    }

    /// Whether only configured admins may run this command.
    pub fn admin_only(self) -> bool {
        matches!(
            self,
            Self::Status | Self::On | Self::Off | Self::Set | Self::Check
        )
    }
}

/// Text after the command word, trimmed.
fn args(text: &str) -> &str {
    let text = text.trim_start();
    text.split_once(char::is_whitespace)
        .map(|(_, rest)| rest.trim())
        .unwrap_or("")
}

/// Handle a command and return the response text.
pub async fn handle(cmd: Command, ctx: &CommandContext<'_>) -> String {
    if cmd.admin_only() && !ctx.is_admin {
        return "Only Yuki's admins can do that.".to_string();
    }
    match cmd {
        Command::Status => {
            control::handle_status(ctx.scheduler, ctx.monitor, ctx.chat_id, ctx.now)
        }
        Command::On => control::handle_on(ctx.scheduler).await,
        Command::Off => control::handle_off(ctx.scheduler).await,
        Command::Set => control::handle_set(ctx.scheduler, args(ctx.text)).await,
        Command::Check => control::handle_check(ctx.scheduler, ctx.now),
        Command::Recall => {
            recall::handle_recall(ctx.store, ctx.chat_id, args(ctx.text), ctx.max_recall).await
        }
        Command::Topics => {
            recall::handle_topics(ctx.store, ctx.chat_id, ctx.sender_id, args(ctx.text)).await
        }
        Command::Help => handle_help(ctx.is_admin),
    }
}

fn handle_help(is_admin: bool) -> String {
    let mut out = String::from(
        "Things you can ask me:\n\
         /recall <words> - find something said in this chat\n\
         /topics - the #hashtags you talk about most\n\
         /topics #tag - how many people talk about a tag\n\
         /help - this message",
    );
    if is_admin {
        out.push_str(
            "\n\nAdmin:\n\
             /yuki_status - scheduler and chat activity\n\
             /yuki_on, /yuki_off - toggle auto-interaction\n\
             /yuki_set <key> <value> - change a setting\n\
             /yuki_check - which chats are quiet right now",
        );
    }
    out
}
