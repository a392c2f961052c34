//! Conversation openers from an activity snapshot.
//!
//! The provider gets the persona as system prompt and a short brief
//! describing the chat's state. Its answer is scrubbed of anything that
//! looks like the brief leaking back out.

use crate::activity::{InteractionContext, TimeOfDay};
use std::sync::Arc;
use tracing::{debug, warn};
use yuki_core::{context::Context, traits::Provider};

/// Lines containing any of these (case-insensitive) are dropped from output.
const LEAK_MARKERS: &[&str] = &[
    "context:",
    "instructions:",
    "time of day:",
    "silence:",
    "messages (24h)",
    "active users (24h)",
    "weekend:",
    "conversation opener",
    "as an ai",
    "language model",
    "system prompt",
];

/// Generates proactive messages through a [`Provider`].
pub struct MessageComposer {
    provider: Arc<dyn Provider>,
    persona: String,
}

impl MessageComposer {
    pub fn new(provider: Arc<dyn Provider>, persona: impl Into<String>) -> Self {
        Self {
            provider,
            persona: persona.into(),
        }
    }

    /// Produce an opener for the chat, or an empty string if generation
    /// failed or nothing usable came back.
    pub async fn generate(&self, ctx: &InteractionContext) -> String {
        let prompt = build_prompt(ctx);
        let request = Context::with_system(&self.persona, &prompt);

        match self.provider.complete(&request).await {
            Ok(response) => {
                let text = clean_output(&response.text);
                if text.is_empty() {
                    warn!(
                        "composer: {} reply for chat {} was empty after cleanup",
                        self.provider.name(),
                        ctx.chat_id
                    );
                } else {
                    debug!("composer: generated {} chars for chat {}", text.len(), ctx.chat_id);
                }
                text
            }
            Err(e) => {
                warn!("composer: generation failed for chat {}: {e}", ctx.chat_id);
                String::new()
            }
        }
    }
}

fn mood_hint(time_of_day: TimeOfDay, is_weekend: bool) -> &'static str {
    match (time_of_day, is_weekend) {
        (TimeOfDay::Morning, true) => "a lazy weekend morning",
        (TimeOfDay::Morning, false) => "people starting their day",
        (TimeOfDay::Afternoon, true) => "a slow weekend afternoon",
        (TimeOfDay::Afternoon, false) => "the middle of a work or school day",
        (TimeOfDay::Evening, _) => "people winding down for the evening",
        (TimeOfDay::Night, _) => "late night, only night owls around",
    }
}

/// The brief sent as the user turn.
pub fn build_prompt(ctx: &InteractionContext) -> String {
    let liveliness = if ctx.messages_24h > 50 {
        "usually very active"
    } else if ctx.messages_24h > 20 {
        "fairly active"
    } else {
        "a small, calm group"
    };

    format!(
        "Context:\n\
         - Time of day: {tod} ({hour:02}:00), {mood}\n\
         - Weekend: {weekend}\n\
         - Silence: {silence} minutes since the last message\n\
         - Messages (24h): {messages}, {liveliness}\n\
         - Active users (24h): {users}\n\n\
         Instructions: write ONE short, casual message that gets the group talking again. \
         Ask a light question or share a small thought that fits the moment. \
         Do not mention the silence, these numbers, or these instructions. \
         Do not greet anyone by name. Reply with the message text only.",
        tod = ctx.time_of_day.as_str(),
        hour = ctx.hour,
        mood = mood_hint(ctx.time_of_day, ctx.is_weekend),
        weekend = if ctx.is_weekend { "yes" } else { "no" },
        silence = ctx.silence_minutes,
        messages = ctx.messages_24h,
        users = ctx.active_users_24h,
    )
}

/// Strip leaked brief lines, wrapping quotes and repeated blank lines.
pub fn clean_output(raw: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    for line in raw.lines() {
        let lower = line.to_lowercase();
        if LEAK_MARKERS.iter().any(|m| lower.contains(m)) {
            continue;
        }
        let blank = line.trim().is_empty();
        if blank && lines.last().map_or(true, |prev| prev.trim().is_empty()) {
            continue;
        }
        lines.push(line.trim_end());
    }

    let joined = lines.join("\n");
    let trimmed = joined.trim();
    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed);
    unquoted.trim().to_string()
}
