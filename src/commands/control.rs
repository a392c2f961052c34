//! Operator controls for auto-interaction: /yuki_status, /yuki_on, /yuki_off,
//! /yuki_set, /yuki_check.

use chrono::NaiveDateTime;
use std::sync::Arc;
use tracing::info;
use yuki_engage::{ActivityMonitor, InteractionScheduler};

pub(super) fn handle_status(
    scheduler: &InteractionScheduler,
    monitor: &ActivityMonitor,
    chat_id: i64,
    now: NaiveDateTime,
) -> String {
    let status = scheduler.status();
    let s = &status.settings;
    let last = status
        .last_interaction_time
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "never".to_string());

    let mut out = format!(
        "Auto-interaction: {} (enabled: {})\n\
         Today: {}/{} proactive messages, last {last}\n\
         Every {}m, p={:.2}, delay {}-{}s, up to {} chats/cycle, rest {}m",
        if status.running { "running" } else { "stopped" },
        if s.enabled { "yes" } else { "no" },
        status.interactions_today,
        status.daily_cap,
        s.check_interval_minutes,
        s.interaction_probability,
        s.random_delay_min,
        s.random_delay_max,
        s.max_groups_per_cycle,
        s.rest_between_interactions,
    );

    match monitor.stats(chat_id, now) {
        Some(stats) => {
            let bot = stats
                .minutes_since_bot_message
                .map(|m| format!("{m}m ago"))
                .unwrap_or_else(|| "never".to_string());
            out.push_str(&format!(
                "\n\nThis chat:\n\
                 {} msgs/1h, {} msgs/24h\n\
                 {} users/1h, {} users/24h\n\
                 silent {}m, I last spoke {bot}\n\
                 attempts today: {}",
                stats.messages_1h,
                stats.messages_24h,
                stats.active_users_1h,
                stats.active_users_24h,
                stats.silence_minutes,
                stats.attempts_today,
            ));
        }
        None => out.push_str("\n\nThis chat: no activity tracked yet."),
    }
    out
}

pub(super) async fn handle_on(scheduler: &Arc<InteractionScheduler>) -> String {
    let mut settings = scheduler.settings();
    settings.enabled = true;
    scheduler.replace_settings(settings);

    if scheduler.is_running() {
        return "Auto-interaction is already on.".to_string();
    }
    match scheduler.start().await {
        Ok(()) => {
            info!("interaction: enabled by admin");
            "Auto-interaction is on.".to_string()
        }
        Err(e) => format!("Could not start auto-interaction: {e}"),
    }
}

pub(super) async fn handle_off(scheduler: &InteractionScheduler) -> String {
    let mut settings = scheduler.settings();
    settings.enabled = false;
    scheduler.replace_settings(settings);
    scheduler.stop().await;
    info!("interaction: disabled by admin");
    "Auto-interaction is off.".to_string()
}

pub(super) async fn handle_set(scheduler: &Arc<InteractionScheduler>, args: &str) -> String {
    let mut parts = args.split_whitespace();
    let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
        return "Usage: /yuki_set <key> <value>\n\
                Keys: enabled, check_interval_minutes, interaction_probability, \
                random_delay_min, random_delay_max, max_groups_per_cycle, \
                rest_between_interactions"
            .to_string();
    };

    if let Err(e) = scheduler.update_setting(key, value) {
        return format!("Not changed: {e}");
    }

    if key == "enabled" {
        let enabled = scheduler.settings().enabled;
        if enabled && !scheduler.is_running() {
            if let Err(e) = scheduler.start().await {
                return format!("{key} = {value}, but the scheduler did not start: {e}");
            }
        } else if !enabled {
            scheduler.stop().await;
        }
    }
    format!("{key} = {value}")
}

pub(super) fn handle_check(scheduler: &InteractionScheduler, now: NaiveDateTime) -> String {
    let report = scheduler.run_check_now(now);
    let mut out = format!(
        "Checked {} chats at {}.",
        report.tracked_chats,
        report.checked_at.format("%H:%M")
    );
    if let Some(reason) = report.blocked_by {
        out.push_str(&format!("\nA cycle now would skip: {reason}."));
    }
    if report.quiet.is_empty() {
        out.push_str("\nNo quiet chats.");
        return out;
    }
    out.push_str("\nQuiet chats:");
    for chat in &report.quiet {
        out.push_str(&format!(
            "\n- {}: silent {}m, {} msgs/24h, {} users, {} ({} attempts)",
            chat.stats.chat_id,
            chat.stats.silence_minutes,
            chat.stats.messages_24h,
            chat.stats.active_users_24h,
            chat.context.time_of_day.as_str(),
            chat.context.attempts_today,
        ));
    }
    out
}
