//! Per-chat activity tracking and the quiet-chat policy.
//!
//! Every human group message lands in a [`ChatActivity`] record. The
//! scheduler then asks [`ActivityMonitor::is_quiet`] whether a chat has
//! gone silent long enough, and was lively enough before that, for Yuki
//! to restart the conversation.
//!
//! Windows are exact: message timestamps and per-user last-seen times are
//! kept and counted at query time, so "messages in the last hour" means
//! the last sixty minutes, not "since the last hourly reset".

use chrono::{Datelike, Duration, Local, NaiveDate, NaiveDateTime, Timelike, Weekday};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;
use yuki_core::config::ActivityConfig;
use yuki_core::message::IncomingMessage;

/// Minimum gap between two messages from the bot itself, in minutes.
const BOT_COOLDOWN_FLOOR_MINUTES: i64 = 15;

/// Activity record for one group chat.
#[derive(Debug, Clone)]
pub struct ChatActivity {
    pub chat_id: i64,
    /// Timestamp of the most recent message of any kind, bot included.
    pub last_message_time: NaiveDateTime,
    /// Gap, in minutes, observed when the last message arrived.
    pub silence_minutes: i64,
    pub last_bot_message_time: Option<NaiveDateTime>,
    pub interaction_attempts_today: u32,
    /// Day the attempt counter belongs to.
    attempts_date: Option<NaiveDate>,
    /// Human message timestamps, oldest first, at most 24h old after cleanup.
    message_times: VecDeque<NaiveDateTime>,
    users_1h: HashMap<i64, NaiveDateTime>,
    users_24h: HashMap<i64, NaiveDateTime>,
}

impl ChatActivity {
    fn new(chat_id: i64, now: NaiveDateTime) -> Self {
        Self {
            chat_id,
            last_message_time: now,
            silence_minutes: 0,
            last_bot_message_time: None,
            interaction_attempts_today: 0,
            attempts_date: None,
            message_times: VecDeque::new(),
            users_1h: HashMap::new(),
            users_24h: HashMap::new(),
        }
    }

    /// Human messages within the last hour.
    pub fn messages_1h(&self, now: NaiveDateTime) -> usize {
        count_within(self.message_times.iter(), now, Duration::hours(1))
    }

    /// Human messages within the last 24 hours.
    pub fn messages_24h(&self, now: NaiveDateTime) -> usize {
        count_within(self.message_times.iter(), now, Duration::hours(24))
    }

    /// Distinct human senders within the last hour.
    pub fn active_users_1h(&self, now: NaiveDateTime) -> usize {
        count_within(self.users_1h.values(), now, Duration::hours(1))
    }

    /// Distinct human senders within the last 24 hours.
    pub fn active_users_24h(&self, now: NaiveDateTime) -> usize {
        count_within(self.users_24h.values(), now, Duration::hours(24))
    }

    /// Minutes since the last message, never negative.
    pub fn current_silence(&self, now: NaiveDateTime) -> i64 {
        minutes_between(self.last_message_time, now)
    }

    fn record(&mut self, user_id: i64, is_self: bool, now: NaiveDateTime) {
        self.silence_minutes = minutes_between(self.last_message_time, now);
        if now > self.last_message_time {
            self.last_message_time = now;
        }

        if is_self {
            self.last_bot_message_time = Some(now);
            return;
        }

        self.message_times.push_back(now);
        self.users_1h.insert(user_id, now);
        self.users_24h.insert(user_id, now);
    }

    fn prune(&mut self, now: NaiveDateTime, config: &ActivityConfig) {
        let day_ago = now - Duration::hours(24);
        let hour_ago = now - Duration::hours(1);

        while self.message_times.front().is_some_and(|t| *t <= day_ago) {
            self.message_times.pop_front();
        }
        self.users_1h.retain(|_, seen| *seen > hour_ago);
        self.users_24h.retain(|_, seen| *seen > day_ago);

        truncate_users(&mut self.users_1h, config.max_users_1h, config.keep_users_1h);
        truncate_users(&mut self.users_24h, config.max_users_24h, config.keep_users_24h);

        let stale_attempts = self
            .attempts_date
            .or(self.last_bot_message_time.map(|t| t.date()))
            .is_some_and(|day| (now.date() - day).num_days() >= 1);
        if stale_attempts {
            self.interaction_attempts_today = 0;
            self.attempts_date = None;
        }
    }
}

fn count_within<'a>(
    times: impl Iterator<Item = &'a NaiveDateTime>,
    now: NaiveDateTime,
    window: Duration,
) -> usize {
    times.filter(|t| now - **t < window).count()
}

fn minutes_between(earlier: NaiveDateTime, later: NaiveDateTime) -> i64 {
    (later - earlier).num_minutes().max(0)
}

/// Keep the `keep` most recently seen users once the map grows past `max`.
fn truncate_users(users: &mut HashMap<i64, NaiveDateTime>, max: usize, keep: usize) {
    if users.len() <= max {
        return;
    }
    let mut by_recency: Vec<(i64, NaiveDateTime)> = users.drain().collect();
    by_recency.sort_by(|a, b| b.1.cmp(&a.1));
    users.extend(by_recency.into_iter().take(keep));
}

/// Coarse part of the day, used to flavour generated messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl TimeOfDay {
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            6..=11 => Self::Morning,
            12..=16 => Self::Afternoon,
            17..=21 => Self::Evening,
            _ => Self::Night,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Morning => "morning",
            Self::Afternoon => "afternoon",
            Self::Evening => "evening",
            Self::Night => "night",
        }
    }
}

/// Snapshot handed to the composer when Yuki decides to speak.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InteractionContext {
    pub chat_id: i64,
    pub silence_minutes: i64,
    pub messages_24h: usize,
    pub active_users_24h: usize,
    pub time_of_day: TimeOfDay,
    pub hour: u32,
    pub is_weekend: bool,
    pub attempts_today: u32,
}

/// Diagnostic counters for one chat.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatStats {
    pub chat_id: i64,
    pub messages_1h: usize,
    pub messages_24h: usize,
    pub active_users_1h: usize,
    pub active_users_24h: usize,
    pub silence_minutes: i64,
    pub minutes_since_bot_message: Option<i64>,
    pub attempts_today: u32,
}

#[derive(Default)]
struct StoreInner {
    chats: HashMap<i64, ChatActivity>,
    last_cleanup: Option<NaiveDateTime>,
}

/// In-memory home of all [`ChatActivity`] records.
///
/// Access goes through closures so the lock can never be held across an
/// `.await`. A persistent store would implement the same methods.
#[derive(Default)]
pub struct ActivityStore {
    inner: Mutex<StoreInner>,
}

impl ActivityStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Mutate a chat's record, creating it (seeded at `now`) if absent.
    pub fn upsert<R>(
        &self,
        chat_id: i64,
        now: NaiveDateTime,
        f: impl FnOnce(&mut ChatActivity) -> R,
    ) -> R {
        let mut inner = self.lock();
        let chat = inner
            .chats
            .entry(chat_id)
            .or_insert_with(|| ChatActivity::new(chat_id, now));
        f(chat)
    }

    /// Mutate an existing record; `None` when the chat is unknown.
    pub fn update<R>(&self, chat_id: i64, f: impl FnOnce(&mut ChatActivity) -> R) -> Option<R> {
        self.lock().chats.get_mut(&chat_id).map(f)
    }

    /// Read an existing record.
    pub fn read<R>(&self, chat_id: i64, f: impl FnOnce(&ChatActivity) -> R) -> Option<R> {
        self.lock().chats.get(&chat_id).map(f)
    }

    /// Ids of every record passing `filter`, sorted.
    pub fn select(&self, mut filter: impl FnMut(&ChatActivity) -> bool) -> Vec<i64> {
        let inner = self.lock();
        let mut ids: Vec<i64> = inner
            .chats
            .values()
            .filter(|c| filter(c))
            .map(|c| c.chat_id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Run `f` over every record if the cleanup interval has elapsed.
    fn maintain(
        &self,
        now: NaiveDateTime,
        interval: Duration,
        mut f: impl FnMut(&mut ChatActivity),
    ) -> bool {
        let mut inner = self.lock();
        let due = inner
            .last_cleanup
            .map_or(true, |last| now - last >= interval);
        if !due {
            return false;
        }
        inner.chats.values_mut().for_each(&mut f);
        inner.last_cleanup = Some(now);
        true
    }

    pub fn len(&self) -> usize {
        self.lock().chats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Records group traffic and answers "is this chat quiet?".
pub struct ActivityMonitor {
    config: ActivityConfig,
    store: ActivityStore,
}

impl ActivityMonitor {
    pub fn new(config: ActivityConfig) -> Self {
        Self {
            config,
            store: ActivityStore::new(),
        }
    }

    pub fn config(&self) -> &ActivityConfig {
        &self.config
    }

    /// Record one group message observed at `now`.
    ///
    /// Bot messages (`is_self`) reset the silence clock and the bot cooldown
    /// but never count as chat activity.
    pub fn track(&self, chat_id: i64, user_id: i64, is_self: bool, now: NaiveDateTime) {
        self.cleanup(now);
        self.store
            .upsert(chat_id, now, |chat| chat.record(user_id, is_self, now));
    }

    /// Record an incoming channel message. Private chats are ignored.
    pub fn track_incoming(&self, message: &IncomingMessage, self_id: Option<i64>) {
        if !message.is_group {
            return;
        }
        let now = message.timestamp.with_timezone(&Local).naive_local();
        let is_self = self_id == Some(message.sender_id);
        self.track(message.chat_id, message.sender_id, is_self, now);
    }

    /// Prune windows, cap user sets and roll over daily attempt counters.
    ///
    /// Runs at most once per `cleanup_interval_minutes`; returns whether it ran.
    pub fn cleanup(&self, now: NaiveDateTime) -> bool {
        let interval = Duration::minutes(self.config.cleanup_interval_minutes);
        let ran = self
            .store
            .maintain(now, interval, |chat| chat.prune(now, &self.config));
        if ran {
            debug!("activity: cleanup ran over {} chats", self.store.len());
        }
        ran
    }

    /// Whether Yuki may break the silence in `chat_id` right now.
    pub fn is_quiet(&self, chat_id: i64, now: NaiveDateTime) -> bool {
        self.store
            .read(chat_id, |chat| self.quiet(chat, now))
            .unwrap_or(false)
    }

    fn quiet(&self, chat: &ChatActivity, now: NaiveDateTime) -> bool {
        let cfg = &self.config;
        let cooldown = BOT_COOLDOWN_FLOOR_MINUTES.max(cfg.bot_cooldown_minutes);
        let cooled_down = chat
            .last_bot_message_time
            .map_or(true, |t| minutes_between(t, now) >= cooldown);

        chat.current_silence(now) >= cfg.silence_threshold_minutes
            && chat.messages_24h(now) >= cfg.min_messages_24h
            && chat.interaction_attempts_today < cfg.max_interactions_per_day
            && chat.active_users_24h(now) >= cfg.min_active_users
            && !cfg.is_sleep_hour(now.hour())
            && cooled_down
    }

    /// Every tracked chat that is currently quiet, ordered by chat id.
    pub fn quiet_chats(&self, now: NaiveDateTime) -> Vec<i64> {
        self.store.select(|chat| self.quiet(chat, now))
    }

    /// Snapshot for message generation; `None` for unknown chats.
    pub fn interaction_context(
        &self,
        chat_id: i64,
        now: NaiveDateTime,
    ) -> Option<InteractionContext> {
        self.store.read(chat_id, |chat| InteractionContext {
            chat_id,
            silence_minutes: chat.current_silence(now),
            messages_24h: chat.messages_24h(now),
            active_users_24h: chat.active_users_24h(now),
            time_of_day: TimeOfDay::from_hour(now.hour()),
            hour: now.hour(),
            is_weekend: matches!(now.weekday(), Weekday::Sat | Weekday::Sun),
            attempts_today: chat.interaction_attempts_today,
        })
    }

    /// Count one proactive message against the chat's daily allowance.
    pub fn mark_attempt(&self, chat_id: i64, now: NaiveDateTime) {
        let found = self.store.update(chat_id, |chat| {
            chat.interaction_attempts_today += 1;
            chat.attempts_date = Some(now.date());
        });
        if found.is_none() {
            debug!("activity: mark_attempt for untracked chat {chat_id}");
        }
    }

    pub fn stats(&self, chat_id: i64, now: NaiveDateTime) -> Option<ChatStats> {
        self.store.read(chat_id, |chat| ChatStats {
            chat_id,
            messages_1h: chat.messages_1h(now),
            messages_24h: chat.messages_24h(now),
            active_users_1h: chat.active_users_1h(now),
            active_users_24h: chat.active_users_24h(now),
            silence_minutes: chat.current_silence(now),
            minutes_since_bot_message: chat
                .last_bot_message_time
                .map(|t| minutes_between(t, now)),
            attempts_today: chat.interaction_attempts_today,
        })
    }

    /// Raw record, for diagnostics and tests.
    pub fn chat(&self, chat_id: i64) -> Option<ChatActivity> {
        self.store.read(chat_id, ChatActivity::clone)
    }

    pub fn tracked_chats(&self) -> usize {
        self.store.len()
    }
}
