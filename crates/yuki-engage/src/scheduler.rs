//! Background auto-interaction loop.
//!
//! One scheduler per bot instance. Every `check_interval_minutes` it wakes,
//! applies the global gates (rest period, daily cap, sleep hours), samples
//! a few quiet chats, rolls the dice for each and, when the roll succeeds,
//! composes and sends an opener after a short human-like delay.
//!
//! Lifecycle is an explicit `Stopped`/`Running` state machine. The loop
//! receives a `watch` shutdown signal; `stop()` flips it and awaits the task,
//! so no cycle is still running once `stop()` returns.

use crate::activity::{ActivityMonitor, ChatStats, InteractionContext};
use crate::clock::{Clock, SystemClock};
use crate::composer::MessageComposer;
use crate::dispatch::Dispatcher;
use chrono::{NaiveDate, NaiveDateTime, Timelike};
use futures_util::FutureExt;
use rand::{seq::SliceRandom, Rng};
use serde::Serialize;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use yuki_core::{config::InteractionConfig, error::YukiError, message::SentMessage};

/// Proactive messages allowed per day across all chats.
pub const DAILY_INTERACTION_CAP: u32 = 10;

/// Chats above this many messages in 24h are tried first.
const HIGH_TRAFFIC_MESSAGES_24H: usize = 20;

/// Shortest wait between two cycles, whatever the configured interval.
const MIN_CYCLE_WAIT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerPhase {
    Stopped,
    Running,
}

/// Why a cycle did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Still inside `rest_between_interactions` since the last message.
    Resting,
    DailyCapReached,
    SleepHours,
    NoQuietChats,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Resting => "resting since last interaction",
            Self::DailyCapReached => "daily interaction cap reached",
            Self::SleepHours => "sleep hours",
            Self::NoQuietChats => "no quiet chats",
        };
        f.write_str(s)
    }
}

/// What one cycle did, chat by chat.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleSummary {
    /// Chats picked this cycle, in processing order.
    pub selected: Vec<i64>,
    pub sent: Vec<i64>,
    pub failed: Vec<i64>,
    /// Selected but lost the probability roll.
    pub passed: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum CycleReport {
    Skipped(SkipReason),
    Ran(CycleSummary),
}

/// Snapshot returned by [`InteractionScheduler::status`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchedulerStatus {
    pub phase: SchedulerPhase,
    pub running: bool,
    pub interactions_today: u32,
    pub daily_cap: u32,
    pub last_interaction_time: Option<NaiveDateTime>,
    pub self_id: Option<i64>,
    pub settings: InteractionConfig,
}

/// A quiet chat as seen by a diagnostic check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuietChat {
    pub stats: ChatStats,
    pub context: InteractionContext,
}

/// Result of [`InteractionScheduler::run_check_now`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckReport {
    pub checked_at: NaiveDateTime,
    pub tracked_chats: usize,
    /// Global gate that would stop a real cycle right now, if any.
    pub blocked_by: Option<SkipReason>,
    pub quiet: Vec<QuietChat>,
}

struct SchedulerState {
    phase: SchedulerPhase,
    last_interaction_time: Option<NaiveDateTime>,
    interactions_today: u32,
    daily_reset_date: Option<NaiveDate>,
    self_id: Option<i64>,
    settings: InteractionConfig,
}

struct LoopHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Picks quiet chats and talks to them.
pub struct InteractionScheduler {
    monitor: Arc<ActivityMonitor>,
    composer: MessageComposer,
    dispatcher: Arc<dyn Dispatcher>,
    clock: Arc<dyn Clock>,
    state: Mutex<SchedulerState>,
    worker: tokio::sync::Mutex<Option<LoopHandle>>,
}

impl InteractionScheduler {
    pub fn new(
        monitor: Arc<ActivityMonitor>,
        composer: MessageComposer,
        dispatcher: Arc<dyn Dispatcher>,
        settings: InteractionConfig,
    ) -> Self {
        Self {
            monitor,
            composer,
            dispatcher,
            clock: Arc::new(SystemClock),
            state: Mutex::new(SchedulerState {
                phase: SchedulerPhase::Stopped,
                last_interaction_time: None,
                interactions_today: 0,
                daily_reset_date: None,
                self_id: None,
                settings,
            }),
            worker: tokio::sync::Mutex::new(None),
        }
    }

    /// Replace the wall clock (tests, simulations).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn lock_state(&self) -> MutexGuard<'_, SchedulerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn settings(&self) -> InteractionConfig {
        self.lock_state().settings.clone()
    }

    pub fn is_running(&self) -> bool {
        self.lock_state().phase == SchedulerPhase::Running
    }

    pub fn status(&self) -> SchedulerStatus {
        let state = self.lock_state();
        SchedulerStatus {
            phase: state.phase,
            running: state.phase == SchedulerPhase::Running,
            interactions_today: state.interactions_today,
            daily_cap: DAILY_INTERACTION_CAP,
            last_interaction_time: state.last_interaction_time,
            self_id: state.self_id,
            settings: state.settings.clone(),
        }
    }

    /// Set one setting from its textual value. Takes effect on the next cycle.
    ///
    /// Values are parsed to the key's type and stored as given.
    pub fn update_setting(&self, key: &str, value: &str) -> Result<(), YukiError> {
        let value = value.trim();
        let mut state = self.lock_state();
        let settings = &mut state.settings;
        match key {
            "check_interval_minutes" => settings.check_interval_minutes = parse(key, value)?,
            "interaction_probability" => settings.interaction_probability = parse(key, value)?,
            "random_delay_min" => settings.random_delay_min = parse(key, value)?,
            "random_delay_max" => settings.random_delay_max = parse(key, value)?,
            "max_groups_per_cycle" => settings.max_groups_per_cycle = parse(key, value)?,
            "rest_between_interactions" => {
                settings.rest_between_interactions = parse(key, value)?
            }
            "enabled" => settings.enabled = parse_bool(value)?,
            _ => {
                return Err(YukiError::Config(format!(
                    "unknown interaction setting '{key}'"
                )))
            }
        }
        info!("interaction: setting {key} = {value}");
        Ok(())
    }

    /// Replace the whole settings record.
    pub fn replace_settings(&self, settings: InteractionConfig) {
        self.lock_state().settings = settings;
    }

    /// Start the background loop. No-op when already running.
    ///
    /// Fails when auto-interaction is disabled or the bot's own id cannot
    /// be resolved.
    pub async fn start(self: &Arc<Self>) -> Result<(), YukiError> {
        let mut worker = self.worker.lock().await;
        if worker.as_ref().is_some_and(|w| !w.task.is_finished()) {
            debug!("interaction: scheduler already running");
            return Ok(());
        }
        if !self.settings().enabled {
            return Err(YukiError::Scheduler(
                "auto-interaction is disabled".to_string(),
            ));
        }

        let self_id = self.dispatcher.resolve_self_id().await?;
        let (shutdown, rx) = watch::channel(false);
        {
            let mut state = self.lock_state();
            state.self_id = Some(self_id);
            state.phase = SchedulerPhase::Running;
        }
        let task = tokio::spawn(Arc::clone(self).run_loop(rx));
        *worker = Some(LoopHandle { shutdown, task });

        let settings = self.settings();
        info!(
            "interaction: scheduler started (every {}m, p={}, bot id {self_id})",
            settings.check_interval_minutes, settings.interaction_probability
        );
        Ok(())
    }

    /// Cancel the loop and wait for it to finish. Safe to call repeatedly.
    pub async fn stop(&self) {
        let handle = self.worker.lock().await.take();
        if let Some(LoopHandle { shutdown, task }) = handle {
            // The loop may already be gone (fatal path); nothing to signal then.
            let _ = shutdown.send(true);
            if let Err(e) = task.await {
                if e.is_panic() {
                    warn!("interaction: scheduler task panicked during shutdown");
                }
            }
            info!("interaction: scheduler stopped");
        }
        self.lock_state().phase = SchedulerPhase::Stopped;
    }

    async fn run_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        loop {
            let wait = minutes_to_duration(self.settings().check_interval_minutes)
                .max(MIN_CYCLE_WAIT);
            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = shutdown.changed() => break,
            }

            let cycle = AssertUnwindSafe(self.run_cycle()).catch_unwind();
            tokio::select! {
                outcome = cycle => match outcome {
                    Ok(CycleReport::Skipped(reason)) => debug!("interaction: cycle skipped: {reason}"),
                    Ok(CycleReport::Ran(summary)) => info!(
                        "interaction: cycle done, {} selected, {} sent, {} failed",
                        summary.selected.len(),
                        summary.sent.len(),
                        summary.failed.len()
                    ),
                    Err(_) => {
                        error!("interaction: cycle panicked, scheduler stopped");
                        self.lock_state().phase = SchedulerPhase::Stopped;
                        return;
                    }
                },
                _ = shutdown.changed() => break,
            }
        }
        debug!("interaction: scheduler loop cancelled");
    }

    /// One wake-up: gates, selection, and interactions.
    pub async fn run_cycle(&self) -> CycleReport {
        let now = self.clock.now();
        self.roll_daily(now);
        self.monitor.cleanup(now);

        let settings = self.settings();
        if let Some(reason) = self.gate(now, &settings) {
            return CycleReport::Skipped(reason);
        }

        let quiet = self.monitor.quiet_chats(now);
        if quiet.is_empty() {
            return CycleReport::Skipped(SkipReason::NoQuietChats);
        }

        let selected = self.select_chats(&quiet, &settings, now);
        let rest = minutes_to_duration(settings.rest_between_interactions);
        let mut summary = CycleSummary {
            selected: selected.clone(),
            ..Default::default()
        };

        for (i, chat_id) in selected.iter().copied().enumerate() {
            if !roll(settings.interaction_probability) {
                summary.passed.push(chat_id);
                continue;
            }
            if self.lock_state().interactions_today >= DAILY_INTERACTION_CAP {
                info!("interaction: daily cap reached mid-cycle");
                break;
            }

            if self.interact(chat_id, self.clock.now()).await {
                summary.sent.push(chat_id);
            } else {
                summary.failed.push(chat_id);
            }

            if i + 1 < selected.len() {
                tokio::time::sleep(rest).await;
            }
        }

        CycleReport::Ran(summary)
    }

    /// Compose and send one opener into `chat_id`. Returns whether it was sent.
    ///
    /// Failures are logged here and never propagated.
    pub async fn interact(&self, chat_id: i64, now: NaiveDateTime) -> bool {
        match self.try_interact(chat_id, now).await {
            Ok(sent) => {
                info!(
                    "interaction: sent message {} to chat {chat_id}",
                    sent.message_id
                );
                true
            }
            Err(e) => {
                warn!("interaction: chat {chat_id}: {e}");
                false
            }
        }
    }

    async fn try_interact(
        &self,
        chat_id: i64,
        now: NaiveDateTime,
    ) -> Result<SentMessage, YukiError> {
        let settings = self.settings();
        let limit = Duration::from_secs(settings.call_timeout_secs);

        let ctx = self
            .monitor
            .interaction_context(chat_id, now)
            .ok_or_else(|| YukiError::Scheduler(format!("no activity tracked for chat {chat_id}")))?;

        let text = tokio::time::timeout(limit, self.composer.generate(&ctx))
            .await
            .map_err(|_| {
                YukiError::Provider(format!(
                    "composer timed out after {}s",
                    settings.call_timeout_secs
                ))
            })?;
        if text.trim().is_empty() {
            return Err(YukiError::Provider("composer returned no text".to_string()));
        }

        let delay = random_delay(&settings);
        debug!("interaction: waiting {}s before posting to {chat_id}", delay.as_secs());
        tokio::time::sleep(delay).await;

        let sent = tokio::time::timeout(limit, self.dispatcher.send(chat_id, &text))
            .await
            .map_err(|_| {
                YukiError::Channel(format!(
                    "send timed out after {}s",
                    settings.call_timeout_secs
                ))
            })??;

        let sent_at = now + chrono::Duration::seconds(delay.as_secs() as i64);
        self.record_success(chat_id, &sent, sent_at);
        Ok(sent)
    }

    /// The bot-spoke feedback edge: count the attempt and feed the message
    /// back into the tracker so cooldown and silence see it.
    fn record_success(&self, chat_id: i64, sent: &SentMessage, at: NaiveDateTime) {
        self.roll_daily(at);
        self.monitor.mark_attempt(chat_id, at);

        let self_id = {
            let mut state = self.lock_state();
            state.last_interaction_time = Some(at);
            state.interactions_today += 1;
            state.self_id.unwrap_or(sent.sender_id)
        };
        self.monitor.track(chat_id, self_id, true, at);
    }

    /// Diagnostics: evaluate every tracked chat without sending anything.
    pub fn run_check_now(&self, now: NaiveDateTime) -> CheckReport {
        let settings = self.settings();
        let quiet = self
            .monitor
            .quiet_chats(now)
            .into_iter()
            .filter_map(|chat_id| {
                Some(QuietChat {
                    stats: self.monitor.stats(chat_id, now)?,
                    context: self.monitor.interaction_context(chat_id, now)?,
                })
            })
            .collect();

        CheckReport {
            checked_at: now,
            tracked_chats: self.monitor.tracked_chats(),
            blocked_by: self.gate(now, &settings),
            quiet,
        }
    }

    fn roll_daily(&self, now: NaiveDateTime) {
        let today = now.date();
        let mut state = self.lock_state();
        match state.daily_reset_date {
            Some(day) if day == today => {}
            Some(_) => {
                info!(
                    "interaction: new day, resetting counter ({} sent yesterday)",
                    state.interactions_today
                );
                state.interactions_today = 0;
                state.daily_reset_date = Some(today);
            }
            None => state.daily_reset_date = Some(today),
        }
    }

    fn gate(&self, now: NaiveDateTime, settings: &InteractionConfig) -> Option<SkipReason> {
        {
            let state = self.lock_state();
            let resting = state
                .last_interaction_time
                .is_some_and(|last| (now - last).num_minutes() < settings.rest_between_interactions);
            if resting {
                return Some(SkipReason::Resting);
            }
            if state.interactions_today >= DAILY_INTERACTION_CAP {
                return Some(SkipReason::DailyCapReached);
            }
        }
        if self.monitor.config().is_sleep_hour(now.hour()) {
            return Some(SkipReason::SleepHours);
        }
        None
    }

    /// Random sample of up to `max_groups_per_cycle`, busy chats first.
    fn select_chats(
        &self,
        quiet: &[i64],
        settings: &InteractionConfig,
        now: NaiveDateTime,
    ) -> Vec<i64> {
        let n = usize::try_from(settings.max_groups_per_cycle).unwrap_or(0);
        let picked: Vec<i64> = quiet
            .choose_multiple(&mut rand::thread_rng(), n)
            .copied()
            .collect();

        let mut ranked: Vec<(i64, bool)> = picked
            .into_iter()
            .map(|chat_id| {
                let busy = self
                    .monitor
                    .stats(chat_id, now)
                    .is_some_and(|s| s.messages_24h > HIGH_TRAFFIC_MESSAGES_24H);
                (chat_id, busy)
            })
            .collect();
        ranked.sort_by_key(|(_, busy)| !busy);
        ranked.into_iter().map(|(chat_id, _)| chat_id).collect()
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, YukiError>
where
    T::Err: fmt::Display,
{
    value
        .parse()
        .map_err(|e| YukiError::Config(format!("invalid value '{value}' for {key}: {e}")))
}

fn parse_bool(value: &str) -> Result<bool, YukiError> {
    match value.to_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Ok(true),
        "false" | "off" | "no" | "0" => Ok(false),
        _ => Err(YukiError::Config(format!(
            "invalid value '{value}' for enabled: expected true/false"
        ))),
    }
}

/// `true` with probability `p`. Values outside 0..=1 saturate; NaN never fires.
fn roll(p: f64) -> bool {
    rand::thread_rng().gen::<f64>() < p
}

/// Negative minutes wait zero.
fn minutes_to_duration(minutes: i64) -> Duration {
    Duration::from_secs(u64::try_from(minutes).unwrap_or(0).saturating_mul(60))
}

fn random_delay(settings: &InteractionConfig) -> Duration {
    let min = settings.random_delay_min.max(0);
    let max = settings.random_delay_max.max(0);
    let secs = if max <= min {
        min
    } else {
        rand::thread_rng().gen_range(min..=max)
    };
    Duration::from_secs(u64::try_from(secs).unwrap_or(0))
}

#[cfg(test)]
mod tests;
