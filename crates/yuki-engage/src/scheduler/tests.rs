use super::*;
use crate::clock::ManualClock;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use yuki_core::{
    config::ActivityConfig, context::Context, message::OutgoingMessage, traits::Provider,
};

const BOT: i64 = 4242;

struct FixedProvider(String);

#[async_trait]
impl Provider for FixedProvider {
    fn name(&self) -> &str {
        "fixed"
    }

    fn requires_api_key(&self) -> bool {
        false
    }

    async fn complete(&self, _context: &Context) -> Result<OutgoingMessage, YukiError> {
        Ok(OutgoingMessage {
            text: self.0.clone(),
            ..Default::default()
        })
    }

    async fn is_available(&self) -> bool {
        true
    }
}

#[derive(Default)]
struct MockDispatcher {
    sent: Mutex<Vec<(i64, String)>>,
    fail: bool,
}

impl MockDispatcher {
    fn sent(&self) -> Vec<(i64, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Dispatcher for MockDispatcher {
    async fn send(&self, chat_id: i64, text: &str) -> Result<SentMessage, YukiError> {
        if self.fail {
            return Err(YukiError::Channel("chat not found".into()));
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push((chat_id, text.to_string()));
        Ok(SentMessage {
            chat_id,
            message_id: sent.len() as i64,
            sender_id: BOT,
            timestamp: Utc::now(),
        })
    }

    async fn resolve_self_id(&self) -> Result<i64, YukiError> {
        Ok(BOT)
    }
}

struct Harness {
    scheduler: Arc<InteractionScheduler>,
    monitor: Arc<ActivityMonitor>,
    dispatcher: Arc<MockDispatcher>,
    clock: Arc<ManualClock>,
}

/// Monday noon.
fn noon() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 3, 2)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

/// Immediate, always-firing settings with no delays.
fn fast_settings() -> InteractionConfig {
    InteractionConfig {
        interaction_probability: 1.0,
        random_delay_min: 0,
        random_delay_max: 0,
        max_groups_per_cycle: 5,
        rest_between_interactions: 0,
        ..Default::default()
    }
}

fn harness_with(reply: &str, settings: InteractionConfig, dispatcher: MockDispatcher) -> Harness {
    harness_with_provider(
        Arc::new(FixedProvider(reply.to_string())),
        settings,
        dispatcher,
    )
}

fn harness_with_provider(
    provider: Arc<dyn Provider>,
    settings: InteractionConfig,
    dispatcher: MockDispatcher,
) -> Harness {
    let monitor = Arc::new(ActivityMonitor::new(ActivityConfig::default()));
    let dispatcher = Arc::new(dispatcher);
    let clock = Arc::new(ManualClock::new(noon()));
    let composer = MessageComposer::new(provider, "You are Yuki.");
    let scheduler = InteractionScheduler::new(
        monitor.clone(),
        composer,
        dispatcher.clone(),
        settings,
    )
    .with_clock(clock.clone());
    Harness {
        scheduler: Arc::new(scheduler),
        monitor,
        dispatcher,
        clock,
    }
}

fn harness(reply: &str) -> Harness {
    harness_with(reply, fast_settings(), MockDispatcher::default())
}

/// `count` human messages from two users, 40 minutes before noon.
fn lively(monitor: &ActivityMonitor, chat_id: i64, count: i64) {
    let t = noon() - chrono::Duration::minutes(40);
    for i in 0..count {
        monitor.track(chat_id, 100 + (i % 2), false, t);
    }
}

// --- interact ---

#[tokio::test]
async fn test_interact_empty_composer_never_dispatches() {
    let h = harness("   ");
    lively(&h.monitor, -1, 12);

    assert!(!h.scheduler.interact(-1, noon()).await);
    assert!(h.dispatcher.sent().is_empty());

    let status = h.scheduler.status();
    assert_eq!(status.interactions_today, 0);
    assert!(status.last_interaction_time.is_none());
    assert_eq!(h.monitor.chat(-1).unwrap().interaction_attempts_today, 0);
}

#[tokio::test]
async fn test_interact_leaked_only_reply_never_dispatches() {
    let h = harness("Instructions: write ONE short message");
    lively(&h.monitor, -1, 12);
    assert!(!h.scheduler.interact(-1, noon()).await);
    assert!(h.dispatcher.sent().is_empty());
}

#[tokio::test]
async fn test_interact_unknown_chat_fails() {
    let h = harness("hello?");
    assert!(!h.scheduler.interact(-1, noon()).await);
    assert!(h.dispatcher.sent().is_empty());
}

#[tokio::test]
async fn test_interact_success_feeds_back_into_tracker() {
    let h = harness("so... who's watching the game tonight?");
    lively(&h.monitor, -1, 12);
    assert!(h.monitor.is_quiet(-1, noon()));

    assert!(h.scheduler.interact(-1, noon()).await);
    assert_eq!(
        h.dispatcher.sent(),
        vec![(-1, "so... who's watching the game tonight?".to_string())]
    );

    let status = h.scheduler.status();
    assert_eq!(status.interactions_today, 1);
    assert_eq!(status.last_interaction_time, Some(noon()));

    let chat = h.monitor.chat(-1).unwrap();
    assert_eq!(chat.interaction_attempts_today, 1);
    assert_eq!(chat.last_bot_message_time, Some(noon()));
    assert_eq!(chat.messages_24h(noon()), 12, "bot message is not human activity");
    assert!(!h.monitor.is_quiet(-1, noon() + chrono::Duration::minutes(5)));
}

#[tokio::test]
async fn test_interact_dispatch_failure_leaves_counters() {
    let h = harness_with(
        "hey",
        fast_settings(),
        MockDispatcher {
            fail: true,
            ..Default::default()
        },
    );
    lively(&h.monitor, -1, 12);

    assert!(!h.scheduler.interact(-1, noon()).await);
    assert_eq!(h.scheduler.status().interactions_today, 0);
    assert!(h.monitor.chat(-1).unwrap().last_bot_message_time.is_none());
}

// --- cycles ---

#[tokio::test]
async fn test_cycle_sends_to_quiet_chats_busy_first() {
    let h = harness("anyone up for a movie?");
    lively(&h.monitor, -1, 11);
    lively(&h.monitor, -2, 25);

    let CycleReport::Ran(summary) = h.scheduler.run_cycle().await else {
        panic!("expected a cycle to run");
    };
    assert_eq!(summary.selected, vec![-2, -1]);
    assert_eq!(summary.sent, vec![-2, -1]);
    assert!(summary.failed.is_empty());
    assert_eq!(h.scheduler.status().interactions_today, 2);

    // Both chats are now in bot cooldown.
    assert_eq!(
        h.scheduler.run_cycle().await,
        CycleReport::Skipped(SkipReason::NoQuietChats)
    );
}

#[tokio::test]
async fn test_cycle_respects_max_groups() {
    let mut settings = fast_settings();
    settings.max_groups_per_cycle = 1;
    let h = harness_with("hi all", settings, MockDispatcher::default());
    for chat in [-1, -2, -3] {
        lively(&h.monitor, chat, 11);
    }

    let CycleReport::Ran(summary) = h.scheduler.run_cycle().await else {
        panic!("expected a cycle to run");
    };
    assert_eq!(summary.selected.len(), 1);
    assert_eq!(h.dispatcher.sent().len(), 1);
}

#[tokio::test]
async fn test_cycle_negative_group_limit_selects_nothing() {
    let h = harness("hi");
    h.scheduler.update_setting("max_groups_per_cycle", "-3").unwrap();
    lively(&h.monitor, -1, 11);

    assert_eq!(
        h.scheduler.run_cycle().await,
        CycleReport::Ran(CycleSummary::default())
    );
}

#[tokio::test]
async fn test_cycle_zero_probability_sends_nothing() {
    let h = harness("hi");
    h.scheduler.update_setting("interaction_probability", "0").unwrap();
    lively(&h.monitor, -1, 11);

    let CycleReport::Ran(summary) = h.scheduler.run_cycle().await else {
        panic!("expected a cycle to run");
    };
    assert_eq!(summary.passed, vec![-1]);
    assert!(h.dispatcher.sent().is_empty());
}

#[tokio::test]
async fn test_cycle_skips_during_sleep_hours() {
    let h = harness("hi");
    let t = noon() - chrono::Duration::hours(9);
    for i in 0..11 {
        h.monitor.track(-1, 100 + (i % 2), false, t - chrono::Duration::hours(1));
    }
    h.clock.set(t);
    assert_eq!(
        h.scheduler.run_cycle().await,
        CycleReport::Skipped(SkipReason::SleepHours)
    );
    assert!(h.dispatcher.sent().is_empty());
}

#[tokio::test]
async fn test_cycle_rests_between_interactions() {
    let h = harness("hi");
    h.scheduler.update_setting("rest_between_interactions", "30").unwrap();
    lively(&h.monitor, -1, 11);
    assert!(h.scheduler.interact(-1, noon()).await);

    h.clock.advance_minutes(10);
    assert_eq!(
        h.scheduler.run_cycle().await,
        CycleReport::Skipped(SkipReason::Resting)
    );
}

#[tokio::test]
async fn test_cycle_daily_cap_and_rollover() {
    let h = harness("hi");
    lively(&h.monitor, -1, 11);
    for _ in 0..DAILY_INTERACTION_CAP {
        assert!(h.scheduler.interact(-1, noon()).await);
    }
    assert_eq!(
        h.scheduler.run_cycle().await,
        CycleReport::Skipped(SkipReason::DailyCapReached)
    );

    h.clock.advance_minutes(24 * 60);
    let report = h.scheduler.run_cycle().await;
    assert_ne!(report, CycleReport::Skipped(SkipReason::DailyCapReached));
    assert_eq!(h.scheduler.status().interactions_today, 0);
    assert_eq!(h.monitor.chat(-1).unwrap().interaction_attempts_today, 0);
}

#[tokio::test]
async fn test_cycle_without_quiet_chats() {
    let h = harness("hi");
    h.monitor.track(-1, 100, false, noon());
    assert_eq!(
        h.scheduler.run_cycle().await,
        CycleReport::Skipped(SkipReason::NoQuietChats)
    );
}

// --- diagnostics ---

#[tokio::test]
async fn test_run_check_now_reports_without_sending() {
    let h = harness("hi");
    lively(&h.monitor, -1, 11);
    h.monitor.track(-2, 100, false, noon());

    let report = h.scheduler.run_check_now(noon());
    assert_eq!(report.tracked_chats, 2);
    assert!(report.blocked_by.is_none());
    assert_eq!(report.quiet.len(), 1);
    assert_eq!(report.quiet[0].stats.chat_id, -1);
    assert_eq!(report.quiet[0].context.silence_minutes, 40);
    assert!(h.dispatcher.sent().is_empty());
}

// --- settings ---

#[test]
fn test_update_setting_round_trip_without_clamping() {
    let h = harness("hi");
    let s = &h.scheduler;
    s.update_setting("check_interval_minutes", "-5").unwrap();
    s.update_setting("interaction_probability", "7.5").unwrap();
    s.update_setting("random_delay_min", "500").unwrap();
    s.update_setting("random_delay_max", "10").unwrap();
    s.update_setting("max_groups_per_cycle", "0").unwrap();
    s.update_setting("rest_between_interactions", "-1").unwrap();
    s.update_setting("enabled", "off").unwrap();

    let settings = s.status().settings;
    assert_eq!(settings.check_interval_minutes, -5);
    assert_eq!(settings.interaction_probability, 7.5);
    assert_eq!(settings.random_delay_min, 500);
    assert_eq!(settings.random_delay_max, 10);
    assert_eq!(settings.max_groups_per_cycle, 0);
    assert_eq!(settings.rest_between_interactions, -1);
    assert!(!settings.enabled);
}

#[test]
fn test_update_setting_rejects_unknown_key_and_bad_value() {
    let h = harness("hi");
    let before = h.scheduler.settings();

    let err = h.scheduler.update_setting("volume", "11").unwrap_err();
    assert!(matches!(err, YukiError::Config(_)));
    let err = h
        .scheduler
        .update_setting("check_interval_minutes", "soon")
        .unwrap_err();
    assert!(matches!(err, YukiError::Config(_)));
    let err = h.scheduler.update_setting("enabled", "maybe").unwrap_err();
    assert!(matches!(err, YukiError::Config(_)));

    assert_eq!(h.scheduler.settings(), before);
}

#[test]
fn test_random_delay_bounds() {
    let mut settings = fast_settings();
    settings.random_delay_min = 20;
    settings.random_delay_max = 5;
    assert_eq!(random_delay(&settings), Duration::from_secs(20));

    settings.random_delay_min = -10;
    settings.random_delay_max = -1;
    assert_eq!(random_delay(&settings), Duration::ZERO);

    settings.random_delay_min = 1;
    settings.random_delay_max = 3;
    for _ in 0..50 {
        let d = random_delay(&settings).as_secs();
        assert!((1..=3).contains(&d));
    }
}

#[test]
fn test_roll_extremes() {
    assert!((0..100).all(|_| roll(1.0)));
    assert!((0..100).all(|_| !roll(0.0)));
    assert!(!roll(f64::NAN));
    assert!(roll(3.0));
    assert!(!roll(-1.0));
}

// --- lifecycle ---

#[tokio::test]
async fn test_stop_when_never_started_is_noop() {
    let h = harness("hi");
    h.scheduler.stop().await;
    h.scheduler.stop().await;
    assert!(!h.scheduler.is_running());
}

#[tokio::test]
async fn test_start_then_stop_twice() {
    let h = harness("hi");
    h.scheduler.start().await.unwrap();
    let status = h.scheduler.status();
    assert!(status.running);
    assert_eq!(status.phase, SchedulerPhase::Running);
    assert_eq!(status.self_id, Some(BOT));

    // Starting again is a no-op.
    h.scheduler.start().await.unwrap();

    h.scheduler.stop().await;
    assert!(!h.scheduler.is_running());
    h.scheduler.stop().await;
    assert_eq!(h.scheduler.status().phase, SchedulerPhase::Stopped);
}

#[tokio::test]
async fn test_start_refused_when_disabled() {
    let mut settings = fast_settings();
    settings.enabled = false;
    let h = harness_with("hi", settings, MockDispatcher::default());

    let err = h.scheduler.start().await.unwrap_err();
    assert!(matches!(err, YukiError::Scheduler(_)));
    assert!(!h.scheduler.is_running());
}

#[tokio::test]
async fn test_restart_after_stop() {
    let h = harness("hi");
    h.scheduler.start().await.unwrap();
    h.scheduler.stop().await;
    h.scheduler.start().await.unwrap();
    assert!(h.scheduler.is_running());
    h.scheduler.stop().await;
}

// --- background loop (paused tokio time) ---

/// Panics on the first completion, answers normally afterwards.
struct PanicOnceProvider {
    panicked: std::sync::atomic::AtomicBool,
}

#[async_trait]
impl Provider for PanicOnceProvider {
    fn name(&self) -> &str {
        "panic-once"
    }

    fn requires_api_key(&self) -> bool {
        false
    }

    async fn complete(&self, _context: &Context) -> Result<OutgoingMessage, YukiError> {
        if !self
            .panicked
            .swap(true, std::sync::atomic::Ordering::SeqCst)
        {
            panic!("provider blew up");
        }
        Ok(OutgoingMessage {
            text: "back again".into(),
            ..Default::default()
        })
    }

    async fn is_available(&self) -> bool {
        true
    }
}

#[tokio::test(start_paused = true)]
async fn test_stop_cancels_cycle_waiting_to_send() {
    let settings = InteractionConfig {
        check_interval_minutes: 1,
        random_delay_min: 30,
        random_delay_max: 30,
        ..fast_settings()
    };
    let h = harness_with("hi", settings, MockDispatcher::default());
    lively(&h.monitor, -1, 12);
    h.scheduler.start().await.unwrap();

    // First cycle fires at 60s and then waits 30s before sending.
    tokio::time::sleep(Duration::from_secs(65)).await;
    assert!(h.scheduler.is_running());
    assert!(h.dispatcher.sent().is_empty());

    h.scheduler.stop().await;
    assert!(!h.scheduler.is_running());

    tokio::time::sleep(Duration::from_secs(300)).await;
    assert!(h.dispatcher.sent().is_empty());
    assert_eq!(h.scheduler.status().interactions_today, 0);
}

#[tokio::test(start_paused = true)]
async fn test_loop_sends_after_cycle_wait() {
    let settings = InteractionConfig {
        check_interval_minutes: 1,
        ..fast_settings()
    };
    let h = harness_with("hi", settings, MockDispatcher::default());
    lively(&h.monitor, -1, 12);
    h.scheduler.start().await.unwrap();

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(h.dispatcher.sent().is_empty());

    tokio::time::sleep(Duration::from_secs(35)).await;
    assert_eq!(h.dispatcher.sent(), vec![(-1, "hi".to_string())]);
    h.scheduler.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_panicking_cycle_stops_scheduler_and_restart_recovers() {
    let settings = InteractionConfig {
        check_interval_minutes: 1,
        ..fast_settings()
    };
    let provider = Arc::new(PanicOnceProvider {
        panicked: std::sync::atomic::AtomicBool::new(false),
    });
    let h = harness_with_provider(provider, settings, MockDispatcher::default());
    lively(&h.monitor, -1, 12);

    h.scheduler.start().await.unwrap();
    tokio::time::sleep(Duration::from_secs(65)).await;
    assert!(!h.scheduler.is_running());
    assert_eq!(h.scheduler.status().phase, SchedulerPhase::Stopped);
    assert!(h.dispatcher.sent().is_empty());

    h.scheduler.start().await.unwrap();
    assert!(h.scheduler.is_running());
    tokio::time::sleep(Duration::from_secs(65)).await;
    assert_eq!(h.dispatcher.sent(), vec![(-1, "back again".to_string())]);
    h.scheduler.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_cycle_rests_between_chats_but_not_after_last() {
    let settings = InteractionConfig {
        rest_between_interactions: 10,
        ..fast_settings()
    };
    let h = harness_with("hi", settings, MockDispatcher::default());
    lively(&h.monitor, -1, 12);
    lively(&h.monitor, -2, 12);

    let started = tokio::time::Instant::now();
    match h.scheduler.run_cycle().await {
        CycleReport::Ran(summary) => assert_eq!(summary.sent.len(), 2),
        other => panic!("unexpected report: {other:?}"),
    }
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(600), "{elapsed:?}");
    assert!(elapsed < Duration::from_secs(1200), "{elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn test_cycle_single_chat_does_not_rest() {
    let settings = InteractionConfig {
        rest_between_interactions: 10,
        ..fast_settings()
    };
    let h = harness_with("hi", settings, MockDispatcher::default());
    lively(&h.monitor, -1, 12);

    let started = tokio::time::Instant::now();
    match h.scheduler.run_cycle().await {
        CycleReport::Ran(summary) => assert_eq!(summary.sent, vec![-1]),
        other => panic!("unexpected report: {other:?}"),
    }
    assert!(started.elapsed() < Duration::from_secs(1));
}
