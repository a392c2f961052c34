//! Serde default functions for every config field.

pub(super) fn default_true() -> bool {
    true
}
pub(super) fn default_name() -> String {
    "Yuki".to_string()
}
pub(super) fn default_data_dir() -> String {
    "~/.yuki".to_string()
}
pub(super) fn default_log_level() -> String {
    "info".to_string()
}
pub(super) fn default_persona() -> String {
    "You are Yuki, a cheerful and slightly playful member of this Telegram group. \
     You speak casually, keep messages short, use at most one emoji, and never \
     sound like a bot or an assistant."
        .to_string()
}
pub(super) fn default_provider() -> String {
    "gemini".to_string()
}
pub(super) fn default_gemini_model() -> String {
    "gemini-2.0-flash".to_string()
}
pub(super) fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
pub(super) fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}
pub(super) fn default_db_path() -> String {
    "~/.yuki/data/memory.db".to_string()
}
pub(super) fn default_max_recall() -> i64 {
    5
}
pub(super) fn default_history_messages() -> i64 {
    12
}

// --- activity monitor ---

pub(super) fn default_silence_threshold() -> i64 {
    30
}
pub(super) fn default_min_messages_24h() -> usize {
    10
}
pub(super) fn default_max_interactions_per_day() -> u32 {
    3
}
pub(super) fn default_min_active_users() -> usize {
    2
}
pub(super) fn default_sleep_hours() -> Vec<u32> {
    (0..=5).collect()
}
pub(super) fn default_bot_cooldown() -> i64 {
    15
}
pub(super) fn default_cleanup_interval() -> i64 {
    60
}
pub(super) fn default_max_users_1h() -> usize {
    20
}
pub(super) fn default_keep_users_1h() -> usize {
    10
}
pub(super) fn default_max_users_24h() -> usize {
    50
}
pub(super) fn default_keep_users_24h() -> usize {
    30
}

// --- interaction scheduler ---

pub(super) fn default_check_interval() -> i64 {
    5
}
pub(super) fn default_interaction_probability() -> f64 {
    0.3
}
pub(super) fn default_random_delay_min() -> i64 {
    30
}
pub(super) fn default_random_delay_max() -> i64 {
    180
}
pub(super) fn default_max_groups_per_cycle() -> i64 {
    2
}
pub(super) fn default_rest_between_interactions() -> i64 {
    30
}
pub(super) fn default_call_timeout() -> u64 {
    90
}

// --- moderation ---

pub(super) fn default_warn_message() -> String {
    "Hey, let's keep it friendly in here 🙏".to_string()
}
