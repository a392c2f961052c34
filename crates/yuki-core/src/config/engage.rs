use super::defaults::*;
use serde::{Deserialize, Serialize};

/// Activity monitor thresholds: when is a group "quiet"?
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityConfig {
    /// Minutes without messages before a chat counts as silent.
    #[serde(default = "default_silence_threshold")]
    pub silence_threshold_minutes: i64,
    /// Human messages required in the last 24 hours.
    #[serde(default = "default_min_messages_24h")]
    pub min_messages_24h: usize,
    /// Proactive messages allowed per chat per day.
    #[serde(default = "default_max_interactions_per_day")]
    pub max_interactions_per_day: u32,
    /// Distinct users required in the last 24 hours.
    #[serde(default = "default_min_active_users")]
    pub min_active_users: usize,
    /// Local hours (0-23) during which the bot never speaks first.
    #[serde(default = "default_sleep_hours")]
    pub sleep_hours: Vec<u32>,
    /// Minutes the bot stays silent after its own last message.
    #[serde(default = "default_bot_cooldown")]
    pub bot_cooldown_minutes: i64,
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_minutes: i64,
    /// When more than `max_users_1h` users are tracked for the hour window,
    /// cleanup keeps the `keep_users_1h` most recent.
    #[serde(default = "default_max_users_1h")]
    pub max_users_1h: usize,
    #[serde(default = "default_keep_users_1h")]
    pub keep_users_1h: usize,
    #[serde(default = "default_max_users_24h")]
    pub max_users_24h: usize,
    #[serde(default = "default_keep_users_24h")]
    pub keep_users_24h: usize,
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            silence_threshold_minutes: default_silence_threshold(),
            min_messages_24h: default_min_messages_24h(),
            max_interactions_per_day: default_max_interactions_per_day(),
            min_active_users: default_min_active_users(),
            sleep_hours: default_sleep_hours(),
            bot_cooldown_minutes: default_bot_cooldown(),
            cleanup_interval_minutes: default_cleanup_interval(),
            max_users_1h: default_max_users_1h(),
            keep_users_1h: default_keep_users_1h(),
            max_users_24h: default_max_users_24h(),
            keep_users_24h: default_keep_users_24h(),
        }
    }
}

impl ActivityConfig {
    /// Whether `hour` (0-23) is a configured sleep hour.
    pub fn is_sleep_hour(&self, hour: u32) -> bool {
        self.sleep_hours.contains(&hour)
    }
}

/// Auto-interaction scheduler settings.
///
/// Values are taken as given; nothing here is range-checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionConfig {
    /// Gate on starting the scheduler.
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_check_interval")]
    pub check_interval_minutes: i64,
    /// Chance (0.0-1.0) that a selected quiet chat gets a message.
    #[serde(default = "default_interaction_probability")]
    pub interaction_probability: f64,
    /// Pre-send delay bounds, in seconds.
    #[serde(default = "default_random_delay_min")]
    pub random_delay_min: i64,
    #[serde(default = "default_random_delay_max")]
    pub random_delay_max: i64,
    #[serde(default = "default_max_groups_per_cycle")]
    pub max_groups_per_cycle: i64,
    /// Minutes between two proactive messages, across all chats.
    #[serde(default = "default_rest_between_interactions")]
    pub rest_between_interactions: i64,
    /// Upper bound on a single composer or dispatcher call.
    #[serde(default = "default_call_timeout")]
    pub call_timeout_secs: u64,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            check_interval_minutes: default_check_interval(),
            interaction_probability: default_interaction_probability(),
            random_delay_min: default_random_delay_min(),
            random_delay_max: default_random_delay_max(),
            max_groups_per_cycle: default_max_groups_per_cycle(),
            rest_between_interactions: default_rest_between_interactions(),
            call_timeout_secs: default_call_timeout(),
        }
    }
}

/// Moderation config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Extra banned words on top of the built-in list.
    #[serde(default)]
    pub extra_words: Vec<String>,
    /// Also ask the provider to classify text that passed the word list.
    #[serde(default)]
    pub ai_classification: bool,
    /// Posted after a message is removed.
    #[serde(default = "default_warn_message")]
    pub warn_message: String,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            extra_words: Vec::new(),
            ai_classification: false,
            warn_message: default_warn_message(),
        }
    }
}
