use super::*;
use std::collections::HashMap;

#[test]
fn test_defaults_match_documented_policy() {
    let cfg = Config::default();
    assert_eq!(cfg.activity.silence_threshold_minutes, 30);
    assert_eq!(cfg.activity.min_messages_24h, 10);
    assert_eq!(cfg.activity.max_interactions_per_day, 3);
    assert_eq!(cfg.activity.min_active_users, 2);
    assert_eq!(cfg.activity.sleep_hours, vec![0, 1, 2, 3, 4, 5]);
    assert_eq!(cfg.activity.bot_cooldown_minutes, 15);
    assert_eq!(cfg.activity.cleanup_interval_minutes, 60);
    assert_eq!(cfg.interaction.check_interval_minutes, 5);
    assert!((cfg.interaction.interaction_probability - 0.3).abs() < f64::EPSILON);
    assert_eq!(cfg.interaction.random_delay_min, 30);
    assert_eq!(cfg.interaction.random_delay_max, 180);
    assert_eq!(cfg.interaction.max_groups_per_cycle, 2);
    assert!(cfg.interaction.enabled);
    assert_eq!(cfg.provider.default, "gemini");
}

#[test]
fn test_sleep_hour_lookup() {
    let activity = ActivityConfig::default();
    assert!(activity.is_sleep_hour(0));
    assert!(activity.is_sleep_hour(5));
    assert!(!activity.is_sleep_hour(6));
    assert!(!activity.is_sleep_hour(23));
}

#[test]
fn test_partial_toml_fills_defaults() {
    let toml_str = r#"
        [yuki]
        name = "Snow"

        [activity]
        silence_threshold_minutes = 45
        sleep_hours = [1, 2]

        [interaction]
        interaction_probability = 0.9
    "#;
    let cfg: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(cfg.yuki.name, "Snow");
    assert_eq!(cfg.yuki.log_level, "info");
    assert_eq!(cfg.activity.silence_threshold_minutes, 45);
    assert_eq!(cfg.activity.sleep_hours, vec![1, 2]);
    assert_eq!(cfg.activity.min_messages_24h, 10);
    assert!((cfg.interaction.interaction_probability - 0.9).abs() < f64::EPSILON);
    assert_eq!(cfg.interaction.check_interval_minutes, 5);
}

#[test]
fn test_telegram_section() {
    let toml_str = r#"
        [channel.telegram]
        enabled = true
        bot_token = "123:abc"
        admin_users = [42]
    "#;
    let cfg: Config = toml::from_str(toml_str).unwrap();
    let tg = cfg.channel.telegram.unwrap();
    assert!(tg.enabled);
    assert_eq!(tg.bot_token, "123:abc");
    assert!(tg.is_admin(42));
    assert!(!tg.is_admin(7));
}

#[test]
fn test_negative_interval_is_accepted_verbatim() {
    let cfg: InteractionConfig = toml::from_str("check_interval_minutes = -5").unwrap();
    assert_eq!(cfg.check_interval_minutes, -5);
}

#[test]
fn test_env_overrides_fill_secrets() {
    let env: HashMap<&str, &str> = [
        ("YUKI_TELEGRAM_TOKEN", "999:zzz"),
        ("GEMINI_API_KEY", "AIza-env"),
        ("OPENAI_API_KEY", "   "),
    ]
    .into_iter()
    .collect();

    let mut cfg = Config::default();
    apply_env_overrides(&mut cfg, |k| env.get(k).map(|v| v.to_string()));

    let tg = cfg.channel.telegram.unwrap();
    assert!(tg.enabled);
    assert_eq!(tg.bot_token, "999:zzz");
    assert_eq!(cfg.provider.gemini.unwrap().api_key, "AIza-env");
    assert!(cfg.provider.openai.is_none(), "blank env values are ignored");
}

#[test]
fn test_load_missing_file_uses_defaults() {
    let cfg = load("/nonexistent/__yuki_config__.toml").unwrap();
    assert_eq!(cfg.yuki.name, "Yuki");
}

#[test]
fn test_load_rejects_malformed_toml() {
    let tmp = std::env::temp_dir().join(format!("__yuki_bad_config_{}.toml", std::process::id()));
    std::fs::write(&tmp, "[activity\nbroken").unwrap();
    let err = load(tmp.to_str().unwrap()).unwrap_err();
    assert!(err.to_string().contains("failed to parse config"));
    let _ = std::fs::remove_file(&tmp);
}

#[test]
fn test_shellexpand_home() {
    if let Some(home) = std::env::var_os("HOME") {
        let expanded = shellexpand("~/.yuki/data");
        assert_eq!(expanded, format!("{}/.yuki/data", home.to_string_lossy()));
    }
    assert_eq!(shellexpand("/abs/path"), "/abs/path");
}
