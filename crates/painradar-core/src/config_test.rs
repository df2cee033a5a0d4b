use std::collections::HashMap;
use std::env::VarError;

use super::*;

fn lookup_from_map<'a>(
    map: &'a HashMap<&'a str, &'a str>,
) -> impl Fn(&str) -> Result<String, VarError> + 'a {
    move |key| {
        map.get(key)
            .map(|v| (*v).to_string())
            .ok_or(VarError::NotPresent)
    }
}

#[test]
fn empty_environment_yields_defaults() {
    let map: HashMap<&str, &str> = HashMap::new();
    let cfg = build_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.driver, DriverKind::Http);
    assert!(cfg.headless);
    assert_eq!(cfg.timeout_secs, 30);
    assert_eq!(cfg.max_pages, 5);
    assert_eq!(cfg.max_posts, 50);
    assert_eq!(cfg.inter_request_delay_ms, 1_000);
    assert_eq!(cfg.max_concurrent_sessions, 3);
    assert_eq!(cfg.default_platforms, DEFAULT_PLATFORMS.to_vec());
    assert_eq!(cfg.lexicon, ProblemLexicon::english());
    assert_eq!(cfg.x_mirrors.len(), DEFAULT_X_MIRRORS.len());
    assert_eq!(cfg.insight_models[0], DEFAULT_INSIGHT_MODELS[0]);
    assert!(cfg.openrouter_api_key.is_none());
    assert!(cfg.google_credentials().is_none());
}

#[test]
fn default_impl_matches_empty_environment() {
    let map: HashMap<&str, &str> = HashMap::new();
    let built = build_config(lookup_from_map(&map)).unwrap();
    let default = RadarConfig::default();
    assert_eq!(format!("{built:?}"), format!("{default:?}"));
}

#[test]
fn invalid_timeout_is_rejected() {
    let mut map = HashMap::new();
    map.insert("PAIN_RADAR_TIMEOUT_SECS", "soon");
    let result = build_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "PAIN_RADAR_TIMEOUT_SECS"),
        "expected InvalidEnvVar(PAIN_RADAR_TIMEOUT_SECS), got: {result:?}"
    );
}

#[test]
fn zero_timeout_is_rejected() {
    let mut map = HashMap::new();
    map.insert("PAIN_RADAR_TIMEOUT_SECS", "0");
    let result = build_config(lookup_from_map(&map));
    assert!(matches!(
        result,
        Err(ConfigError::InvalidEnvVar { ref var, ref reason })
            if var == "PAIN_RADAR_TIMEOUT_SECS" && reason == "must be at least 1"
    ));

    map.insert("PAIN_RADAR_TIMEOUT_SECS", "1");
    assert_eq!(build_config(lookup_from_map(&map)).unwrap().timeout_secs, 1);
}

#[test]
fn zero_concurrency_is_rejected() {
    let mut map = HashMap::new();
    map.insert("PAIN_RADAR_MAX_CONCURRENT_SESSIONS", "0");
    let result = build_config(lookup_from_map(&map));
    assert!(matches!(
        result,
        Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "PAIN_RADAR_MAX_CONCURRENT_SESSIONS"
    ));
}

#[test]
fn unknown_driver_is_rejected() {
    let mut map = HashMap::new();
    map.insert("PAIN_RADAR_DRIVER", "selenium");
    assert!(matches!(
        build_config(lookup_from_map(&map)),
        Err(ConfigError::InvalidEnvVar { .. })
    ));
}

#[test]
fn headless_accepts_common_boolean_spellings() {
    let mut map = HashMap::new();
    map.insert("PAIN_RADAR_HEADLESS", "off");
    let cfg = build_config(lookup_from_map(&map)).unwrap();
    assert!(!cfg.headless);
}

#[test]
fn default_platforms_are_configurable() {
    let mut map = HashMap::new();
    map.insert("PAIN_RADAR_DEFAULT_PLATFORMS", "habr, twitter,telegram");
    let cfg = build_config(lookup_from_map(&map)).unwrap();
    assert_eq!(
        cfg.default_platforms,
        vec![Platform::Habr, Platform::X, Platform::Telegram]
    );
}

#[test]
fn unknown_default_platform_fails_fast() {
    let mut map = HashMap::new();
    map.insert("PAIN_RADAR_DEFAULT_PLATFORMS", "habr,friendster");
    let result = build_config(lookup_from_map(&map));
    assert!(matches!(result, Err(ConfigError::UnknownPlatform(ref p)) if p == "friendster"));
}

#[test]
fn russian_lexicon_can_be_selected() {
    let mut map = HashMap::new();
    map.insert("PAIN_RADAR_LEXICON", "ru");
    let cfg = build_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.lexicon, ProblemLexicon::russian());
}

#[test]
fn mirror_list_override_trims_trailing_slashes() {
    let mut map = HashMap::new();
    map.insert("PAIN_RADAR_X_MIRRORS", "https://a.example/, https://b.example");
    let cfg = build_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.x_mirrors, vec!["https://a.example", "https://b.example"]);
}

#[test]
fn google_credentials_need_both_values() {
    let mut map = HashMap::new();
    map.insert("GOOGLE_API_KEY", "key");
    let cfg = build_config(lookup_from_map(&map)).unwrap();
    assert!(cfg.google_credentials().is_none());

    map.insert("GOOGLE_SEARCH_ENGINE_ID", "cx");
    let cfg = build_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.google_credentials(), Some(("key", "cx")));
}

#[test]
fn blank_api_key_counts_as_absent() {
    let mut map = HashMap::new();
    map.insert("OPENROUTER_API_KEY", "   ");
    let cfg = build_config(lookup_from_map(&map)).unwrap();
    assert!(cfg.openrouter_api_key.is_none());
}

#[test]
fn debug_output_redacts_secrets() {
    let mut map = HashMap::new();
    map.insert("OPENROUTER_API_KEY", "sk-or-secret");
    map.insert("GOOGLE_API_KEY", "google-secret");
    let cfg = build_config(lookup_from_map(&map)).unwrap();
    let debug = format!("{cfg:?}");
    assert!(!debug.contains("sk-or-secret"));
    assert!(!debug.contains("google-secret"));
    assert!(debug.contains("[redacted]"));
}
