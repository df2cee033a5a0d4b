use crate::lexicon::ProblemLexicon;
use crate::types::{Platform, DEFAULT_PLATFORMS};
use crate::ConfigError;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

pub const DEFAULT_OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

pub const DEFAULT_INSIGHT_MODELS: [&str; 4] = [
    "meta-llama/llama-3.2-3b-instruct:free",
    "google/gemini-2.0-flash-001",
    "anthropic/claude-3-haiku",
    "openai/gpt-4o-mini",
];

pub const DEFAULT_X_MIRRORS: [&str; 7] = [
    "https://nitter.privacydev.net",
    "https://nitter.poast.org",
    "https://nitter.cz",
    "https://xcancel.com",
    "https://nitter.net",
    "https://nitter.1d4.us",
    "https://nitter.kavin.rocks",
];

/// Which page driver backs extraction sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverKind {
    /// Plain HTTP fetches of server-rendered markup.
    Http,
    /// Headless Chromium via the DevTools protocol.
    Browser,
}

#[derive(Clone)]
pub struct RadarConfig {
    pub log_level: String,
    pub driver: DriverKind,
    pub headless: bool,
    pub timeout_secs: u64,
    pub max_pages: usize,
    pub max_posts: usize,
    pub inter_request_delay_ms: u64,
    pub max_concurrent_sessions: usize,
    pub max_concurrent_platforms: usize,
    pub user_agent: String,
    pub default_platforms: Vec<Platform>,
    pub lexicon_source: String,
    pub lexicon: ProblemLexicon,
    pub x_mirrors: Vec<String>,
    pub retry_backoff_ms: u64,
    pub openrouter_api_key: Option<String>,
    pub openrouter_base_url: String,
    pub insight_models: Vec<String>,
    pub google_api_key: Option<String>,
    pub google_search_engine_id: Option<String>,
}

impl std::fmt::Debug for RadarConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RadarConfig")
            .field("log_level", &self.log_level)
            .field("driver", &self.driver)
            .field("headless", &self.headless)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_pages", &self.max_pages)
            .field("max_posts", &self.max_posts)
            .field("inter_request_delay_ms", &self.inter_request_delay_ms)
            .field("max_concurrent_sessions", &self.max_concurrent_sessions)
            .field("max_concurrent_platforms", &self.max_concurrent_platforms)
            .field("user_agent", &self.user_agent)
            .field("default_platforms", &self.default_platforms)
            .field("lexicon_source", &self.lexicon_source)
            .field("x_mirrors", &self.x_mirrors)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field(
                "openrouter_api_key",
                &self.openrouter_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("openrouter_base_url", &self.openrouter_base_url)
            .field("insight_models", &self.insight_models)
            .field(
                "google_api_key",
                &self.google_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("google_search_engine_id", &self.google_search_engine_id)
            .finish()
    }
}

impl RadarConfig {
    /// Both Google Custom Search credentials, when configured.
    #[must_use]
    pub fn google_credentials(&self) -> Option<(&str, &str)> {
        match (&self.google_api_key, &self.google_search_engine_id) {
            (Some(key), Some(cx)) => Some((key.as_str(), cx.as_str())),
            _ => None,
        }
    }
}

impl Default for RadarConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            driver: DriverKind::Http,
            headless: true,
            timeout_secs: 30,
            max_pages: 5,
            max_posts: 50,
            inter_request_delay_ms: 1_000,
            max_concurrent_sessions: 3,
            max_concurrent_platforms: 4,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            default_platforms: DEFAULT_PLATFORMS.to_vec(),
            lexicon_source: "en".to_string(),
            lexicon: ProblemLexicon::english(),
            x_mirrors: DEFAULT_X_MIRRORS.iter().map(|s| (*s).to_string()).collect(),
            retry_backoff_ms: 500,
            openrouter_api_key: None,
            openrouter_base_url: DEFAULT_OPENROUTER_URL.to_string(),
            insight_models: DEFAULT_INSIGHT_MODELS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            google_api_key: None,
            google_search_engine_id: None,
        }
    }
}

/// Load configuration from the environment after reading a `.env` file if present.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_config() -> Result<RadarConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_config_from_env()
}

/// Load configuration from variables already in the process environment.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_config_from_env() -> Result<RadarConfig, ConfigError> {
    build_config(|key| std::env::var(key))
}

/// Build configuration from an arbitrary env-var lookup.
///
/// Every variable is optional; absent credentials leave the matching
/// capability disabled rather than failing.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` for unparseable numbers or booleans,
/// `ConfigError::UnknownPlatform` for a bad default platform list, and
/// `ConfigError::Lexicon` when a lexicon file cannot be loaded.
pub fn build_config<F>(lookup: F) -> Result<RadarConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.trim()
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.trim()
            .parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_positive = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let value = parse_usize(var, default)?;
        if value == 0 {
            return Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(value)
    };

    let split_list = |var: &str| -> Option<Vec<String>> {
        optional(var).map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
    };

    let log_level = or_default("PAIN_RADAR_LOG_LEVEL", "info");
    let driver = parse_driver(&or_default("PAIN_RADAR_DRIVER", "http"))?;
    let headless = parse_bool("PAIN_RADAR_HEADLESS", &or_default("PAIN_RADAR_HEADLESS", "true"))?;
    let timeout_secs = parse_u64("PAIN_RADAR_TIMEOUT_SECS", "30")?;
    if timeout_secs == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "PAIN_RADAR_TIMEOUT_SECS".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    let max_pages = parse_usize("PAIN_RADAR_MAX_PAGES", "5")?;
    let max_posts = parse_positive("PAIN_RADAR_MAX_POSTS", "50")?;
    let inter_request_delay_ms = parse_u64("PAIN_RADAR_INTER_REQUEST_DELAY_MS", "1000")?;
    let max_concurrent_sessions = parse_positive("PAIN_RADAR_MAX_CONCURRENT_SESSIONS", "3")?;
    let max_concurrent_platforms = parse_positive("PAIN_RADAR_MAX_CONCURRENT_PLATFORMS", "4")?;
    let user_agent = or_default("PAIN_RADAR_USER_AGENT", DEFAULT_USER_AGENT);
    let retry_backoff_ms = parse_u64("PAIN_RADAR_RETRY_BACKOFF_MS", "500")?;

    let default_platforms = match split_list("PAIN_RADAR_DEFAULT_PLATFORMS") {
        Some(names) => names
            .iter()
            .map(|n| n.parse::<Platform>())
            .collect::<Result<Vec<_>, _>>()?,
        None => DEFAULT_PLATFORMS.to_vec(),
    };

    let lexicon_source = or_default("PAIN_RADAR_LEXICON", "en");
    let lexicon = ProblemLexicon::from_setting(&lexicon_source)?;

    let x_mirrors = split_list("PAIN_RADAR_X_MIRRORS")
        .filter(|list| !list.is_empty())
        .map_or_else(
            || DEFAULT_X_MIRRORS.iter().map(|s| (*s).to_string()).collect(),
            |list| {
                list.into_iter()
                    .map(|m| m.trim_end_matches('/').to_string())
                    .collect()
            },
        );

    let insight_models = split_list("PAIN_RADAR_INSIGHT_MODELS")
        .filter(|list| !list.is_empty())
        .unwrap_or_else(|| {
            DEFAULT_INSIGHT_MODELS
                .iter()
                .map(|s| (*s).to_string())
                .collect()
        });

    Ok(RadarConfig {
        log_level,
        driver,
        headless,
        timeout_secs,
        max_pages,
        max_posts,
        inter_request_delay_ms,
        max_concurrent_sessions,
        max_concurrent_platforms,
        user_agent,
        default_platforms,
        lexicon_source,
        lexicon,
        x_mirrors,
        retry_backoff_ms,
        openrouter_api_key: optional("OPENROUTER_API_KEY"),
        openrouter_base_url: or_default("OPENROUTER_BASE_URL", DEFAULT_OPENROUTER_URL),
        insight_models,
        google_api_key: optional("GOOGLE_API_KEY"),
        google_search_engine_id: optional("GOOGLE_SEARCH_ENGINE_ID"),
    })
}

fn parse_driver(s: &str) -> Result<DriverKind, ConfigError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "http" => Ok(DriverKind::Http),
        "browser" | "chrome" => Ok(DriverKind::Browser),
        other => Err(ConfigError::InvalidEnvVar {
            var: "PAIN_RADAR_DRIVER".to_string(),
            reason: format!("expected 'http' or 'browser', got '{other}'"),
        }),
    }
}

fn parse_bool(var: &str, s: &str) -> Result<bool, ConfigError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: format!("expected a boolean, got '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
