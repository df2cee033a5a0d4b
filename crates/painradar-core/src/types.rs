use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// A content source the engine knows how to acquire from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Habr,
    Pikabu,
    Vc,
    Zen,
    Telegram,
    MailRu,
    TenChat,
    Threads,
    X,
    Web,
}

/// Platforms that `all` expands to when no override is configured.
///
/// Threads, Telegram and Web are left out: the first two have no public
/// trending feed and the last needs paid search credentials.
pub const DEFAULT_PLATFORMS: [Platform; 7] = [
    Platform::Habr,
    Platform::Pikabu,
    Platform::Vc,
    Platform::Zen,
    Platform::X,
    Platform::TenChat,
    Platform::MailRu,
];

impl Platform {
    pub const ALL: [Platform; 10] = [
        Platform::Habr,
        Platform::Pikabu,
        Platform::Vc,
        Platform::Zen,
        Platform::Telegram,
        Platform::MailRu,
        Platform::TenChat,
        Platform::Threads,
        Platform::X,
        Platform::Web,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Habr => "habr",
            Platform::Pikabu => "pikabu",
            Platform::Vc => "vc",
            Platform::Zen => "zen",
            Platform::Telegram => "telegram",
            Platform::MailRu => "mailru",
            Platform::TenChat => "tenchat",
            Platform::Threads => "threads",
            Platform::X => "x",
            Platform::Web => "web",
        }
    }

    /// Human-readable source name used in reports.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Platform::Habr => "Habr",
            Platform::Pikabu => "Pikabu",
            Platform::Vc => "VC.ru",
            Platform::Zen => "Dzen",
            Platform::Telegram => "Telegram",
            Platform::MailRu => "Otvet Mail.ru",
            Platform::TenChat => "TenChat",
            Platform::Threads => "Threads",
            Platform::X => "X",
            Platform::Web => "Web",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "habr" => Ok(Platform::Habr),
            "pikabu" => Ok(Platform::Pikabu),
            "vc" => Ok(Platform::Vc),
            "zen" | "dzen" => Ok(Platform::Zen),
            "telegram" | "tg" => Ok(Platform::Telegram),
            "mailru" | "otvet" => Ok(Platform::MailRu),
            "tenchat" => Ok(Platform::TenChat),
            "threads" => Ok(Platform::Threads),
            "x" | "twitter" => Ok(Platform::X),
            "web" => Ok(Platform::Web),
            other => Err(ConfigError::UnknownPlatform(other.to_string())),
        }
    }
}

/// A platform selector as written by a caller: either one platform or `all`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    All,
    One(Platform),
}

impl FromStr for Target {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(Target::All)
        } else {
            s.parse().map(Target::One)
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::All => f.write_str("all"),
            Target::One(p) => p.fmt(f),
        }
    }
}

impl From<Platform> for Target {
    fn from(platform: Platform) -> Self {
        Target::One(platform)
    }
}

/// Expands `all` into `defaults` and drops repeated platforms, keeping first-seen order.
#[must_use]
pub fn expand_targets(targets: &[Target], defaults: &[Platform]) -> Vec<Platform> {
    let mut out: Vec<Platform> = Vec::new();
    for target in targets {
        let batch: &[Platform] = match target {
            Target::All => defaults,
            Target::One(p) => std::slice::from_ref(p),
        };
        for p in batch {
            if !out.contains(p) {
                out.push(*p);
            }
        }
    }
    out
}

/// A normalized content item from any source.
///
/// Metric fields are `None` when the source does not expose them; that is
/// distinct from an observed zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub platform: Platform,
    pub platform_id: String,
    pub url: String,
    pub title: Option<String>,
    pub content: String,
    pub author_handle: String,
    pub author_display_name: Option<String>,
    pub likes: Option<u64>,
    pub comments: Option<u64>,
    pub views: Option<u64>,
    pub reposts: Option<u64>,
    pub published_at: Option<DateTime<Utc>>,
    pub collected_at: DateTime<Utc>,
    /// Hub, tag, channel or section label.
    pub category: Option<String>,
}

impl Post {
    /// A post with identity fields set, empty content and no metrics.
    #[must_use]
    pub fn new(platform: Platform, platform_id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            platform,
            platform_id: platform_id.into(),
            url: url.into(),
            title: None,
            content: String::new(),
            author_handle: String::new(),
            author_display_name: None,
            likes: None,
            comments: None,
            views: None,
            reposts: None,
            published_at: None,
            collected_at: Utc::now(),
            category: None,
        }
    }

    /// Title and content joined, as used by text scoring.
    #[must_use]
    pub fn text(&self) -> String {
        match &self.title {
            Some(title) => format!("{title} {}", self.content),
            None => self.content.clone(),
        }
    }
}

/// Author or channel summary. Built per request and never cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub platform: Platform,
    pub handle: String,
    pub display_name: String,
    pub bio: Option<String>,
    pub follower_count: Option<u64>,
    pub following_count: Option<u64>,
    pub post_count: Option<u64>,
    pub profile_url: String,
    pub avatar_url: Option<String>,
    pub verified: Option<bool>,
}

impl Profile {
    #[must_use]
    pub fn new(platform: Platform, handle: impl Into<String>, profile_url: impl Into<String>) -> Self {
        let handle = handle.into();
        Self {
            platform,
            display_name: handle.clone(),
            handle,
            bio: None,
            follower_count: None,
            following_count: None,
            post_count: None,
            profile_url: profile_url.into(),
            avatar_url: None,
            verified: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquisitionStats {
    pub posts_found: usize,
    pub profiles_found: usize,
    pub duration_ms: u64,
}

/// Outcome of one acquisition call against one platform.
///
/// Failures are carried in `errors`; nothing here is ever raised to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionResult {
    pub platform: Platform,
    pub success: bool,
    pub posts: Vec<Post>,
    pub profiles: Vec<Profile>,
    pub errors: Vec<String>,
    pub stats: AcquisitionStats,
}

impl AcquisitionResult {
    #[must_use]
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            success: true,
            posts: Vec::new(),
            profiles: Vec::new(),
            errors: Vec::new(),
            stats: AcquisitionStats::default(),
        }
    }

    /// A result with no data and a single error message.
    #[must_use]
    pub fn failed(platform: Platform, message: impl Into<String>) -> Self {
        let mut result = Self::new(platform);
        result.errors.push(message.into());
        result.refresh();
        result
    }

    /// A failed result for an operation the source does not offer.
    #[must_use]
    pub fn unsupported(platform: Platform, operation: &str) -> Self {
        Self::failed(
            platform,
            format!("{operation} is not supported by {}", platform.label()),
        )
    }

    pub fn push_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
        self.refresh();
    }

    /// Recomputes `success` and the found-counters from the current contents.
    pub fn refresh(&mut self) {
        self.stats.posts_found = self.posts.len();
        self.stats.profiles_found = self.profiles.len();
        self.success =
            !self.posts.is_empty() || !self.profiles.is_empty() || self.errors.is_empty();
    }

    /// Stamps the duration measured from `started` and refreshes counters.
    #[must_use]
    pub fn finish(mut self, started: Instant) -> Self {
        self.stats.duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.refresh();
        self
    }
}
