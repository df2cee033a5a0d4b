//! Per-source adapters behind one capability trait.
//!
//! Every adapter method is a failure boundary: errors become strings in the
//! returned [`AcquisitionResult`], partial data is kept, and the session is
//! always closed before returning.

pub mod habr;
pub mod mailru;
pub mod pikabu;
pub mod telegram;
pub mod tenchat;
pub mod threads;
pub mod vc;
pub mod web;
pub mod x;
pub mod zen;

use std::time::Instant;

use async_trait::async_trait;
use painradar_core::config::DEFAULT_X_MIRRORS;
use painradar_core::{AcquisitionResult, Platform, Post, Profile, RadarConfig};

use crate::error::AcquireError;
use crate::session::{SessionConfig, SessionPool};
use crate::web_search::{SearchHit, SiteSearch};

pub use habr::HabrAdapter;
pub use mailru::MailRuAdapter;
pub use pikabu::PikabuAdapter;
pub use telegram::TelegramAdapter;
pub use tenchat::TenChatAdapter;
pub use threads::ThreadsAdapter;
pub use vc::VcAdapter;
pub use web::WebAdapter;
pub use x::XAdapter;
pub use zen::ZenAdapter;

#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    fn platform(&self) -> Platform;

    /// The source's default popular feed.
    async fn fetch_trending(&self) -> AcquisitionResult;

    /// Keyword search, natively or through the `site:` web-search fallback.
    async fn fetch_by_search(&self, query: &str) -> AcquisitionResult;

    /// `None` when the profile does not exist or cannot be reached.
    async fn fetch_profile(&self, handle: &str) -> Option<Profile>;

    async fn fetch_by_category(&self, _category: &str) -> AcquisitionResult {
        AcquisitionResult::unsupported(self.platform(), "category listing")
    }

    async fn fetch_by_channel(&self, _channel: &str) -> AcquisitionResult {
        AcquisitionResult::unsupported(self.platform(), "channel listing")
    }

    async fn fetch_user_posts(&self, _handle: &str) -> AcquisitionResult {
        AcquisitionResult::unsupported(self.platform(), "user post listing")
    }
}

/// Shared resources handed to every adapter constructor.
#[derive(Clone)]
pub struct AdapterContext {
    pub pool: SessionPool,
    pub search: SiteSearch,
    pub x_mirrors: Vec<String>,
    pub mirror_backoff_ms: u64,
}

impl AdapterContext {
    #[must_use]
    pub fn new(pool: SessionPool, search: SiteSearch) -> Self {
        Self {
            pool,
            search,
            x_mirrors: DEFAULT_X_MIRRORS.iter().map(|s| (*s).to_string()).collect(),
            mirror_backoff_ms: 0,
        }
    }

    /// # Errors
    ///
    /// Returns an error if the session pool or search client cannot be built.
    pub fn from_config(cfg: &RadarConfig) -> Result<Self, AcquireError> {
        let pool = SessionPool::from_config(cfg)?;
        let search = SiteSearch::from_config(cfg, pool.clone())?;
        Ok(Self {
            pool,
            search,
            x_mirrors: cfg.x_mirrors.clone(),
            mirror_backoff_ms: cfg.retry_backoff_ms,
        })
    }

    /// Base sleep between X mirror attempts; zero retries immediately.
    #[must_use]
    pub fn with_mirror_backoff_ms(mut self, backoff_ms: u64) -> Self {
        self.mirror_backoff_ms = backoff_ms;
        self
    }

    #[must_use]
    pub fn with_x_mirrors(mut self, mirrors: Vec<String>) -> Self {
        self.x_mirrors = mirrors;
        self
    }

    pub(crate) fn session_config(&self) -> SessionConfig {
        self.pool.config().clone()
    }

    pub(crate) fn max_posts(&self) -> usize {
        self.pool.config().max_posts
    }
}

/// One listing page to load, with fallback URLs tried in order until one
/// yields posts.
pub(crate) struct Listing<'a> {
    pub platform: Platform,
    pub operation: &'a str,
    pub urls: Vec<String>,
    pub config: SessionConfig,
}

/// Opens a session, loads the listing, scrolls, parses and always closes.
pub(crate) async fn run_listing<P>(pool: &SessionPool, listing: Listing<'_>, parse: P) -> AcquisitionResult
where
    P: Fn(&str, &str) -> Vec<Post> + Send + Sync,
{
    let started = Instant::now();
    let Listing {
        platform,
        operation,
        urls,
        config,
    } = listing;
    let mut result = AcquisitionResult::new(platform);
    let max_posts = config.max_posts;
    let max_pages = config.max_pages;

    let mut session = match pool.open_with(config).await {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!(platform = %platform, operation, error = %e, "could not open session");
            result.push_error(format!("{operation}: could not open session: {e}"));
            return result.finish(started);
        }
    };

    let mut posts = Vec::new();
    for url in &urls {
        if let Err(e) = session.navigate(url).await {
            tracing::warn!(platform = %platform, url = %url, error = %e, "navigation failed");
            result.errors.push(format!("{operation}: {url}: {e}"));
            continue;
        }
        if let Err(e) = session.wait_and_scroll(max_pages).await {
            result.errors.push(format!("{operation}: scrolling {url}: {e}"));
        }
        posts = parse(session.html(), url);
        if !posts.is_empty() {
            break;
        }
        tracing::debug!(platform = %platform, url = %url, "no items found on page");
    }
    session.close().await;

    posts.truncate(max_posts);
    tracing::info!(platform = %platform, operation, posts = posts.len(), "listing collected");
    result.posts = posts;
    result.finish(started)
}

/// Loads a profile page and parses it; any failure is logged and yields `None`.
pub(crate) async fn run_profile<P>(
    pool: &SessionPool,
    platform: Platform,
    config: SessionConfig,
    url: &str,
    parse: P,
) -> Option<Profile>
where
    P: Fn(&str, &str) -> Option<Profile> + Send + Sync,
{
    let mut session = match pool.open_with(config).await {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!(platform = %platform, error = %e, "could not open session for profile");
            return None;
        }
    };
    let profile = match session.navigate(url).await {
        Ok(_) => parse(session.html(), url),
        Err(AcquireError::NotFound { .. }) => None,
        Err(e) => {
            tracing::warn!(platform = %platform, url, error = %e, "profile fetch failed");
            None
        }
    };
    session.close().await;
    profile
}

/// Keyword search through the general web-search `site:` operator, shaped
/// exactly like a native search result.
pub(crate) async fn search_via_web<F>(
    search: &SiteSearch,
    platform: Platform,
    domain: &str,
    query: &str,
    max_posts: usize,
    to_post: F,
) -> AcquisitionResult
where
    F: Fn(&SearchHit) -> Option<Post> + Send + Sync,
{
    let started = Instant::now();
    let mut result = AcquisitionResult::new(platform);
    match search.search_site(query, domain).await {
        Ok(hits) => {
            result.posts = hits.iter().filter_map(&to_post).take(max_posts).collect();
        }
        Err(e) => {
            tracing::warn!(platform = %platform, error = %e, "web search fallback failed");
            result.push_error(format!("search '{query}': {e}"));
        }
    }
    result.finish(started)
}

/// Builds a post from a search hit, using the snippet as content.
pub(crate) fn post_from_hit(platform: Platform, hit: &SearchHit, id: String, author: String) -> Post {
    let mut post = Post::new(platform, id, hit.url.clone());
    post.title = (!hit.title.is_empty()).then(|| hit.title.clone());
    post.content = if hit.snippet.is_empty() {
        hit.title.clone()
    } else {
        hit.snippet.clone()
    };
    post.author_handle = author;
    post
}
