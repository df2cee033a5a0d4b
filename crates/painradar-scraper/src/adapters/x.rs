//! X (Twitter) through Nitter front-ends, rotated by a [`MirrorRouter`].
//!
//! Each adapter instance owns its router, so the rotation pointer is never
//! shared between concurrent searches.

use std::sync::LazyLock;
use std::time::Instant;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use painradar_core::{AcquisitionResult, Platform, Post, Profile};
use regex::Regex;
use scraper::{ElementRef, Html};

use super::{AdapterContext, PlatformAdapter};
use crate::error::AcquireError;
use crate::extract::{
    absolutize, capture, element_text, encode_query, first_attr, first_text, selector, SeenUrls,
};
use crate::mirror::MirrorRouter;
use crate::numbers::parse_abbreviated_number;
use crate::session::Session;

pub const PUBLIC_URL: &str = "https://x.com";
const TWEET_DATE_FORMAT: &str = "%b %d, %Y · %I:%M %p UTC";

static STATUS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"status/(\d+)").expect("valid x status regex"));

/// Markup that must be present for a mirror to count as working.
#[derive(Debug, Clone, Copy)]
enum Expect {
    Timeline,
    ProfileCard,
}

impl Expect {
    fn selector(self) -> &'static str {
        match self {
            Self::Timeline => ".timeline-item, .timeline-none",
            Self::ProfileCard => ".profile-card",
        }
    }
}

/// Checks a mirror response for the failure signature: an error panel or the
/// absence of the expected content.
fn check_page(html: &str, expect: Expect, url: &str) -> Result<(), AcquireError> {
    let doc = Html::parse_document(html);
    if doc.select(&selector(".error-panel, .error")).next().is_some() {
        return Err(AcquireError::ErrorPage {
            url: url.to_string(),
        });
    }
    if doc.select(&selector(expect.selector())).next().is_none() {
        return Err(AcquireError::MissingContent {
            url: url.to_string(),
        });
    }
    Ok(())
}

/// Markup loaded from whichever mirror answered.
struct MirrorPage {
    mirror: String,
    html: String,
}

pub struct XAdapter {
    ctx: AdapterContext,
    router: MirrorRouter,
}

impl XAdapter {
    #[must_use]
    pub fn new(ctx: AdapterContext) -> Self {
        let router = MirrorRouter::new(ctx.x_mirrors.clone()).with_backoff(ctx.mirror_backoff_ms);
        Self { ctx, router }
    }

    #[must_use]
    pub fn router(&self) -> &MirrorRouter {
        &self.router
    }

    async fn load(
        session: &mut Session,
        url: &str,
        expect: Expect,
        scroll: usize,
    ) -> Result<String, AcquireError> {
        session.navigate(url).await?;
        check_page(session.html(), expect, url)?;
        if scroll > 0 {
            if let Err(e) = session.wait_and_scroll(scroll).await {
                tracing::debug!(url, error = %e, "scrolling stopped early");
            }
        }
        Ok(session.html().to_string())
    }

    /// One attempt against one mirror; the session is closed on every path.
    async fn attempt(
        &self,
        mirror: String,
        path: &str,
        expect: Expect,
        scroll: usize,
    ) -> Result<MirrorPage, AcquireError> {
        let url = format!("{mirror}{path}");
        let mut session = self.ctx.pool.open_with(self.ctx.session_config()).await?;
        let loaded = Self::load(&mut session, &url, expect, scroll).await;
        session.close().await;
        loaded.map(|html| MirrorPage { mirror, html })
    }

    async fn timeline(&self, operation: &str, path: &str) -> AcquisitionResult {
        let started = Instant::now();
        let scroll = self.ctx.session_config().max_pages.min(3);
        let routed = self
            .router
            .route(|mirror| self.attempt(mirror, path, Expect::Timeline, scroll))
            .await;

        let mut result = AcquisitionResult::new(Platform::X);
        result.errors = routed
            .errors
            .into_iter()
            .map(|e| format!("{operation}: {e}"))
            .collect();
        match routed.value {
            Some(page) => {
                let mut posts = parse_timeline(&page.html);
                posts.truncate(self.ctx.max_posts());
                tracing::info!(mirror = %page.mirror, operation, posts = posts.len(), "timeline collected");
                result.posts = posts;
            }
            None => {
                tracing::warn!(operation, "all X mirrors failed");
            }
        }
        result.finish(started)
    }
}

#[async_trait]
impl PlatformAdapter for XAdapter {
    fn platform(&self) -> Platform {
        Platform::X
    }

    async fn fetch_trending(&self) -> AcquisitionResult {
        AcquisitionResult::failed(
            Platform::X,
            "X has no public trending feed on its mirrors; use search instead",
        )
    }

    async fn fetch_by_search(&self, query: &str) -> AcquisitionResult {
        let path = format!("/search?f=tweets&q={}", encode_query(query));
        self.timeline(&format!("search '{query}'"), &path).await
    }

    async fn fetch_profile(&self, handle: &str) -> Option<Profile> {
        let handle = handle.trim_start_matches('@');
        let path = format!("/{handle}");
        let routed = self
            .router
            .route(|mirror| self.attempt(mirror, &path, Expect::ProfileCard, 0))
            .await;
        match routed.value {
            Some(page) => parse_profile(&page.html, handle, &page.mirror),
            None => {
                tracing::warn!(handle, errors = ?routed.errors, "X profile unavailable on every mirror");
                None
            }
        }
    }

    async fn fetch_user_posts(&self, handle: &str) -> AcquisitionResult {
        let handle = handle.trim_start_matches('@');
        self.timeline(&format!("posts of '@{handle}'"), &format!("/{handle}"))
            .await
    }
}

fn stat_kind(stat: &ElementRef<'_>) -> Option<&'static str> {
    let markup = stat.inner_html();
    if markup.contains("heart") || markup.contains("like") {
        Some("likes")
    } else if markup.contains("retweet") || markup.contains("repeat") {
        Some("reposts")
    } else if markup.contains("comment") || markup.contains("reply") {
        Some("comments")
    } else if markup.contains("views") {
        Some("views")
    } else {
        None
    }
}

/// Parses the tweets of a Nitter timeline (search results or a user page).
///
/// Tweets without a status link are dropped since they have no stable id.
/// A status repeated on the page (quotes, pinned tweets) is kept once.
#[must_use]
pub fn parse_timeline(html: &str) -> Vec<Post> {
    let doc = Html::parse_document(html);
    let item_sel = selector(".timeline-item");
    let content_sel = selector(".tweet-content");
    let username_sel = selector(".username");
    let fullname_sel = selector(".fullname");
    let link_sel = selector(r#"a.tweet-link, a[href*="/status/"]"#);
    let stat_sel = selector(".tweet-stat");
    let date_sel = selector(".tweet-date a");

    let mut seen = SeenUrls::new();
    let mut posts = Vec::new();
    for item in doc.select(&item_sel) {
        let Some(content) = first_text(&item, &content_sel) else {
            continue;
        };
        let Some(id) = first_attr(&item, &link_sel, "href").and_then(|h| capture(&h, &STATUS_RE))
        else {
            continue;
        };
        let author = first_text(&item, &username_sel)
            .map(|u| u.trim_start_matches('@').to_string())
            .unwrap_or_default();

        let url = format!("{PUBLIC_URL}/{author}/status/{id}");
        if !seen.admit(&url) {
            continue;
        }
        let mut post = Post::new(Platform::X, id, url);
        post.content = content;
        post.author_display_name = first_text(&item, &fullname_sel);
        post.author_handle = author;
        for stat in item.select(&stat_sel) {
            let value = parse_abbreviated_number(&element_text(&stat));
            match stat_kind(&stat) {
                Some("likes") => post.likes = value,
                Some("reposts") => post.reposts = value,
                Some("comments") => post.comments = value,
                Some("views") => post.views = value,
                _ => {}
            }
        }
        post.published_at = first_attr(&item, &date_sel, "title")
            .and_then(|d| NaiveDateTime::parse_from_str(&d, TWEET_DATE_FORMAT).ok())
            .map(|d| d.and_utc());
        posts.push(post);
    }
    posts
}

/// Parses a Nitter profile card. Avatar links are resolved against the mirror.
#[must_use]
pub fn parse_profile(html: &str, handle: &str, mirror: &str) -> Option<Profile> {
    let doc = Html::parse_document(html);
    let root = doc.root_element();
    let card_sel = selector(".profile-card");
    let name_sel = selector(".profile-card-fullname");
    let bio_sel = selector(".profile-bio");
    let stat_sel = selector(".profile-statlist li");
    let header_sel = selector(".profile-stat-header");
    let num_sel = selector(".profile-stat-num");
    let avatar_sel = selector(".profile-card-avatar img");
    let verified_sel = selector(".verified-icon, .icon-verified");

    let card = root.select(&card_sel).next()?;
    let mut profile = Profile::new(Platform::X, handle, format!("{PUBLIC_URL}/{handle}"));
    if let Some(name) = first_text(&card, &name_sel) {
        profile.display_name = name;
    }
    profile.bio = first_text(&root, &bio_sel);
    for stat in root.select(&stat_sel) {
        let header = first_text(&stat, &header_sel).unwrap_or_default().to_lowercase();
        let value = first_text(&stat, &num_sel).and_then(|n| parse_abbreviated_number(&n));
        if header.contains("followers") {
            profile.follower_count = value;
        } else if header.contains("following") {
            profile.following_count = value;
        } else if header.contains("tweet") || header.contains("post") {
            profile.post_count = value;
        }
    }
    profile.avatar_url = first_attr(&card, &avatar_sel, "src").and_then(|s| absolutize(mirror, &s));
    profile.verified = Some(card.select(&verified_sel).next().is_some());
    Some(profile)
}
