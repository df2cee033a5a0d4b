//! Threads: public profiles only. The feed needs a login, so trending always
//! fails and search goes through the web-search fallback.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use painradar_core::{AcquisitionResult, Platform, Post, Profile};
use regex::Regex;
use scraper::Html;

use super::{
    post_from_hit, run_listing, run_profile, search_via_web, AdapterContext, Listing,
    PlatformAdapter,
};
use crate::extract::{
    absolutize, capture, element_text, first_attr, first_metric, first_text, normalize_url,
    selector, SeenUrls,
};
use crate::session::SessionConfig;
use crate::web_search::SearchHit;

pub const BASE_URL: &str = "https://www.threads.net";
const DOMAIN: &str = "threads.net";
const MIN_DELAY: Duration = Duration::from_secs(2);
const NOT_AVAILABLE: &str = "Sorry, this page isn't available";

static POST_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/post/([^/?#]+)").expect("valid threads post regex"));
static USER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"threads\.net/@([^/?#]+)").expect("valid threads user regex"));
static FOLLOWERS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([\d,.]+\s*[KMК]?)\s*followers").expect("valid threads followers regex")
});
static LIKES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)([\d,.]+[KM]?)\s*like").expect("valid threads likes regex"));

pub struct ThreadsAdapter {
    ctx: AdapterContext,
    base_url: String,
}

impl ThreadsAdapter {
    #[must_use]
    pub fn new(ctx: AdapterContext) -> Self {
        Self::with_base_url(ctx, BASE_URL)
    }

    #[must_use]
    pub fn with_base_url(ctx: AdapterContext, base_url: &str) -> Self {
        Self {
            ctx,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn session_config(&self) -> SessionConfig {
        self.ctx.session_config().with_min_delay(MIN_DELAY)
    }
}

#[async_trait]
impl PlatformAdapter for ThreadsAdapter {
    fn platform(&self) -> Platform {
        Platform::Threads
    }

    async fn fetch_trending(&self) -> AcquisitionResult {
        AcquisitionResult::failed(
            Platform::Threads,
            "Threads requires a login to view the feed; fetch a profile instead",
        )
    }

    async fn fetch_by_search(&self, query: &str) -> AcquisitionResult {
        search_via_web(
            &self.ctx.search,
            Platform::Threads,
            DOMAIN,
            query,
            self.ctx.max_posts(),
            post_from_search_hit,
        )
        .await
    }

    async fn fetch_profile(&self, handle: &str) -> Option<Profile> {
        let handle = handle.trim_start_matches('@').to_string();
        let url = format!("{}/@{handle}", self.base_url);
        run_profile(
            &self.ctx.pool,
            Platform::Threads,
            self.session_config(),
            &url,
            move |html, page_url| parse_profile(html, &handle, page_url),
        )
        .await
    }

    async fn fetch_user_posts(&self, handle: &str) -> AcquisitionResult {
        let handle = handle.trim_start_matches('@').to_string();
        let url = format!("{}/@{handle}", self.base_url);
        let operation = format!("posts of '@{handle}'");
        run_listing(
            &self.ctx.pool,
            Listing {
                platform: Platform::Threads,
                operation: &operation,
                urls: vec![url],
                config: self.session_config(),
            },
            move |html, page_url| parse_user_posts(html, &handle, page_url),
        )
        .await
    }
}

fn post_from_search_hit(hit: &SearchHit) -> Option<Post> {
    if hit.snippet.chars().count() < 15 && hit.title.chars().count() < 15 {
        return None;
    }
    let url = normalize_url(&hit.url);
    let author = capture(&url, &USER_RE)?;
    let id = capture(&url, &POST_ID_RE).unwrap_or_else(|| url.clone());
    Some(post_from_hit(Platform::Threads, hit, id, author))
}

/// Parses a public profile page; `None` for the "not available" page.
#[must_use]
pub fn parse_profile(html: &str, handle: &str, page_url: &str) -> Option<Profile> {
    if html.contains(NOT_AVAILABLE) {
        return None;
    }
    let doc = Html::parse_document(html);
    let root = doc.root_element();
    let name_sel = selector(r#"h1, [role="heading"]"#);
    let bio_sel = selector("span.x1lliihq");
    let avatar_sel = selector(r#"img[alt*="profile"], img[src*="instagram"]"#);
    let verified_sel = selector(r#"[aria-label*="Verified"], svg[aria-label*="verified"]"#);

    let text = element_text(&root);
    let mut profile = Profile::new(Platform::Threads, handle, page_url);
    if let Some(name) = first_text(&root, &name_sel) {
        profile.display_name = name;
    }
    profile.bio = root
        .select(&bio_sel)
        .map(|el| element_text(&el))
        .find(|t| t.chars().count() > 20 && !t.contains("followers"));
    profile.follower_count = first_metric(&text, &[&FOLLOWERS_RE]);
    profile.avatar_url = first_attr(&root, &avatar_sel, "src").and_then(|s| absolutize(page_url, &s));
    profile.verified = Some(root.select(&verified_sel).next().is_some());
    Some(profile)
}

/// Parses the post containers of a profile page. The longest span that is not
/// a counter label is taken as the post text.
#[must_use]
pub fn parse_user_posts(html: &str, handle: &str, page_url: &str) -> Vec<Post> {
    let doc = Html::parse_document(html);
    let container_sel = selector(r#"[data-pressable-container="true"]"#);
    let span_sel = selector("span");
    let link_sel = selector(r#"a[href*="/post/"]"#);
    let time_sel = selector("time[datetime]");

    let mut seen = SeenUrls::new();
    let mut posts = Vec::new();
    for container in doc.select(&container_sel) {
        let content = container
            .select(&span_sel)
            .map(|s| element_text(&s))
            .filter(|t| !t.contains("like") && !t.contains("repl"))
            .max_by_key(|t| t.chars().count())
            .unwrap_or_default();
        if content.chars().count() < 5 {
            continue;
        }
        let Some(url) = first_attr(&container, &link_sel, "href")
            .and_then(|h| absolutize(page_url, &h))
            .map(|u| normalize_url(&u))
        else {
            continue;
        };
        let Some(id) = capture(&url, &POST_ID_RE) else {
            continue;
        };
        if !seen.admit(&url) {
            continue;
        }

        let mut post = Post::new(Platform::Threads, id, url);
        post.content = content;
        post.author_handle = handle.to_string();
        post.likes = first_metric(&element_text(&container), &[&LIKES_RE]);
        post.published_at = first_attr(&container, &time_sel, "datetime")
            .and_then(|d| DateTime::parse_from_rfc3339(&d).ok())
            .map(|d| d.with_timezone(&Utc));
        posts.push(post);
    }
    posts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_profile_is_none() {
        let html = "<html><body><span>Sorry, this page isn't available</span></body></html>";
        assert!(parse_profile(html, "ghost", "https://www.threads.net/@ghost").is_none());
    }

    #[test]
    fn parses_profile_with_verification() {
        let html = r#"<main><h1>Jane Doe</h1>
            <span class="x1lliihq">Building tools for small online shops</span>
            <span>12.5K followers</span>
            <svg aria-label="Verified"></svg></main>"#;
        let profile = parse_profile(html, "jane", "https://www.threads.net/@jane").unwrap();
        assert_eq!(profile.display_name, "Jane Doe");
        assert_eq!(profile.bio.as_deref(), Some("Building tools for small online shops"));
        assert_eq!(profile.follower_count, Some(12_500));
        assert_eq!(profile.verified, Some(true));
    }

    #[test]
    fn parses_user_posts() {
        let html = r#"
        <div data-pressable-container="true">
          <span>jane</span>
          <span>Our checkout keeps timing out for customers on mobile data</span>
          <span>34 likes</span>
          <a href="/@jane/post/C8xYz12"><time datetime="2024-07-04T12:00:00.000Z">2d</time></a>
        </div>
        <div data-pressable-container="true"><span>ok</span><a href="/@jane/post/short">x</a></div>
        <div data-pressable-container="true"><span>A post without any permalink at all</span></div>"#;
        let posts = parse_user_posts(html, "jane", "https://www.threads.net/@jane");
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].platform_id, "C8xYz12");
        assert_eq!(posts[0].url, "https://www.threads.net/@jane/post/C8xYz12");
        assert_eq!(posts[0].likes, Some(34));
        assert!(posts[0].content.starts_with("Our checkout"));
        assert!(posts[0].published_at.is_some());
    }

    #[test]
    fn search_hits_need_a_profile_path() {
        let hit = SearchHit {
            url: "https://www.threads.net/@jane/post/C8xYz12?igshid=1".into(),
            title: "Jane on Threads".into(),
            snippet: "Our checkout keeps timing out".into(),
        };
        let post = post_from_search_hit(&hit).unwrap();
        assert_eq!(post.author_handle, "jane");
        assert_eq!(post.platform_id, "C8xYz12");

        let other = SearchHit {
            url: "https://www.threads.net/login".into(),
            title: "Log in to Threads today".into(),
            snippet: String::new(),
        };
        assert!(post_from_search_hit(&other).is_none());
    }
}
