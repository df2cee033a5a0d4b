//! Pikabu: story feeds with ratings, comment counts and tags.

use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use painradar_core::{AcquisitionResult, Platform, Post, Profile};
use regex::Regex;
use scraper::{ElementRef, Html};

use super::{run_listing, run_profile, AdapterContext, Listing, PlatformAdapter};
use crate::extract::{
    absolutize, capture, climb, element_text, encode_query, first_attr,
    first_metric, first_text, len_within, normalize_url, parse_rating, selector, truncate_chars,
    SeenUrls,
};
use crate::numbers::parse_abbreviated_number;

pub const BASE_URL: &str = "https://pikabu.ru";

static STORY_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_(\d+)$").expect("valid pikabu id regex"));
static AUTHOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@([A-Za-z0-9_]+)").expect("valid pikabu author regex"));
static COMMENTS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*коммент").expect("valid pikabu comments regex"));
static FOLLOWERS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d[\d\s]*[кk]?)\s*подписчик").expect("valid pikabu followers regex")
});
static POSTS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d[\d\s]*)\s*пост").expect("valid pikabu posts regex"));

pub struct PikabuAdapter {
    ctx: AdapterContext,
    base_url: String,
}

impl PikabuAdapter {
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

    async fn listing(&self, operation: &str, url: String) -> AcquisitionResult {
        run_listing(
            &self.ctx.pool,
            Listing {
                platform: Platform::Pikabu,
                operation,
                urls: vec![url],
                config: self.ctx.session_config(),
            },
            parse_story_list,
        )
        .await
    }
}

#[async_trait]
impl PlatformAdapter for PikabuAdapter {
    fn platform(&self) -> Platform {
        Platform::Pikabu
    }

    async fn fetch_trending(&self) -> AcquisitionResult {
        self.listing("trending", format!("{}/hot", self.base_url)).await
    }

    async fn fetch_by_search(&self, query: &str) -> AcquisitionResult {
        let url = format!("{}/search?q={}", self.base_url, encode_query(query));
        self.listing(&format!("search '{query}'"), url).await
    }

    async fn fetch_profile(&self, handle: &str) -> Option<Profile> {
        let handle = handle.trim_start_matches('@').to_string();
        let url = format!("{}/@{handle}", self.base_url);
        run_profile(
            &self.ctx.pool,
            Platform::Pikabu,
            self.ctx.session_config(),
            &url,
            move |html, page_url| parse_profile(html, &handle, page_url),
        )
        .await
    }

    async fn fetch_by_category(&self, tag: &str) -> AcquisitionResult {
        let url = format!("{}/tag/{}", self.base_url, encode_query(tag));
        self.listing(&format!("tag '{tag}'"), url).await
    }

    async fn fetch_user_posts(&self, handle: &str) -> AcquisitionResult {
        let url = format!("{}/@{}", self.base_url, handle.trim_start_matches('@'));
        self.listing(&format!("posts of '{handle}'"), url).await
    }
}

fn is_story_container(el: &ElementRef<'_>) -> bool {
    el.value().name() == "article" || el.value().classes().any(|c| c == "story")
}

/// Parses a story feed (hot, search, tag or user page).
#[must_use]
pub fn parse_story_list(html: &str, page_url: &str) -> Vec<Post> {
    let doc = Html::parse_document(html);
    let link_sel = selector(r#"a[href*="/story/"]"#);
    let author_sel = selector(r#"a[href^="/@"], a[href*="pikabu.ru/@"]"#);
    let rating_sel = selector(r#"[class*="rating-count"]"#);
    let comments_sel = selector(r#"[class*="comments-link-count"]"#);
    let views_sel = selector(r#"[class*="views-count"]"#);
    let tag_sel = selector(r#"[class*="tags__tag"]"#);
    let body_sel = selector(r#"[class*="story-block_type_text"]"#);
    let time_sel = selector("time[datetime]");

    let mut seen = SeenUrls::new();
    let mut posts = Vec::new();

    for link in doc.select(&link_sel) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        if !href.contains('_') {
            continue;
        }
        let title = element_text(&link);
        if !len_within(&title, 10, 500) {
            continue;
        }
        let Some(url) = absolutize(page_url, href) else {
            continue;
        };
        if !seen.admit(&url) {
            continue;
        }
        let url = normalize_url(&url);
        let Some(id) = capture(&url, &STORY_ID_RE) else {
            continue;
        };

        let container = climb(link, 6, is_story_container)
            .or_else(|| link.parent().and_then(ElementRef::wrap))
            .unwrap_or(link);
        let text = element_text(&container);

        let mut post = Post::new(Platform::Pikabu, id, url);
        post.author_handle = first_attr(&container, &author_sel, "href")
            .and_then(|h| h.rsplit('@').next().map(|s| s.trim_matches('/').to_string()))
            .filter(|h| !h.is_empty())
            .or_else(|| capture(&text, &AUTHOR_RE))
            .unwrap_or_default();
        post.likes = first_text(&container, &rating_sel).and_then(|r| parse_rating(&r));
        post.comments = first_text(&container, &comments_sel)
            .and_then(|c| parse_abbreviated_number(&c))
            .or_else(|| first_metric(&text, &[&COMMENTS_RE]));
        post.views = first_text(&container, &views_sel).and_then(|v| parse_abbreviated_number(&v));
        post.content = first_text(&container, &body_sel)
            .map_or_else(|| title.clone(), |body| truncate_chars(&body, 500));
        post.published_at = first_attr(&container, &time_sel, "datetime")
            .and_then(|d| DateTime::parse_from_rfc3339(&d).ok())
            .map(|d| d.with_timezone(&Utc));
        let tags: Vec<String> = container
            .select(&tag_sel)
            .map(|t| element_text(&t))
            .filter(|t| !t.is_empty())
            .take(3)
            .collect();
        post.category = (!tags.is_empty()).then(|| tags.join(", "));
        post.title = Some(title);

        posts.push(post);
    }
    posts
}

#[must_use]
pub fn parse_profile(html: &str, handle: &str, page_url: &str) -> Option<Profile> {
    let doc = Html::parse_document(html);
    let root = doc.root_element();
    let name_sel = selector(r#"[class*="profile__nick"], h1"#);
    let about_sel = selector(r#"[class*="profile__about"], [class*="profile__section_about"]"#);
    let avatar_sel = selector(r#"[class*="avatar"] img"#);

    let display_name = first_text(&root, &name_sel)?;
    let text = element_text(&root);

    let mut profile = Profile::new(Platform::Pikabu, handle, page_url);
    profile.display_name = display_name.trim_start_matches('@').to_string();
    profile.bio = first_text(&root, &about_sel);
    profile.follower_count = first_metric(&text, &[&FOLLOWERS_RE]);
    profile.post_count = first_metric(&text, &[&POSTS_RE]);
    profile.avatar_url = first_attr(&root, &avatar_sel, "data-src")
        .or_else(|| first_attr(&root, &avatar_sel, "src"))
        .and_then(|s| absolutize(page_url, &s));
    Some(profile)
}
