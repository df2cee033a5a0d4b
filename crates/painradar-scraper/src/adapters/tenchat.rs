//! TenChat: a business network feed of short posts without headlines.

use std::sync::LazyLock;

use async_trait::async_trait;
use painradar_core::{AcquisitionResult, Platform, Post, Profile};
use regex::Regex;
use scraper::Html;

use super::{
    post_from_hit, run_listing, run_profile, search_via_web, AdapterContext, Listing,
    PlatformAdapter,
};
use crate::extract::{
    absolutize, capture, element_text, first_attr, first_metric, first_text, normalize_url,
    selector, truncate_chars, SeenUrls,
};
use crate::web_search::SearchHit;

pub const BASE_URL: &str = "https://tenchat.ru";
const DOMAIN: &str = "tenchat.ru";

static POST_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(?:post|p)/([^/?#]+)").expect("valid tenchat id regex"));
static LIKES_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+)\s*(?:лайк|like|♥|❤)").expect("valid tenchat likes regex")
});
static COMMENTS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+)\s*(?:коммент|comment)").expect("valid tenchat comments regex")
});
static FOLLOWERS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d[\d,.\s]*[кk]?)\s*(?:подписчик|follower)").expect("valid tenchat followers regex")
});
static POSTS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d[\d\s]*)\s*(?:публикац|post)").expect("valid tenchat posts regex")
});

pub struct TenChatAdapter {
    ctx: AdapterContext,
    base_url: String,
}

impl TenChatAdapter {
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
}

#[async_trait]
impl PlatformAdapter for TenChatAdapter {
    fn platform(&self) -> Platform {
        Platform::TenChat
    }

    async fn fetch_trending(&self) -> AcquisitionResult {
        run_listing(
            &self.ctx.pool,
            Listing {
                platform: Platform::TenChat,
                operation: "trending",
                urls: vec![format!("{}/feed", self.base_url)],
                config: self.ctx.session_config(),
            },
            parse_feed,
        )
        .await
    }

    async fn fetch_by_search(&self, query: &str) -> AcquisitionResult {
        search_via_web(
            &self.ctx.search,
            Platform::TenChat,
            DOMAIN,
            query,
            self.ctx.max_posts(),
            post_from_search_hit,
        )
        .await
    }

    async fn fetch_profile(&self, handle: &str) -> Option<Profile> {
        let handle = handle.trim_start_matches('@').to_string();
        let url = format!("{}/{handle}", self.base_url);
        run_profile(
            &self.ctx.pool,
            Platform::TenChat,
            self.ctx.session_config(),
            &url,
            move |html, page_url| parse_profile(html, &handle, page_url),
        )
        .await
    }
}

fn post_from_search_hit(hit: &SearchHit) -> Option<Post> {
    let id = capture(&hit.url, &POST_ID_RE)?;
    Some(post_from_hit(Platform::TenChat, hit, id, String::new()))
}

/// Parses feed cards; cards with less than 20 characters of text are skipped.
#[must_use]
pub fn parse_feed(html: &str, page_url: &str) -> Vec<Post> {
    let doc = Html::parse_document(html);
    let card_sel = selector(r#"[class*="post"], [class*="feed-item"], article"#);
    let link_sel = selector(r#"a[href*="/post/"], a[href*="/p/"]"#);
    let content_sel = selector(r#"[class*="content"], [class*="text"], p"#);
    let author_sel = selector(r#"[class*="author"], [class*="user-name"], [class*="name"]"#);

    let mut seen = SeenUrls::new();
    let mut posts = Vec::new();

    for card in doc.select(&card_sel) {
        let Some(url) = first_attr(&card, &link_sel, "href")
            .and_then(|h| absolutize(page_url, &h))
            .map(|u| normalize_url(&u))
        else {
            continue;
        };
        let Some(content) = first_text(&card, &content_sel).filter(|c| c.chars().count() >= 20)
        else {
            continue;
        };
        if !seen.admit(&url) {
            continue;
        }

        let text = element_text(&card);
        let id = capture(&url, &POST_ID_RE).unwrap_or_else(|| url.clone());
        let mut post = Post::new(Platform::TenChat, id, url);
        post.content = truncate_chars(&content, 500);
        post.author_handle = first_text(&card, &author_sel).unwrap_or_default();
        post.author_display_name = Some(post.author_handle.clone()).filter(|a| !a.is_empty());
        post.likes = first_metric(&text, &[&LIKES_RE]);
        post.comments = first_metric(&text, &[&COMMENTS_RE]);
        posts.push(post);
    }
    posts
}

#[must_use]
pub fn parse_profile(html: &str, handle: &str, page_url: &str) -> Option<Profile> {
    let doc = Html::parse_document(html);
    let root = doc.root_element();
    let name_sel = selector(r#"h1, [class*="profile-name"], [class*="user-name"]"#);
    let bio_sel = selector(r#"[class*="bio"], [class*="about"], [class*="description"]"#);
    let avatar_sel = selector(r#"[class*="avatar"] img, [class*="profile-photo"] img"#);

    let display_name = first_text(&root, &name_sel)?;
    let text = element_text(&root);

    let mut profile = Profile::new(Platform::TenChat, handle, page_url);
    profile.display_name = display_name;
    profile.bio = first_text(&root, &bio_sel);
    profile.follower_count = first_metric(&text, &[&FOLLOWERS_RE]);
    profile.post_count = first_metric(&text, &[&POSTS_RE]);
    profile.avatar_url = first_attr(&root, &avatar_sel, "src").and_then(|s| absolutize(page_url, &s));
    Some(profile)
}
