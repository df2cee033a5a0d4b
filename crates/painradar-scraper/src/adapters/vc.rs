//! VC.ru: business and startup entries grouped into subsites.

use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use painradar_core::{AcquisitionResult, Platform, Post, Profile};
use regex::Regex;
use scraper::{ElementRef, Html};

use super::{run_listing, run_profile, AdapterContext, Listing, PlatformAdapter};
use crate::extract::{
    absolutize, capture, class_contains, climb, element_text, encode_query, first_attr,
    first_metric, first_text, len_within, normalize_url, parse_rating, selector, truncate_chars,
    SeenUrls,
};
use crate::numbers::parse_abbreviated_number;

pub const BASE_URL: &str = "https://vc.ru";

static ENTRY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)/(\d+)-[a-z0-9-]+/?$").expect("valid vc entry regex"));
static COMMENTS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*коммент").expect("valid vc comments regex"));
static FOLLOWERS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d[\d\s]*[кk]?)\s*подписчик").expect("valid vc followers regex")
});

pub struct VcAdapter {
    ctx: AdapterContext,
    base_url: String,
}

impl VcAdapter {
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

    async fn listing(&self, operation: &str, urls: Vec<String>) -> AcquisitionResult {
        run_listing(
            &self.ctx.pool,
            Listing {
                platform: Platform::Vc,
                operation,
                urls,
                config: self.ctx.session_config(),
            },
            parse_entry_list,
        )
        .await
    }
}

#[async_trait]
impl PlatformAdapter for VcAdapter {
    fn platform(&self) -> Platform {
        Platform::Vc
    }

    async fn fetch_trending(&self) -> AcquisitionResult {
        self.listing("trending", vec![format!("{}/popular", self.base_url)])
            .await
    }

    async fn fetch_by_search(&self, query: &str) -> AcquisitionResult {
        let q = encode_query(query);
        let urls = vec![
            format!("{}/search?q={q}&mode=entries", self.base_url),
            format!("{}/search?q={q}", self.base_url),
        ];
        self.listing(&format!("search '{query}'"), urls).await
    }

    async fn fetch_profile(&self, handle: &str) -> Option<Profile> {
        let handle = handle.trim_start_matches('@').to_string();
        let url = format!("{}/u/{handle}", self.base_url);
        run_profile(
            &self.ctx.pool,
            Platform::Vc,
            self.ctx.session_config(),
            &url,
            move |html, page_url| parse_profile(html, &handle, page_url),
        )
        .await
    }

    async fn fetch_by_category(&self, section: &str) -> AcquisitionResult {
        let url = format!("{}/{}", self.base_url, section.trim_matches('/'));
        self.listing(&format!("section '{section}'"), vec![url]).await
    }

    async fn fetch_user_posts(&self, handle: &str) -> AcquisitionResult {
        let url = format!("{}/u/{}", self.base_url, handle.trim_start_matches('@'));
        self.listing(&format!("posts of '{handle}'"), vec![url]).await
    }
}

fn is_entry_container(el: &ElementRef<'_>) -> bool {
    el.value().name() == "article"
        || class_contains(el, "feed__item")
        || class_contains(el, "content--short")
}

/// Parses a VC.ru feed or search page.
#[must_use]
pub fn parse_entry_list(html: &str, page_url: &str) -> Vec<Post> {
    let doc = Html::parse_document(html);
    let link_sel = selector("a[href]");
    let heading_sel = selector(r#"h2, h3, [class*="title"]"#);
    let author_sel = selector(r#"[class*="author__name"], [class*="author"]"#);
    let subsite_sel = selector(r#"[class*="subsite__name"], [class*="subsite"]"#);
    let comments_sel = selector(r#"[class*="comments"]"#);
    let likes_sel = selector(r#"[class*="like"], [class*="reaction"]"#);
    let views_sel = selector(r#"[class*="views"]"#);
    let body_sel = selector(r#"[class*="content__body"], [class*="block-text"], p"#);
    let time_sel = selector("time[datetime]");

    let mut seen = SeenUrls::new();
    let mut posts = Vec::new();

    for link in doc.select(&link_sel) {
        let Some(url) = link
            .value()
            .attr("href")
            .and_then(|h| absolutize(page_url, h))
            .map(|u| normalize_url(&u))
        else {
            continue;
        };
        if url.contains("/u/") {
            continue;
        }
        let Some(id) = capture(&url, &ENTRY_RE) else {
            continue;
        };
        let title = first_text(&link, &heading_sel).unwrap_or_else(|| element_text(&link));
        if !len_within(&title, 15, 300) || !seen.admit(&url) {
            continue;
        }

        let container = climb(link, 5, is_entry_container).unwrap_or(link);
        let text = element_text(&container);

        let mut post = Post::new(Platform::Vc, id, url);
        post.author_handle = first_text(&container, &author_sel).unwrap_or_default();
        post.category = first_text(&container, &subsite_sel).filter(|s| s != &post.author_handle);
        post.comments = first_text(&container, &comments_sel)
            .and_then(|c| parse_abbreviated_number(&c))
            .or_else(|| first_metric(&text, &[&COMMENTS_RE]));
        post.likes = first_text(&container, &likes_sel).and_then(|l| parse_rating(&l));
        post.views = first_text(&container, &views_sel).and_then(|v| parse_abbreviated_number(&v));
        post.content = container
            .select(&body_sel)
            .map(|b| element_text(&b))
            .find(|b| b.chars().count() > 20 && b != &title)
            .map_or_else(|| title.clone(), |body| truncate_chars(&body, 500));
        post.published_at = first_attr(&container, &time_sel, "datetime")
            .and_then(|d| DateTime::parse_from_rfc3339(&d).ok())
            .map(|d| d.with_timezone(&Utc));
        post.title = Some(title);

        posts.push(post);
    }
    posts
}

#[must_use]
pub fn parse_profile(html: &str, handle: &str, page_url: &str) -> Option<Profile> {
    let doc = Html::parse_document(html);
    let root = doc.root_element();
    let name_sel = selector(r#"[class*="subsite-card__name"], h1"#);
    let bio_sel = selector(r#"[class*="subsite-card__description"], [class*="description"]"#);
    let avatar_sel = selector(r#"[class*="avatar"] img"#);

    let display_name = first_text(&root, &name_sel)?;
    let text = element_text(&root);

    let mut profile = Profile::new(Platform::Vc, handle, page_url);
    profile.display_name = display_name;
    profile.bio = first_text(&root, &bio_sel);
    profile.follower_count = first_metric(&text, &[&FOLLOWERS_RE]);
    profile.avatar_url = first_attr(&root, &avatar_sel, "src").and_then(|s| absolutize(page_url, &s));
    Some(profile)
}
