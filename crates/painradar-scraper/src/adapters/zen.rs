//! Dzen (Yandex Zen): article cards whose link text mixes author, counters and title.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use painradar_core::{AcquisitionResult, Platform, Post, Profile};
use regex::Regex;
use scraper::Html;

use super::{
    post_from_hit, run_listing, run_profile, search_via_web, AdapterContext, Listing,
    PlatformAdapter,
};
use crate::extract::{
    absolutize, capture, collapse_whitespace, element_text, first_attr, first_metric, first_text,
    len_within, normalize_url, selector, SeenUrls,
};
use crate::session::SessionConfig;
use crate::web_search::SearchHit;

pub const BASE_URL: &str = "https://dzen.ru";
const DOMAIN: &str = "dzen.ru";
const MIN_DELAY: Duration = Duration::from_secs(2);

static ARTICLE_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/a/([^/?#]+)").expect("valid zen article regex"));
static AUTHOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^([А-Яа-яЁёA-Za-z\s.\-]+?)(?:\d|тыс|читали)").expect("valid zen author regex")
});
static STATS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\d[\d\s.,]*\s*(?:тыс\.?\s*)?(?:читали|просмотр\w*|подписчик\w*|лайк\w*)")
        .expect("valid zen stats regex")
});
static AGO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*\d+\s*(?:день|дня|дней|час\w*|минут\w*|недел\w*|месяц\w*)\s+назад")
        .expect("valid zen age regex")
});
static VIEWS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d[\d,.\s]*[кkмm]?)\s*просмотр").expect("valid zen views regex")
});
static READS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d[\d,.\s]*[кkмm]?)\s*читали").expect("valid zen reads regex")
});
static LIKES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d[\d,]*)\s*лайк").expect("valid zen likes regex"));
static THUMBS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"👍\s*(\d[\d,]*)").expect("valid zen thumbs regex"));
static SUBSCRIBERS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d[\d,.\s]*[кkмm]?)\s*подписчик").expect("valid zen subscribers regex")
});

pub struct ZenAdapter {
    ctx: AdapterContext,
    base_url: String,
}

impl ZenAdapter {
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

    async fn listing(&self, operation: &str, url: String, category: Option<&str>) -> AcquisitionResult {
        let category = category.map(str::to_string);
        run_listing(
            &self.ctx.pool,
            Listing {
                platform: Platform::Zen,
                operation,
                urls: vec![url],
                config: self.session_config(),
            },
            move |html, page_url| {
                let mut posts = parse_card_list(html, page_url);
                if let Some(category) = &category {
                    for post in &mut posts {
                        post.category = Some(category.clone());
                    }
                }
                posts
            },
        )
        .await
    }
}

#[async_trait]
impl PlatformAdapter for ZenAdapter {
    fn platform(&self) -> Platform {
        Platform::Zen
    }

    async fn fetch_trending(&self) -> AcquisitionResult {
        self.listing("trending", self.base_url.clone(), None).await
    }

    /// Dzen has no server-rendered search page; results come from the web-search fallback.
    async fn fetch_by_search(&self, query: &str) -> AcquisitionResult {
        search_via_web(
            &self.ctx.search,
            Platform::Zen,
            DOMAIN,
            query,
            self.ctx.max_posts(),
            post_from_search_hit,
        )
        .await
    }

    async fn fetch_profile(&self, channel: &str) -> Option<Profile> {
        let channel = channel.trim_start_matches('@').to_string();
        let url = format!("{}/{channel}", self.base_url);
        run_profile(
            &self.ctx.pool,
            Platform::Zen,
            self.session_config(),
            &url,
            move |html, page_url| parse_channel(html, &channel, page_url),
        )
        .await
    }

    async fn fetch_by_category(&self, category: &str) -> AcquisitionResult {
        let url = format!("{}/category/{}", self.base_url, category.trim_matches('/'));
        self.listing(&format!("category '{category}'"), url, Some(category))
            .await
    }

    async fn fetch_by_channel(&self, channel: &str) -> AcquisitionResult {
        let url = format!("{}/{}", self.base_url, channel.trim_start_matches('@'));
        self.listing(&format!("channel '{channel}'"), url, None).await
    }
}

fn post_from_search_hit(hit: &SearchHit) -> Option<Post> {
    let id = capture(&hit.url, &ARTICLE_ID_RE)?;
    Some(post_from_hit(Platform::Zen, hit, id, String::new()))
}

/// Pulls the headline out of a card's flattened text such as
/// `"Motor.ru 7180 читали · 1 день назад Заголовок статьи"`.
fn clean_card_title(text: &str) -> String {
    let tail = text.rsplit('·').next().unwrap_or(text);
    let tail = AGO_RE.replace(tail, "");
    let cleaned = STATS_RE.replace_all(&tail, "").replace("Подписаться", "");
    collapse_whitespace(&cleaned)
}

/// Parses any page listing `/a/` article links (home feed, category or channel).
#[must_use]
pub fn parse_card_list(html: &str, page_url: &str) -> Vec<Post> {
    let doc = Html::parse_document(html);
    let link_sel = selector(r#"a[href*="/a/"]"#);
    let heading_sel = selector(r#"h2, h3, [class*="title"]"#);

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
        let Some(id) = capture(&url, &ARTICLE_ID_RE) else {
            continue;
        };
        let text = element_text(&link);
        if text.is_empty() {
            continue;
        }
        let title = first_text(&link, &heading_sel).unwrap_or_else(|| clean_card_title(&text));
        if !len_within(&title, 15, 300) || !seen.admit(&url) {
            continue;
        }

        let mut post = Post::new(Platform::Zen, id, url);
        post.author_handle = capture(&text, &AUTHOR_RE).unwrap_or_default();
        post.author_display_name = Some(post.author_handle.clone()).filter(|a| !a.is_empty());
        post.views = first_metric(&text, &[&VIEWS_RE, &READS_RE]);
        post.likes = first_metric(&text, &[&LIKES_RE, &THUMBS_RE]);
        post.content.clone_from(&title);
        post.title = Some(title);
        posts.push(post);
    }
    posts
}

#[must_use]
pub fn parse_channel(html: &str, channel: &str, page_url: &str) -> Option<Profile> {
    let doc = Html::parse_document(html);
    let root = doc.root_element();
    let name_sel = selector(r#"h1, [class*="channel-name"], [class*="title"]"#);
    let bio_sel = selector(r#"[class*="description"], [class*="about"]"#);
    let avatar_sel = selector(r#"[class*="avatar"] img, [class*="channel-logo"] img"#);

    let text = element_text(&root);
    let display_name = first_text(&root, &name_sel);
    let followers = first_metric(&text, &[&SUBSCRIBERS_RE]);
    if display_name.is_none() && followers.is_none() {
        return None;
    }

    let mut profile = Profile::new(Platform::Zen, channel, page_url);
    profile.display_name = display_name.unwrap_or_else(|| channel.to_string());
    profile.bio = first_text(&root, &bio_sel);
    profile.follower_count = followers;
    profile.avatar_url = first_attr(&root, &avatar_sel, "src").and_then(|s| absolutize(page_url, &s));
    Some(profile)
}
