//! Habr: technical articles with hubs, ratings, comment and view counters.

use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use painradar_core::{AcquisitionResult, Platform, Post, Profile};
use regex::Regex;
use scraper::Html;

use super::{run_listing, run_profile, AdapterContext, Listing, PlatformAdapter};
use crate::extract::{
    absolutize, capture, element_text, encode_query, first_attr, first_metric, first_text,
    parse_rating, selector, truncate_chars, SeenUrls,
};

pub const BASE_URL: &str = "https://habr.com";

static POST_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(\d+)/?$").expect("valid habr id regex"));
static VIEWS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([\d,.]+\s*[kк]?)\s*(?:просмотр|views)").expect("valid habr views regex")
});
static COMMENTS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+)\s*(?:комментар|comments)").expect("valid habr comments regex")
});
static FOLLOWERS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d[\d\s]*)\s*(?:подписчик|followers)").expect("valid habr followers regex")
});

pub struct HabrAdapter {
    ctx: AdapterContext,
    base_url: String,
}

impl HabrAdapter {
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
                platform: Platform::Habr,
                operation,
                urls: vec![url],
                config: self.ctx.session_config(),
            },
            parse_article_list,
        )
        .await
    }
}

#[async_trait]
impl PlatformAdapter for HabrAdapter {
    fn platform(&self) -> Platform {
        Platform::Habr
    }

    async fn fetch_trending(&self) -> AcquisitionResult {
        let url = format!("{}/ru/articles/top/daily/", self.base_url);
        self.listing("trending", url).await
    }

    async fn fetch_by_search(&self, query: &str) -> AcquisitionResult {
        let url = format!(
            "{}/ru/search/?q={}&target_type=posts&order=relevance",
            self.base_url,
            encode_query(query)
        );
        self.listing(&format!("search '{query}'"), url).await
    }

    async fn fetch_profile(&self, handle: &str) -> Option<Profile> {
        let url = format!("{}/ru/users/{}/", self.base_url, handle.trim_start_matches('@'));
        let handle = handle.trim_start_matches('@').to_string();
        run_profile(
            &self.ctx.pool,
            Platform::Habr,
            self.ctx.session_config(),
            &url,
            move |html, page_url| parse_profile(html, &handle, page_url),
        )
        .await
    }

    async fn fetch_by_category(&self, hub: &str) -> AcquisitionResult {
        let url = format!("{}/ru/hub/{}/", self.base_url, hub.trim_matches('/'));
        self.listing(&format!("hub '{hub}'"), url).await
    }

    async fn fetch_user_posts(&self, handle: &str) -> AcquisitionResult {
        let url = format!(
            "{}/ru/users/{}/publications/articles/",
            self.base_url,
            handle.trim_start_matches('@')
        );
        self.listing(&format!("posts of '{handle}'"), url).await
    }
}

/// Parses an article feed (top, search, hub or user publications).
#[must_use]
pub fn parse_article_list(html: &str, page_url: &str) -> Vec<Post> {
    let doc = Html::parse_document(html);
    let article_sel = selector(r#"article, [class*="tm-articles-list__item"]"#);
    let title_sel = selector(r#"[class*="tm-title"]"#);
    let link_sel = selector(r#"a[href*="/articles/"], a[href*="/post/"], a[href*="/news/"]"#);
    let author_sel = selector(r#"[class*="tm-user-info__username"], [class*="user-info"] a"#);
    let rating_sel = selector(r#"[class*="votes-meter__value"], [class*="rating"]"#);
    let comments_sel = selector(r#"[class*="comments-count"], [class*="comments-counter"]"#);
    let views_sel = selector(r#"[class*="icon-counter__value"]"#);
    let hub_sel = selector(r#"[class*="publication-hub__link"] span, [class*="snippet__hubs"] a"#);
    let body_sel = selector(r#"[class*="article-formatted-body"], [class*="snippet__lead"]"#);
    let time_sel = selector("time[datetime]");

    let mut seen = SeenUrls::new();
    let mut posts = Vec::new();

    for article in doc.select(&article_sel) {
        let title_el = article.select(&title_sel).next();
        let Some(title) = title_el.map(|t| element_text(&t)) else {
            continue;
        };
        if title.chars().count() < 10 {
            continue;
        }
        let href = title_el
            .and_then(|t| {
                t.value()
                    .attr("href")
                    .map(str::to_string)
                    .or_else(|| first_attr(&t, &link_sel, "href"))
            })
            .or_else(|| first_attr(&article, &link_sel, "href"));
        let Some(url) = href.and_then(|h| absolutize(page_url, &h)) else {
            continue;
        };
        if url.contains("/comments") || !seen.admit(&url) {
            continue;
        }
        let url = crate::extract::normalize_url(&url);

        let text = element_text(&article);
        let mut post = Post::new(
            Platform::Habr,
            capture(&url, &POST_ID_RE).unwrap_or_else(|| url.clone()),
            url,
        );
        post.content = first_text(&article, &body_sel)
            .map_or_else(|| title.clone(), |body| truncate_chars(&body, 500));
        post.title = Some(title);
        post.author_handle = first_text(&article, &author_sel).unwrap_or_default();
        post.likes = first_text(&article, &rating_sel).and_then(|r| parse_rating(&r));
        post.comments = first_text(&article, &comments_sel)
            .and_then(|c| crate::numbers::parse_abbreviated_number(&c))
            .or_else(|| first_metric(&text, &[&COMMENTS_RE]));
        post.views = first_metric(&text, &[&VIEWS_RE]).or_else(|| {
            first_text(&article, &views_sel).and_then(|v| crate::numbers::parse_abbreviated_number(&v))
        });
        post.published_at = first_attr(&article, &time_sel, "datetime")
            .and_then(|d| DateTime::parse_from_rfc3339(&d).ok())
            .map(|d| d.with_timezone(&Utc));

        let hubs: Vec<String> = article
            .select(&hub_sel)
            .map(|h| element_text(&h).trim_end_matches('*').trim().to_string())
            .filter(|h| !h.is_empty())
            .take(3)
            .collect();
        post.category = (!hubs.is_empty()).then(|| hubs.join(", "));

        posts.push(post);
    }
    posts
}

/// Parses a user page; `None` when no user card is present.
#[must_use]
pub fn parse_profile(html: &str, handle: &str, page_url: &str) -> Option<Profile> {
    let doc = Html::parse_document(html);
    let root = doc.root_element();
    let name_sel = selector(r#"[class*="user-card__name"], [class*="page-title"], h1"#);
    let bio_sel = selector(r#"[class*="user-card__short-info"], [class*="user-about"]"#);
    let avatar_sel = selector(r#"[class*="user-card__avatar"] img, [class*="avatar"] img"#);

    let display_name = first_text(&root, &name_sel)?;
    let text = element_text(&root);

    let mut profile = Profile::new(Platform::Habr, handle, page_url);
    profile.display_name = display_name;
    profile.bio = first_text(&root, &bio_sel);
    profile.follower_count = first_metric(&text, &[&FOLLOWERS_RE]);
    profile.avatar_url = first_attr(&root, &avatar_sel, "src").and_then(|s| absolutize(page_url, &s));
    Some(profile)
}
