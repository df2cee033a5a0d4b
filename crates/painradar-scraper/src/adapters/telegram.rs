//! Telegram public channels through the `t.me/s/` web preview, with channel
//! discovery through the tgstat directory.
//!
//! There is no global feed: trending always fails and posts are read one
//! channel at a time.

use std::sync::LazyLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use painradar_core::{AcquisitionResult, Platform, Post, Profile};
use regex::Regex;
use scraper::Html;

use super::{run_listing, run_profile, AdapterContext, Listing, PlatformAdapter};
use crate::extract::{
    absolutize, capture, element_text, encode_query, first_attr, first_metric, first_text,
    selector, truncate_chars,
};
use crate::numbers::parse_abbreviated_number;

pub const PREVIEW_URL: &str = "https://t.me/s";
pub const PUBLIC_URL: &str = "https://t.me";
pub const DIRECTORY_URL: &str = "https://tgstat.ru";
const CHANNEL_PAUSE: Duration = Duration::from_secs(2);

static CHANNEL_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"t\.me/([^/?#]+)").expect("valid telegram channel regex"));
static MESSAGE_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(\d+)(?:\?|$)").expect("valid telegram message regex"));
static SUBSCRIBERS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d[\d,.\s]*[кkмm]?)\s*подписчик").expect("valid telegram subscribers regex")
});

pub struct TelegramAdapter {
    ctx: AdapterContext,
    preview_url: String,
    directory_url: String,
}

impl TelegramAdapter {
    #[must_use]
    pub fn new(ctx: AdapterContext) -> Self {
        Self::with_base_url(ctx, PREVIEW_URL)
    }

    /// `base_url` replaces the `t.me/s` preview root.
    #[must_use]
    pub fn with_base_url(ctx: AdapterContext, base_url: &str) -> Self {
        Self {
            ctx,
            preview_url: base_url.trim_end_matches('/').to_string(),
            directory_url: DIRECTORY_URL.to_string(),
        }
    }

    #[must_use]
    pub fn with_directory_url(mut self, url: &str) -> Self {
        self.directory_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Reads several channels one after another and merges their posts,
    /// most viewed first.
    pub async fn fetch_channels(&self, channels: &[&str]) -> AcquisitionResult {
        let started = Instant::now();
        let mut merged = AcquisitionResult::new(Platform::Telegram);
        for (i, channel) in channels.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(CHANNEL_PAUSE).await;
            }
            let result = self.fetch_channel(channel).await;
            merged.posts.extend(result.posts);
            merged.errors.extend(result.errors);
        }
        merged.posts.sort_by(|a, b| b.views.unwrap_or(0).cmp(&a.views.unwrap_or(0)));
        merged.posts.truncate(self.ctx.max_posts());
        merged.finish(started)
    }

    async fn fetch_channel(&self, channel: &str) -> AcquisitionResult {
        let channel = channel.trim().trim_start_matches('@').to_string();
        let url = format!("{}/{channel}", self.preview_url);
        let operation = format!("channel '@{channel}'");
        run_listing(
            &self.ctx.pool,
            Listing {
                platform: Platform::Telegram,
                operation: &operation,
                urls: vec![url],
                config: self.ctx.session_config(),
            },
            move |html, _| parse_channel_messages(html, &channel),
        )
        .await
    }
}

#[async_trait]
impl PlatformAdapter for TelegramAdapter {
    fn platform(&self) -> Platform {
        Platform::Telegram
    }

    async fn fetch_trending(&self) -> AcquisitionResult {
        AcquisitionResult::failed(
            Platform::Telegram,
            "Telegram requires a channel name; use the channel command",
        )
    }

    /// Finds channels matching `query`; each channel becomes one post whose
    /// view count is its subscriber count.
    async fn fetch_by_search(&self, query: &str) -> AcquisitionResult {
        let url = format!("{}/search?q={}", self.directory_url, encode_query(query));
        run_listing(
            &self.ctx.pool,
            Listing {
                platform: Platform::Telegram,
                operation: &format!("search '{query}'"),
                urls: vec![url],
                config: self.ctx.session_config(),
            },
            |html, _| parse_directory(html),
        )
        .await
    }

    async fn fetch_profile(&self, channel: &str) -> Option<Profile> {
        let channel = channel.trim_start_matches('@').to_string();
        let url = format!("{}/{channel}", self.preview_url);
        run_profile(
            &self.ctx.pool,
            Platform::Telegram,
            self.ctx.session_config(),
            &url,
            move |html, page_url| parse_channel_info(html, &channel, page_url),
        )
        .await
    }

    /// Accepts a single channel or a comma-separated list.
    async fn fetch_by_channel(&self, channel: &str) -> AcquisitionResult {
        let channels: Vec<&str> = channel
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .collect();
        match channels.as_slice() {
            [] => AcquisitionResult::failed(Platform::Telegram, "no channel given"),
            [one] => self.fetch_channel(one).await,
            many => self.fetch_channels(many).await,
        }
    }

    async fn fetch_user_posts(&self, channel: &str) -> AcquisitionResult {
        self.fetch_channel(channel).await
    }
}

/// Parses the message widgets of a `t.me/s/<channel>` page.
#[must_use]
pub fn parse_channel_messages(html: &str, channel: &str) -> Vec<Post> {
    let doc = Html::parse_document(html);
    let message_sel = selector(".tgme_widget_message");
    let text_sel = selector(".tgme_widget_message_text");
    let views_sel = selector(".tgme_widget_message_views");
    let date_sel = selector(".tgme_widget_message_date");
    let time_sel = selector("time[datetime]");

    let mut posts = Vec::new();
    for message in doc.select(&message_sel) {
        let Some(content) = first_text(&message, &text_sel).filter(|c| c.chars().count() >= 10)
        else {
            continue;
        };
        let id = message
            .value()
            .attr("data-post")
            .and_then(|p| p.rsplit('/').next())
            .map(str::to_string)
            .or_else(|| {
                first_attr(&message, &date_sel, "href").and_then(|h| capture(&h, &MESSAGE_ID_RE))
            });
        let Some(id) = id.filter(|i| !i.is_empty()) else {
            continue;
        };

        let mut post = Post::new(Platform::Telegram, id.clone(), format!("{PUBLIC_URL}/{channel}/{id}"));
        post.content = truncate_chars(&content, 500);
        post.author_handle = channel.to_string();
        post.views = first_text(&message, &views_sel).and_then(|v| parse_abbreviated_number(&v));
        post.published_at = first_attr(&message, &time_sel, "datetime")
            .and_then(|d| DateTime::parse_from_rfc3339(&d).ok())
            .map(|d| d.with_timezone(&Utc));
        posts.push(post);
    }
    posts
}

/// Parses a tgstat search page into one post per channel card.
#[must_use]
pub fn parse_directory(html: &str) -> Vec<Post> {
    let doc = Html::parse_document(html);
    let card_sel = selector(r#"[class*="channel-card"], [class*="search-result"]"#);
    let link_sel = selector(r#"a[href*="t.me/"]"#);
    let name_sel = selector(r#"[class*="name"], h3, h4"#);
    let about_sel = selector(r#"[class*="description"], [class*="about"]"#);

    let mut posts: Vec<Post> = Vec::new();
    for card in doc.select(&card_sel) {
        let Some(username) =
            first_attr(&card, &link_sel, "href").and_then(|h| capture(&h, &CHANNEL_LINK_RE))
        else {
            continue;
        };
        if username == "s" || posts.iter().any(|p| p.platform_id == username) {
            continue;
        }
        let title = first_text(&card, &name_sel).unwrap_or_else(|| username.clone());
        let text = element_text(&card);

        let mut post = Post::new(
            Platform::Telegram,
            username.clone(),
            format!("{PUBLIC_URL}/{username}"),
        );
        post.content = first_text(&card, &about_sel).unwrap_or_else(|| title.clone());
        post.author_handle.clone_from(&username);
        post.author_display_name = Some(title.clone());
        post.views = first_metric(&text, &[&SUBSCRIBERS_RE]);
        post.title = Some(title);
        posts.push(post);
    }
    posts
}

/// Channel header of the preview page; `None` when the page has no channel header.
#[must_use]
pub fn parse_channel_info(html: &str, channel: &str, page_url: &str) -> Option<Profile> {
    let doc = Html::parse_document(html);
    let root = doc.root_element();
    let title_sel = selector(".tgme_channel_info_header_title");
    let description_sel = selector(".tgme_channel_info_description");
    let counter_sel = selector(".tgme_channel_info_counter");
    let value_sel = selector(".counter_value");
    let type_sel = selector(".counter_type");
    let photo_sel = selector(".tgme_page_photo_image img");

    let display_name = first_text(&root, &title_sel)?;

    let mut profile = Profile::new(Platform::Telegram, channel, format!("{PUBLIC_URL}/{channel}"));
    profile.display_name = display_name;
    profile.bio = first_text(&root, &description_sel);
    for counter in root.select(&counter_sel) {
        let value = first_text(&counter, &value_sel).and_then(|v| parse_abbreviated_number(&v));
        match first_text(&counter, &type_sel).as_deref() {
            Some(kind) if kind.starts_with("subscriber") || kind.starts_with("member") => {
                profile.follower_count = value;
            }
            Some(kind) if kind.starts_with("photo") || kind.starts_with("video") || kind.starts_with("link") => {
                profile.post_count = Some(profile.post_count.unwrap_or(0) + value.unwrap_or(0));
            }
            _ => {}
        }
    }
    profile.avatar_url = first_attr(&root, &photo_sel, "src").and_then(|s| absolutize(page_url, &s));
    Some(profile)
}
