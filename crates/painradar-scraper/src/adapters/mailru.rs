//! Otvet Mail.ru: question-and-answer threads; answer counts are reported as comments.

use std::sync::LazyLock;

use async_trait::async_trait;
use painradar_core::{AcquisitionResult, Platform, Post, Profile};
use regex::Regex;
use scraper::{ElementRef, Html};

use super::{
    post_from_hit, run_listing, run_profile, search_via_web, AdapterContext, Listing,
    PlatformAdapter,
};
use crate::extract::{
    absolutize, capture, element_text, first_attr, first_metric, first_text, len_within,
    normalize_url, selector, SeenUrls,
};
use crate::web_search::SearchHit;

pub const BASE_URL: &str = "https://otvet.mail.ru";
const DOMAIN: &str = "otvet.mail.ru";

static QUESTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/question/(\d+)").expect("valid mailru question regex"));
static ANSWERS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*ответ").expect("valid mailru answers regex"));
static QUESTIONS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*вопрос").expect("valid mailru questions regex"));

pub struct MailRuAdapter {
    ctx: AdapterContext,
    base_url: String,
}

impl MailRuAdapter {
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
                platform: Platform::MailRu,
                operation,
                urls,
                config: self.ctx.session_config(),
            },
            parse_question_list,
        )
        .await
    }
}

#[async_trait]
impl PlatformAdapter for MailRuAdapter {
    fn platform(&self) -> Platform {
        Platform::MailRu
    }

    /// The front page layout moves around; the older popular sections are tried after it.
    async fn fetch_trending(&self) -> AcquisitionResult {
        let urls = ["/", "/hot/", "/bestquestions/"]
            .iter()
            .map(|path| format!("{}{path}", self.base_url))
            .collect();
        self.listing("trending", urls).await
    }

    async fn fetch_by_search(&self, query: &str) -> AcquisitionResult {
        search_via_web(
            &self.ctx.search,
            Platform::MailRu,
            DOMAIN,
            query,
            self.ctx.max_posts(),
            post_from_search_hit,
        )
        .await
    }

    /// `user_id` is the numeric id from `/profile/id<digits>/`.
    async fn fetch_profile(&self, user_id: &str) -> Option<Profile> {
        let user_id = user_id.trim_start_matches("id").to_string();
        let url = format!("{}/profile/id{user_id}/", self.base_url);
        run_profile(
            &self.ctx.pool,
            Platform::MailRu,
            self.ctx.session_config(),
            &url,
            move |html, page_url| parse_profile(html, &user_id, page_url),
        )
        .await
    }

    async fn fetch_by_category(&self, category: &str) -> AcquisitionResult {
        let url = format!("{}/questions/{}/", self.base_url, category.trim_matches('/'));
        let mut result = self.listing(&format!("category '{category}'"), vec![url]).await;
        for post in &mut result.posts {
            post.category = Some(category.to_string());
        }
        result
    }
}

fn post_from_search_hit(hit: &SearchHit) -> Option<Post> {
    let id = capture(&hit.url, &QUESTION_RE)?;
    let mut post = post_from_hit(Platform::MailRu, hit, id, String::new());
    post.comments = first_metric(&hit.snippet, &[&ANSWERS_RE]);
    Some(post)
}

fn is_navigation(title: &str) -> bool {
    (title.contains("Ответы") && title.chars().count() < 20)
        || title.chars().all(|c| c.is_ascii_digit())
}

/// Parses any page linking to `/question/<id>` threads.
#[must_use]
pub fn parse_question_list(html: &str, page_url: &str) -> Vec<Post> {
    let doc = Html::parse_document(html);
    let link_sel = selector("a[href]");
    let question_sel = selector(r#"a[href*="/question/"]"#);

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
        let Some(id) = capture(&url, &QUESTION_RE) else {
            continue;
        };
        let title = element_text(&link);
        if !len_within(&title, 15, 500) || is_navigation(&title) || !seen.admit(&url) {
            continue;
        }

        // Nearest ancestor mentioning answers, without spilling into a neighbouring card.
        let answers = link
            .ancestors()
            .filter_map(ElementRef::wrap)
            .take(5)
            .take_while(|el| el.select(&question_sel).count() <= 1)
            .map(|el| element_text(&el))
            .find(|text| text.contains("ответ"))
            .and_then(|text| first_metric(&text, &[&ANSWERS_RE]));

        let mut post = Post::new(Platform::MailRu, id, url);
        post.comments = Some(answers.unwrap_or(0));
        post.content.clone_from(&title);
        post.title = Some(title);
        posts.push(post);
    }
    posts
}

/// The profile post count is questions plus answers.
#[must_use]
pub fn parse_profile(html: &str, user_id: &str, page_url: &str) -> Option<Profile> {
    let doc = Html::parse_document(html);
    let root = doc.root_element();
    let name_sel = selector(r#"[class*="profile-name"], h1"#);
    let avatar_sel = selector(r#"[class*="avatar"] img"#);

    let display_name = first_text(&root, &name_sel)?;
    let text = element_text(&root);
    let questions = first_metric(&text, &[&QUESTIONS_RE]).unwrap_or(0);
    let answers = first_metric(&text, &[&ANSWERS_RE]).unwrap_or(0);

    let mut profile = Profile::new(Platform::MailRu, user_id, page_url);
    profile.display_name = display_name;
    profile.post_count = Some(questions + answers);
    profile.avatar_url = first_attr(&root, &avatar_sel, "src").and_then(|s| absolutize(page_url, &s));
    Some(profile)
}
