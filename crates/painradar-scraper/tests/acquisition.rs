//! Integration tests for adapters, mirror rotation and the orchestrator.
//!
//! Every source is served by a local `wiremock` server; the adapters are
//! pointed at it through their base-URL constructors, so no real network
//! traffic is made.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use painradar_core::config::build_config;
use painradar_core::{AcquisitionResult, Platform, Profile, Target};
use painradar_scraper::adapters::{
    HabrAdapter, PikabuAdapter, TelegramAdapter, WebAdapter, XAdapter, ZenAdapter,
};
use painradar_scraper::{
    AcquireError, AdapterContext, AdapterRegistry, DriverFactory, HttpDriverFactory, Orchestrator,
    PageDriver, PlatformAdapter, SessionConfig, SessionPool, SiteSearch,
};

fn test_config() -> SessionConfig {
    SessionConfig {
        timeout: Duration::from_secs(5),
        max_pages: 1,
        max_posts: 20,
        inter_request_delay: Duration::ZERO,
        scroll_pause: Duration::ZERO,
        settle_delay: Duration::ZERO,
        ..SessionConfig::default()
    }
}

fn test_pool() -> SessionPool {
    let config = test_config();
    let factory = HttpDriverFactory::new(&config).expect("failed to build test HTTP driver");
    SessionPool::new(Arc::new(factory), config, 3)
}

fn test_ctx() -> AdapterContext {
    let pool = test_pool();
    let search = SiteSearch::duckduckgo(pool.clone());
    AdapterContext::new(pool, search)
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html; charset=utf-8")
        .set_body_string(body.to_string())
}

const HABR_FEED: &str = r#"<html><body>
  <article class="tm-articles-list__item">
    <a class="tm-user-info__username" href="/ru/users/bob/">bob</a>
    <h2 class="tm-title"><a class="tm-title__link" href="/ru/articles/900001/"><span>Как мы устали от флапающих тестов</span></a></h2>
    <span class="tm-votes-meter__value">+18</span>
    <span class="tm-article-comments-counter-link__value">9</span>
  </article>
</body></html>"#;

const NITTER_TIMELINE: &str = r#"<html><body><div class="timeline">
  <div class="timeline-item">
    <a class="tweet-link" href="/ops_team/status/1800000000000000002#m"></a>
    <a class="fullname" href="/ops_team">Ops Team</a>
    <a class="username" href="/ops_team">@ops_team</a>
    <div class="tweet-content">Deploys keep failing because the registry rate limits us</div>
    <span class="tweet-stat"><span class="icon-heart"></span> 40</span>
  </div>
</div></body></html>"#;

// ---------------------------------------------------------------------------
// Adapters over HTTP
// ---------------------------------------------------------------------------

#[tokio::test]
async fn habr_search_collects_posts_from_server() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ru/search/"))
        .and(query_param("q", "флапающие тесты"))
        .respond_with(html(HABR_FEED))
        .mount(&server)
        .await;

    let adapter = HabrAdapter::with_base_url(test_ctx(), &server.uri());
    let result = adapter.fetch_by_search("флапающие тесты").await;

    assert!(result.success, "expected success, got errors: {:?}", result.errors);
    assert!(result.errors.is_empty());
    assert_eq!(result.posts.len(), 1);
    assert_eq!(result.posts[0].platform_id, "900001");
    assert_eq!(result.posts[0].likes, Some(18));
    assert_eq!(result.stats.posts_found, 1);
}

#[tokio::test]
async fn not_found_page_yields_failed_result_with_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/hot"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let adapter = PikabuAdapter::with_base_url(test_ctx(), &server.uri());
    let result = adapter.fetch_trending().await;

    assert!(!result.success);
    assert!(result.posts.is_empty());
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("not found"), "got: {}", result.errors[0]);
}

#[tokio::test]
async fn missing_profile_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ru/users/ghost/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let adapter = HabrAdapter::with_base_url(test_ctx(), &server.uri());
    assert!(adapter.fetch_profile("ghost").await.is_none());
}

#[tokio::test]
async fn telegram_channel_is_read_from_preview_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/s/support_chat"))
        .respond_with(html(
            r#"<div class="tgme_widget_message" data-post="support_chat/7">
                 <div class="tgme_widget_message_text">Приложение вылетает при входе через Госуслуги</div>
                 <span class="tgme_widget_message_views">1.5K</span>
               </div>"#,
        ))
        .mount(&server)
        .await;

    let adapter = TelegramAdapter::with_base_url(test_ctx(), &format!("{}/s", server.uri()));
    let result = adapter.fetch_by_channel("@support_chat").await;

    assert!(result.success);
    assert_eq!(result.posts.len(), 1);
    assert_eq!(result.posts[0].url, "https://t.me/support_chat/7");
    assert_eq!(result.posts[0].views, Some(1_500));

    let trending = adapter.fetch_trending().await;
    assert!(!trending.success);
    assert_eq!(trending.errors.len(), 1);
}

#[tokio::test]
async fn zen_search_goes_through_web_search_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/html/"))
        .and(query_param("q", "не работает site:dzen.ru"))
        .respond_with(html(
            r#"<div class="result">
                 <a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fdzen.ru%2Fa%2FZq1">Не работает оплата</a>
                 <a class="result__snippet">Третий день не могу оплатить заказ</a>
               </div>
               <div class="result"><a class="result__a" href="https://dzen.ru/channel">Канал</a></div>"#,
        ))
        .mount(&server)
        .await;

    let pool = test_pool();
    let search = SiteSearch::duckduckgo(pool.clone()).with_endpoint(&format!("{}/html/", server.uri()));
    let adapter = ZenAdapter::new(AdapterContext::new(pool, search));
    let result = adapter.fetch_by_search("не работает").await;

    assert!(result.success, "errors: {:?}", result.errors);
    assert_eq!(result.posts.len(), 1);
    assert_eq!(result.posts[0].platform_id, "Zq1");
    assert_eq!(result.posts[0].content, "Третий день не могу оплатить заказ");
}

#[tokio::test]
async fn web_adapter_without_credentials_reports_disabled_search() {
    let adapter = WebAdapter::new(test_ctx());
    let result = adapter.fetch_by_search("anything").await;

    assert!(!result.success);
    assert!(result.posts.is_empty());
    assert!(result.errors[0].contains("not configured"), "got: {}", result.errors[0]);
}

#[tokio::test]
async fn web_adapter_uses_google_custom_search() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/customsearch/v1"))
        .and(query_param("key", "test-key"))
        .and(query_param("cx", "test-cx"))
        .and(query_param("q", "invoice software pain"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&json!({
            "items": [
                {"link": "https://www.forum.test/t/1?ref=x", "title": "Invoices keep failing", "snippet": "Every month the export breaks."},
                {"link": "https://blog.test/post", "title": "Billing woes"}
            ]
        })))
        .mount(&server)
        .await;

    let pool = test_pool();
    let search = SiteSearch::google(pool.clone(), "test-key", "test-cx")
        .expect("failed to build search client")
        .with_endpoint(&format!("{}/customsearch/v1", server.uri()));
    let adapter = WebAdapter::new(AdapterContext::new(pool, search));
    let result = adapter.fetch_by_search("invoice software pain").await;

    assert!(result.success, "errors: {:?}", result.errors);
    assert_eq!(result.posts.len(), 2);
    assert_eq!(result.posts[0].url, "https://www.forum.test/t/1?ref=x");
    assert_eq!(result.posts[0].platform_id, "https://www.forum.test/t/1");
    assert_eq!(result.posts[0].author_handle, "forum.test");
    assert_eq!(result.posts[1].content, "Billing woes");
}

// ---------------------------------------------------------------------------
// Mirror rotation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn x_search_rotates_past_failing_mirror() {
    let broken = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(html(r#"<div class="error-panel"><span>Instance has been rate limited.</span></div>"#))
        .mount(&broken)
        .await;
    let working = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("f", "tweets"))
        .respond_with(html(NITTER_TIMELINE))
        .mount(&working)
        .await;

    let ctx = test_ctx().with_x_mirrors(vec![broken.uri(), working.uri()]);
    let adapter = XAdapter::new(ctx);
    let result = adapter.fetch_by_search("registry rate limit").await;

    assert!(result.success);
    assert_eq!(result.posts.len(), 1);
    assert_eq!(result.posts[0].author_handle, "ops_team");
    assert_eq!(result.posts[0].likes, Some(40));
    assert_eq!(result.errors.len(), 1, "one error per failed mirror");
    assert!(result.errors[0].contains(&broken.uri()));
    assert_eq!(adapter.router().current(), Some(working.uri().as_str()));
}

#[tokio::test]
async fn x_search_fails_when_every_mirror_fails() {
    let first = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&first)
        .await;
    let second = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(html("<html><body>Maintenance</body></html>"))
        .mount(&second)
        .await;

    let ctx = test_ctx().with_x_mirrors(vec![first.uri(), second.uri()]);
    let result = XAdapter::new(ctx).fetch_by_search("anything").await;

    assert!(!result.success);
    assert!(result.posts.is_empty());
    assert_eq!(result.errors.len(), 2);
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

#[tokio::test]
async fn orchestrator_isolates_failing_platform() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ru/articles/top/daily/"))
        .respond_with(html(HABR_FEED))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/hot"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let base = server.uri();
    let habr_base = base.clone();
    let mut registry = AdapterRegistry::empty();
    registry
        .register(Platform::Habr, move |ctx| {
            Box::new(HabrAdapter::with_base_url(ctx.clone(), &habr_base))
        })
        .register(Platform::Pikabu, move |ctx| {
            Box::new(PikabuAdapter::with_base_url(ctx.clone(), &base))
        });
    let orchestrator = Orchestrator::new(registry, test_ctx());

    let results = orchestrator
        .fetch_trending(&[Target::One(Platform::Habr), Target::One(Platform::Pikabu)])
        .await;

    assert_eq!(results.len(), 2);
    let habr = &results[&Platform::Habr];
    assert!(habr.success);
    assert_eq!(habr.posts.len(), 1);
    let pikabu = &results[&Platform::Pikabu];
    assert!(!pikabu.success);
    assert!(pikabu.errors[0].contains("500"), "got: {}", pikabu.errors[0]);
}

#[tokio::test]
async fn orchestrator_reports_unregistered_platform() {
    let orchestrator = Orchestrator::new(AdapterRegistry::empty(), test_ctx());
    let results = orchestrator
        .fetch_by_search("anything", &[Target::One(Platform::Vc), Target::One(Platform::Vc)])
        .await;

    assert_eq!(results.len(), 1, "duplicate targets collapse");
    let vc = &results[&Platform::Vc];
    assert!(!vc.success);
    assert_eq!(vc.errors, vec!["unknown platform".to_string()]);
}

#[tokio::test]
async fn orchestrator_expands_all_to_default_platforms() {
    let orchestrator = Orchestrator::new(AdapterRegistry::empty(), test_ctx())
        .with_default_platforms(vec![Platform::Habr, Platform::X]);
    let results = orchestrator
        .fetch_trending(&[Target::All, Target::One(Platform::Habr)])
        .await;

    let platforms: Vec<Platform> = results.keys().copied().collect();
    assert_eq!(platforms, vec![Platform::Habr, Platform::X]);
}

struct ProfileStub {
    platform: Platform,
}

#[async_trait]
impl PlatformAdapter for ProfileStub {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn fetch_trending(&self) -> AcquisitionResult {
        AcquisitionResult::new(self.platform)
    }

    async fn fetch_by_search(&self, _query: &str) -> AcquisitionResult {
        AcquisitionResult::new(self.platform)
    }

    async fn fetch_profile(&self, handle: &str) -> Option<Profile> {
        if self.platform == Platform::Vc {
            panic!("profile parser blew up");
        }
        Some(Profile::new(
            self.platform,
            handle,
            format!("https://habr.com/ru/users/{handle}/"),
        ))
    }
}

#[tokio::test]
async fn panicking_profile_adapter_yields_none() {
    let mut registry = AdapterRegistry::empty();
    registry
        .register(Platform::Habr, |_| {
            Box::new(ProfileStub {
                platform: Platform::Habr,
            })
        })
        .register(Platform::Vc, |_| {
            Box::new(ProfileStub {
                platform: Platform::Vc,
            })
        });
    let orchestrator = Orchestrator::new(registry, test_ctx());

    assert!(orchestrator.fetch_profile("alice", Platform::Vc).await.is_none());

    let profiles = orchestrator
        .fetch_profiles(&[
            ("alice".to_string(), Platform::Vc),
            ("bob".to_string(), Platform::Habr),
        ])
        .await;
    assert_eq!(profiles.len(), 1);
    assert_eq!(profiles[0].handle, "bob");
}

#[test]
fn context_from_config_carries_retry_backoff() {
    let cfg = build_config(|key| match key {
        "PAIN_RADAR_RETRY_BACKOFF_MS" => Ok("250".to_string()),
        _ => Err(std::env::VarError::NotPresent),
    })
    .expect("valid config");
    let ctx = AdapterContext::from_config(&cfg).expect("context builds");
    assert_eq!(ctx.mirror_backoff_ms, 250);

    assert_eq!(test_ctx().mirror_backoff_ms, 0);
    assert_eq!(test_ctx().with_mirror_backoff_ms(40).mirror_backoff_ms, 40);
}

// ---------------------------------------------------------------------------
// Session failures
// ---------------------------------------------------------------------------

struct BrokenFactory;

#[async_trait]
impl DriverFactory for BrokenFactory {
    async fn launch(&self, _config: &SessionConfig) -> Result<Box<dyn PageDriver>, AcquireError> {
        Err(AcquireError::Driver("browser binary not found".to_string()))
    }
}

#[tokio::test]
async fn session_launch_failure_becomes_failed_result() {
    let pool = SessionPool::new(Arc::new(BrokenFactory), test_config(), 1);
    let ctx = AdapterContext::new(pool.clone(), SiteSearch::duckduckgo(pool));
    let adapter = HabrAdapter::new(ctx);

    let result = adapter.fetch_trending().await;

    assert!(!result.success);
    assert!(result.posts.is_empty());
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("browser binary not found"));
    assert!(adapter.fetch_profile("anyone").await.is_none());
}
