//! Integration tests for `Summarizer` using wiremock HTTP mocks.

use painradar_core::config::build_config;
use painradar_core::{Platform, Post};
use painradar_insight::{InsightError, Summarizer};
use painradar_signals::{ScoredPost, Scorer};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ANALYSIS: &str = r#"{"summary":"Couriers lose parcels.","categories":[{"name":"Delivery","count":2,"examples":["parcel lost"]}],"topInsights":["Tracking is unreliable"],"recommendations":["Refund faster"]}"#;

fn summarizer(server: &MockServer, models: &[&str]) -> Summarizer {
    Summarizer::with_base_url(
        "test-key",
        models.iter().map(|m| (*m).to_string()).collect(),
        5,
        &format!("{}/api/v1/chat/completions", server.uri()),
    )
    .expect("client construction should not fail")
}

fn posts() -> Vec<ScoredPost> {
    let scorer = Scorer::default();
    ["My parcel was lost again", "Courier never showed up, terrible service"]
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let mut post = Post::new(Platform::Vc, i.to_string(), format!("https://vc.ru/{i}"));
            post.content = (*text).to_string();
            post.likes = Some(10);
            scorer.score(post)
        })
        .collect()
}

fn completion(content: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "gen-1",
        "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }]
    })
}

#[tokio::test]
async fn falls_back_to_next_model_after_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/chat/completions"))
        .and(body_partial_json(serde_json::json!({ "model": "first/model" })))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream overloaded"))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(serde_json::json!({
            "model": "second/model",
            "temperature": 0.3,
            "max_tokens": 1500
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(ANALYSIS)))
        .expect(1)
        .mount(&server)
        .await;

    let report = summarizer(&server, &["first/model", "second/model"])
        .summarize("couriers", &posts())
        .await
        .expect("second model should answer");

    assert!(report.structured);
    assert_eq!(report.model.as_deref(), Some("second/model"));
    assert_eq!(report.topic, "couriers");
    assert_eq!(report.summary, "Couriers lose parcels.");
    assert_eq!(report.categories[0].count, 2);
    assert_eq!(report.top_insights, vec!["Tracking is unreliable"]);
}

#[tokio::test]
async fn fenced_reply_is_parsed() {
    let server = MockServer::start().await;
    let fenced = format!("```json\n{ANALYSIS}\n```");

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(&fenced)))
        .mount(&server)
        .await;

    let report = summarizer(&server, &["only/model"])
        .summarize("couriers", &posts())
        .await
        .unwrap();

    assert!(report.structured);
    assert_eq!(report.recommendations, vec!["Refund faster"]);
}

#[tokio::test]
async fn free_text_reply_degrades() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion("People mostly complain about late couriers.")),
        )
        .mount(&server)
        .await;

    let report = summarizer(&server, &["only/model"])
        .summarize("couriers", &posts())
        .await
        .unwrap();

    assert!(!report.structured);
    assert_eq!(report.summary, "People mostly complain about late couriers.");
    assert!(report.categories.is_empty());
    assert_eq!(report.model.as_deref(), Some("only/model"));
}

#[tokio::test]
async fn every_model_failing_lists_each_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let err = summarizer(&server, &["a/1", "b/2", "c/3"])
        .summarize("couriers", &posts())
        .await
        .unwrap_err();

    match err {
        InsightError::AllModelsFailed { errors } => {
            assert_eq!(errors.len(), 3);
            assert!(errors[0].starts_with("a/1: "));
            assert!(errors[2].contains("503"));
        }
        other => panic!("expected AllModelsFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn unauthorized_model_falls_through_to_next() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_partial_json(serde_json::json!({ "model": "a/1" })))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(body_partial_json(serde_json::json!({ "model": "b/2" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(ANALYSIS)))
        .expect(1)
        .mount(&server)
        .await;

    let report = summarizer(&server, &["a/1", "b/2"])
        .summarize("couriers", &posts())
        .await
        .unwrap();

    assert_eq!(report.model.as_deref(), Some("b/2"));
    assert_eq!(report.summary, "Couriers lose parcels.");
}

#[tokio::test]
async fn unauthorized_on_every_model_lists_each_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
        .expect(2)
        .mount(&server)
        .await;

    let err = summarizer(&server, &["a/1", "b/2"])
        .summarize("couriers", &posts())
        .await
        .unwrap_err();

    match err {
        InsightError::AllModelsFailed { errors } => {
            assert_eq!(errors.len(), 2);
            assert!(errors[0].starts_with("a/1: "));
            assert!(errors[1].contains("401"));
        }
        other => panic!("expected AllModelsFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn empty_posts_make_no_request() {
    let server = MockServer::start().await;

    let report = summarizer(&server, &["a/1"])
        .summarize("couriers", &[])
        .await
        .unwrap();

    assert_eq!(report.summary, "No data to analyze.");
    assert!(report.model.is_none());
    let requests = server.received_requests().await.unwrap_or_default();
    assert!(requests.is_empty());
}

#[test]
fn from_config_requires_api_key() {
    let without_key = build_config(|_| Err(std::env::VarError::NotPresent)).unwrap();
    assert!(Summarizer::from_config(&without_key).is_none());

    let with_key = build_config(|key| match key {
        "OPENROUTER_API_KEY" => Ok("sk-test".to_string()),
        _ => Err(std::env::VarError::NotPresent),
    })
    .unwrap();
    let summarizer = Summarizer::from_config(&with_key).expect("key is set");
    assert_eq!(summarizer.models().len(), 4);
}
