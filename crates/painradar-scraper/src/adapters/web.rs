//! The open web through Google Custom Search. Only search is offered, and only
//! when credentials are configured.

use std::time::Instant;

use async_trait::async_trait;
use painradar_core::{AcquisitionResult, Platform, Profile};

use super::{post_from_hit, AdapterContext, PlatformAdapter};
use crate::error::AcquireError;
use crate::extract::normalize_url;

const MISSING_CREDENTIALS: &str = "GOOGLE_API_KEY/GOOGLE_SEARCH_ENGINE_ID not configured";

pub struct WebAdapter {
    ctx: AdapterContext,
}

impl WebAdapter {
    #[must_use]
    pub fn new(ctx: AdapterContext) -> Self {
        Self { ctx }
    }
}

fn host_of(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
        .unwrap_or_default()
}

#[async_trait]
impl PlatformAdapter for WebAdapter {
    fn platform(&self) -> Platform {
        Platform::Web
    }

    async fn fetch_trending(&self) -> AcquisitionResult {
        AcquisitionResult::failed(Platform::Web, "the web has no trending feed; use search")
    }

    async fn fetch_by_search(&self, query: &str) -> AcquisitionResult {
        if !self.ctx.search.has_credentials() {
            let err = AcquireError::SearchDisabled(MISSING_CREDENTIALS.to_string());
            tracing::warn!(error = %err, "web search skipped");
            return AcquisitionResult::failed(Platform::Web, err.to_string());
        }
        let started = Instant::now();
        let mut result = AcquisitionResult::new(Platform::Web);
        match self.ctx.search.search(query).await {
            Ok(hits) => {
                result.posts = hits
                    .iter()
                    .map(|hit| {
                        let url = normalize_url(&hit.url);
                        post_from_hit(Platform::Web, hit, url, host_of(&hit.url))
                    })
                    .take(self.ctx.max_posts())
                    .collect();
                tracing::info!(query, posts = result.posts.len(), "web search collected");
            }
            Err(e) => {
                tracing::warn!(query, error = %e, "web search failed");
                result.push_error(format!("search '{query}': {e}"));
            }
        }
        result.finish(started)
    }

    async fn fetch_profile(&self, _handle: &str) -> Option<Profile> {
        None
    }
}
