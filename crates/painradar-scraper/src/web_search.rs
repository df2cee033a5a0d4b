//! General web search, used as the `site:` fallback for sources without a
//! usable native search and as the backend of the `web` platform.
//!
//! Google Custom Search is used when credentials are configured; otherwise
//! the DuckDuckGo HTML endpoint is scraped through a regular session.

use painradar_core::RadarConfig;
use scraper::Html;
use serde::Deserialize;

use crate::error::AcquireError;
use crate::extract::{collapse_whitespace, element_text, encode_query, first_text, selector};
use crate::session::SessionPool;

pub const GOOGLE_CSE_ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";
pub const DUCKDUCKGO_ENDPOINT: &str = "https://html.duckduckgo.com/html/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub url: String,
    pub title: String,
    pub snippet: String,
}

#[derive(Clone)]
pub enum SearchBackend {
    Google {
        client: reqwest::Client,
        api_key: String,
        engine_id: String,
        endpoint: String,
    },
    DuckDuckGo {
        endpoint: String,
    },
}

impl std::fmt::Debug for SearchBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchBackend::Google { endpoint, .. } => f
                .debug_struct("Google")
                .field("api_key", &"[redacted]")
                .field("endpoint", endpoint)
                .finish_non_exhaustive(),
            SearchBackend::DuckDuckGo { endpoint } => f
                .debug_struct("DuckDuckGo")
                .field("endpoint", endpoint)
                .finish(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GoogleResponse {
    #[serde(default)]
    items: Vec<GoogleItem>,
}

#[derive(Debug, Deserialize)]
struct GoogleItem {
    link: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    snippet: String,
}

#[derive(Clone)]
pub struct SiteSearch {
    backend: SearchBackend,
    pool: SessionPool,
}

impl SiteSearch {
    #[must_use]
    pub fn duckduckgo(pool: SessionPool) -> Self {
        Self {
            backend: SearchBackend::DuckDuckGo {
                endpoint: DUCKDUCKGO_ENDPOINT.to_string(),
            },
            pool,
        }
    }

    /// # Errors
    ///
    /// Returns [`AcquireError::Http`] if the HTTP client cannot be built.
    pub fn google(pool: SessionPool, api_key: &str, engine_id: &str) -> Result<Self, AcquireError> {
        let client = reqwest::Client::builder()
            .timeout(pool.config().timeout)
            .build()?;
        Ok(Self {
            backend: SearchBackend::Google {
                client,
                api_key: api_key.to_string(),
                engine_id: engine_id.to_string(),
                endpoint: GOOGLE_CSE_ENDPOINT.to_string(),
            },
            pool,
        })
    }

    /// Picks Google when both credentials are present, DuckDuckGo otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`AcquireError::Http`] if the Google HTTP client cannot be built.
    pub fn from_config(cfg: &RadarConfig, pool: SessionPool) -> Result<Self, AcquireError> {
        match cfg.google_credentials() {
            Some((key, cx)) => Self::google(pool, key, cx),
            None => Ok(Self::duckduckgo(pool)),
        }
    }

    /// Overrides the backend endpoint, for tests against a mock server.
    #[must_use]
    pub fn with_endpoint(mut self, url: &str) -> Self {
        match &mut self.backend {
            SearchBackend::Google { endpoint, .. } | SearchBackend::DuckDuckGo { endpoint } => {
                *endpoint = url.to_string();
            }
        }
        self
    }

    /// Whether the paid, credentialed backend is in use.
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        matches!(self.backend, SearchBackend::Google { .. })
    }

    /// Searches `query` restricted to `domain`.
    ///
    /// # Errors
    ///
    /// See [`SiteSearch::search`].
    pub async fn search_site(&self, query: &str, domain: &str) -> Result<Vec<SearchHit>, AcquireError> {
        self.search(&format!("{query} site:{domain}")).await
    }

    /// # Errors
    ///
    /// Returns HTTP, status, timeout or session errors from the backend.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchHit>, AcquireError> {
        match &self.backend {
            SearchBackend::Google {
                client,
                api_key,
                engine_id,
                endpoint,
            } => search_google(client, endpoint, api_key, engine_id, query).await,
            SearchBackend::DuckDuckGo { endpoint } => {
                let url = format!("{endpoint}?q={}", encode_query(query));
                let mut session = self.pool.open().await?;
                let loaded = session.navigate(&url).await.map(|_| ());
                let hits = loaded.map(|()| parse_duckduckgo(session.html()));
                session.close().await;
                hits
            }
        }
    }
}

async fn search_google(
    client: &reqwest::Client,
    endpoint: &str,
    api_key: &str,
    engine_id: &str,
    query: &str,
) -> Result<Vec<SearchHit>, AcquireError> {
    let response = client
        .get(endpoint)
        .query(&[
            ("key", api_key),
            ("cx", engine_id),
            ("q", query),
            ("num", "10"),
            ("start", "1"),
        ])
        .send()
        .await?;
    let status = response.status();
    if !status.is_success() {
        return Err(AcquireError::UnexpectedStatus {
            status: status.as_u16(),
            url: endpoint.to_string(),
        });
    }
    let body = response.text().await?;
    let parsed: GoogleResponse =
        serde_json::from_str(&body).map_err(|source| AcquireError::Deserialize {
            context: "google custom search response".to_string(),
            source,
        })?;
    Ok(parsed
        .items
        .into_iter()
        .map(|item| SearchHit {
            url: item.link,
            title: collapse_whitespace(&item.title),
            snippet: collapse_whitespace(&item.snippet),
        })
        .collect())
}

/// Unwraps DuckDuckGo's `/l/?uddg=` redirect links to the target URL.
fn unwrap_redirect(href: &str) -> Option<String> {
    let absolute = if href.starts_with("//") {
        format!("https:{href}")
    } else if href.starts_with('/') {
        format!("https://duckduckgo.com{href}")
    } else {
        href.to_string()
    };
    let parsed = reqwest::Url::parse(&absolute).ok()?;
    if let Some((_, target)) = parsed.query_pairs().find(|(k, _)| k == "uddg") {
        return Some(target.into_owned());
    }
    matches!(parsed.scheme(), "http" | "https").then_some(absolute)
}

/// Extracts result links and snippets from a DuckDuckGo HTML results page.
#[must_use]
pub fn parse_duckduckgo(html: &str) -> Vec<SearchHit> {
    let doc = Html::parse_document(html);
    let result_sel = selector(".result");
    let link_sel = selector("a.result__a");
    let snippet_sel = selector(".result__snippet");

    let mut hits: Vec<SearchHit> = Vec::new();
    for result in doc.select(&result_sel) {
        let Some(link) = result.select(&link_sel).next() else {
            continue;
        };
        let Some(url) = link.value().attr("href").and_then(unwrap_redirect) else {
            continue;
        };
        if hits.iter().any(|h| h.url == url) {
            continue;
        }
        hits.push(SearchHit {
            url,
            title: element_text(&link),
            snippet: first_text(&result, &snippet_sel).unwrap_or_default(),
        });
    }
    hits
}
