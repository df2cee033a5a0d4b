use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::AcquireError;
use crate::session::SessionConfig;

/// One live page: navigation, scrolling and markup snapshots.
///
/// Implementations do no pacing or timeout handling of their own; the owning
/// [`crate::Session`] wraps every call.
#[async_trait]
pub trait PageDriver: Send {
    /// Loads `url` and returns the resulting document markup.
    async fn goto(&mut self, url: &str) -> Result<String, AcquireError>;

    /// Scrolls the viewport to the bottom of the document.
    async fn scroll_to_bottom(&mut self) -> Result<(), AcquireError>;

    /// Current document markup.
    async fn content(&mut self) -> Result<String, AcquireError>;

    /// Whether the page executes scripts, so waiting and scrolling reveal more content.
    fn renders_scripts(&self) -> bool;

    async fn close(&mut self) -> Result<(), AcquireError>;
}

/// Produces a fresh [`PageDriver`] per session.
#[async_trait]
pub trait DriverFactory: Send + Sync {
    async fn launch(&self, config: &SessionConfig) -> Result<Box<dyn PageDriver>, AcquireError>;
}

/// Driver for server-rendered pages over plain HTTP.
///
/// Handles rate limiting (429), not-found (404) and other non-2xx responses
/// as typed errors.
pub struct HttpDriver {
    client: Client,
    body: String,
}

#[async_trait]
impl PageDriver for HttpDriver {
    async fn goto(&mut self, url: &str) -> Result<String, AcquireError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(60);
            let domain = response.url().host_str().unwrap_or(url).to_string();
            return Err(AcquireError::RateLimited {
                domain,
                retry_after_secs,
            });
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(AcquireError::NotFound {
                url: url.to_string(),
            });
        }
        if !status.is_success() {
            return Err(AcquireError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        self.body = response.text().await?;
        Ok(self.body.clone())
    }

    async fn scroll_to_bottom(&mut self) -> Result<(), AcquireError> {
        Ok(())
    }

    async fn content(&mut self) -> Result<String, AcquireError> {
        Ok(self.body.clone())
    }

    fn renders_scripts(&self) -> bool {
        false
    }

    async fn close(&mut self) -> Result<(), AcquireError> {
        self.body.clear();
        Ok(())
    }
}

/// Hands out [`HttpDriver`]s sharing one connection pool.
#[derive(Clone)]
pub struct HttpDriverFactory {
    client: Client,
}

impl HttpDriverFactory {
    /// Builds the shared client with the session timeout and `User-Agent`.
    ///
    /// # Errors
    ///
    /// Returns [`AcquireError::Http`] if the `reqwest::Client` cannot be constructed.
    pub fn new(config: &SessionConfig) -> Result<Self, AcquireError> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            reqwest::header::HeaderValue::from_static("ru-RU,ru;q=0.9,en;q=0.8"),
        );
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl DriverFactory for HttpDriverFactory {
    async fn launch(&self, _config: &SessionConfig) -> Result<Box<dyn PageDriver>, AcquireError> {
        Ok(Box::new(HttpDriver {
            client: self.client.clone(),
            body: String::new(),
        }))
    }
}
