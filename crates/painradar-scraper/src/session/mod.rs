//! Extraction sessions: one page driver, paced navigation and defensive extraction.
//!
//! A [`SessionPool`] hands out [`Session`]s, each holding a semaphore permit
//! so that no more than `max_concurrent` heavyweight drivers are alive at once.
//! A session must be closed with [`Session::close`]; dropping an open session
//! logs a warning and closes the driver on a background task.

#[cfg(feature = "browser")]
mod chrome;
mod driver;

use std::sync::Arc;
use std::time::{Duration, Instant};

use painradar_core::{DriverKind, RadarConfig};
use scraper::{Html, Selector};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::AcquireError;
use crate::extract::collapse_whitespace;

#[cfg(feature = "browser")]
pub use chrome::{ChromeDriver, ChromeDriverFactory};
pub use driver::{DriverFactory, HttpDriver, HttpDriverFactory, PageDriver};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub headless: bool,
    /// Applied to every individual driver call.
    pub timeout: Duration,
    /// Upper bound on scroll iterations per page.
    pub max_pages: usize,
    pub max_posts: usize,
    /// Minimum spacing between two navigations of the same session.
    pub inter_request_delay: Duration,
    pub scroll_pause: Duration,
    /// Wait after navigation before reading markup from a script-rendering driver.
    pub settle_delay: Duration,
    pub user_agent: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from(&RadarConfig::default())
    }
}

impl From<&RadarConfig> for SessionConfig {
    fn from(cfg: &RadarConfig) -> Self {
        Self {
            headless: cfg.headless,
            timeout: Duration::from_secs(cfg.timeout_secs),
            max_pages: cfg.max_pages,
            max_posts: cfg.max_posts,
            inter_request_delay: Duration::from_millis(cfg.inter_request_delay_ms),
            scroll_pause: Duration::from_millis(1_500),
            settle_delay: Duration::from_millis(2_000),
            user_agent: cfg.user_agent.clone(),
        }
    }
}

impl SessionConfig {
    /// Raises the inter-request delay to at least `floor` for slower sources.
    #[must_use]
    pub fn with_min_delay(mut self, floor: Duration) -> Self {
        if self.inter_request_delay < floor && !self.inter_request_delay.is_zero() {
            self.inter_request_delay = floor;
        }
        self
    }
}

#[derive(Clone)]
pub struct SessionPool {
    factory: Arc<dyn DriverFactory>,
    config: SessionConfig,
    permits: Arc<Semaphore>,
}

impl SessionPool {
    #[must_use]
    pub fn new(factory: Arc<dyn DriverFactory>, config: SessionConfig, max_concurrent: usize) -> Self {
        Self {
            factory,
            config,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Builds the pool for the driver selected in `cfg`.
    ///
    /// # Errors
    ///
    /// Returns [`AcquireError::Http`] if the HTTP client cannot be built, or
    /// [`AcquireError::Driver`] if the browser driver is requested but this
    /// build lacks the `browser` feature.
    pub fn from_config(cfg: &RadarConfig) -> Result<Self, AcquireError> {
        let config = SessionConfig::from(cfg);
        let factory: Arc<dyn DriverFactory> = match cfg.driver {
            DriverKind::Http => Arc::new(HttpDriverFactory::new(&config)?),
            #[cfg(feature = "browser")]
            DriverKind::Browser => Arc::new(ChromeDriverFactory),
            #[cfg(not(feature = "browser"))]
            DriverKind::Browser => {
                return Err(AcquireError::Driver(
                    "browser driver requested but the `browser` feature is not enabled".to_string(),
                ))
            }
        };
        Ok(Self::new(factory, config, cfg.max_concurrent_sessions))
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Sessions that could be opened right now without waiting.
    #[must_use]
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// # Errors
    ///
    /// See [`SessionPool::open_with`].
    pub async fn open(&self) -> Result<Session, AcquireError> {
        self.open_with(self.config.clone()).await
    }

    /// Waits for a free slot, then launches a driver with `config`.
    ///
    /// # Errors
    ///
    /// Returns [`AcquireError::PoolClosed`] if the semaphore was closed,
    /// [`AcquireError::Timeout`] if the launch exceeds the session timeout, or
    /// whatever the driver factory reports.
    pub async fn open_with(&self, config: SessionConfig) -> Result<Session, AcquireError> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| AcquireError::PoolClosed)?;
        let driver = tokio::time::timeout(config.timeout, self.factory.launch(&config))
            .await
            .map_err(|_| AcquireError::Timeout {
                operation: "launching the page driver".to_string(),
                secs: config.timeout.as_secs(),
            })??;
        Ok(Session::new(driver, config, Some(permit)))
    }
}

pub struct Session {
    driver: Option<Box<dyn PageDriver>>,
    config: SessionConfig,
    html: String,
    current_url: Option<String>,
    last_navigation: Option<Instant>,
    permit: Option<OwnedSemaphorePermit>,
}

impl Session {
    #[must_use]
    pub fn new(
        driver: Box<dyn PageDriver>,
        config: SessionConfig,
        permit: Option<OwnedSemaphorePermit>,
    ) -> Self {
        Self {
            driver: Some(driver),
            config,
            html: String::new(),
            current_url: None,
            last_navigation: None,
            permit,
        }
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Markup captured by the last navigation or scroll.
    #[must_use]
    pub fn html(&self) -> &str {
        &self.html
    }

    #[must_use]
    pub fn current_url(&self) -> Option<&str> {
        self.current_url.as_deref()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.driver.is_none()
    }

    fn timeout_error(&self, operation: String) -> AcquireError {
        AcquireError::Timeout {
            operation,
            secs: self.config.timeout.as_secs(),
        }
    }

    /// Navigates to `url`, honouring this session's inter-request delay.
    ///
    /// # Errors
    ///
    /// Returns [`AcquireError::SessionClosed`] after `close`,
    /// [`AcquireError::Timeout`] when the driver call exceeds the timeout,
    /// or the driver's own error.
    pub async fn navigate(&mut self, url: &str) -> Result<&str, AcquireError> {
        if self.driver.is_none() {
            return Err(AcquireError::SessionClosed);
        }
        if let Some(last) = self.last_navigation {
            let elapsed = last.elapsed();
            if elapsed < self.config.inter_request_delay {
                tokio::time::sleep(self.config.inter_request_delay - elapsed).await;
            }
        }
        self.last_navigation = Some(Instant::now());
        tracing::debug!(url, "navigating");

        let timeout = self.config.timeout;
        let driver = self.driver.as_mut().ok_or(AcquireError::SessionClosed)?;
        let html = match tokio::time::timeout(timeout, driver.goto(url)).await {
            Ok(result) => result?,
            Err(_) => return Err(self.timeout_error(format!("loading {url}"))),
        };
        self.html = html;
        self.current_url = Some(url.to_string());

        let settle = self.config.settle_delay;
        let driver = self.driver.as_mut().ok_or(AcquireError::SessionClosed)?;
        if driver.renders_scripts() && !settle.is_zero() {
            tokio::time::sleep(settle).await;
            match tokio::time::timeout(timeout, driver.content()).await {
                Ok(result) => self.html = result?,
                Err(_) => return Err(self.timeout_error(format!("reading {url}"))),
            }
        }
        Ok(&self.html)
    }

    /// Scrolls to the bottom up to `max_iterations` times, stopping early when
    /// the document stops growing. Returns the number of scrolls performed.
    ///
    /// Drivers that do not render scripts have nothing to reveal, so this is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the first driver or timeout error. Markup captured before the
    /// failure is kept.
    pub async fn wait_and_scroll(&mut self, max_iterations: usize) -> Result<usize, AcquireError> {
        let timeout = self.config.timeout;
        let pause = self.config.scroll_pause;
        let mut done = 0;
        for _ in 0..max_iterations {
            let driver = self.driver.as_mut().ok_or(AcquireError::SessionClosed)?;
            if !driver.renders_scripts() {
                break;
            }
            match tokio::time::timeout(timeout, driver.scroll_to_bottom()).await {
                Ok(result) => result?,
                Err(_) => return Err(self.timeout_error("scrolling".to_string())),
            }
            tokio::time::sleep(pause).await;
            let driver = self.driver.as_mut().ok_or(AcquireError::SessionClosed)?;
            let html = match tokio::time::timeout(timeout, driver.content()).await {
                Ok(result) => result?,
                Err(_) => return Err(self.timeout_error("reading scrolled page".to_string())),
            };
            done += 1;
            let grew = html.len() > self.html.len();
            self.html = html;
            if !grew {
                break;
            }
        }
        Ok(done)
    }

    /// Text of the first element matching `css` in the current document, if any.
    ///
    /// Invalid selectors and missing elements both yield `None`.
    #[must_use]
    pub fn safe_extract_text(&self, css: &str) -> Option<String> {
        let sel = Selector::parse(css).ok()?;
        let doc = Html::parse_document(&self.html);
        let text = doc
            .select(&sel)
            .map(|el| collapse_whitespace(&el.text().collect::<String>()))
            .find(|t| !t.is_empty());
        text
    }

    /// Attribute `name` of the first element matching `css` that carries it.
    #[must_use]
    pub fn safe_extract_attribute(&self, css: &str, name: &str) -> Option<String> {
        let sel = Selector::parse(css).ok()?;
        let doc = Html::parse_document(&self.html);
        let value = doc
            .select(&sel)
            .find_map(|el| el.value().attr(name).map(str::to_string));
        value
    }

    /// Closes the driver and releases the pool slot. Safe to call repeatedly.
    pub async fn close(&mut self) {
        if let Some(mut driver) = self.driver.take() {
            match tokio::time::timeout(self.config.timeout, driver.close()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!(error = %e, "driver close failed"),
                Err(_) => tracing::warn!("driver close timed out"),
            }
        }
        self.permit.take();
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(mut driver) = self.driver.take() {
            tracing::warn!(
                url = self.current_url.as_deref().unwrap_or(""),
                "session dropped without close; closing in background"
            );
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move {
                    if let Err(e) = driver.close().await {
                        tracing::debug!(error = %e, "background driver close failed");
                    }
                });
            }
        }
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
