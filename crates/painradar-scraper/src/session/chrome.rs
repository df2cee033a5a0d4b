//! Headless Chromium driver for script-rendered sources.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;

use crate::error::AcquireError;
use crate::session::{DriverFactory, PageDriver, SessionConfig};

/// Launches one browser process per session.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromeDriverFactory;

pub struct ChromeDriver {
    browser: Browser,
    page: Option<Page>,
    user_agent: String,
    handler: JoinHandle<()>,
}

#[async_trait]
impl DriverFactory for ChromeDriverFactory {
    async fn launch(&self, config: &SessionConfig) -> Result<Box<dyn PageDriver>, AcquireError> {
        let mut builder = BrowserConfig::builder()
            .arg("--no-sandbox")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--lang=ru-RU")
            .request_timeout(config.timeout);

        if !config.headless {
            builder = builder.with_head();
        }

        let browser_config = builder
            .build()
            .map_err(|e| AcquireError::Driver(format!("failed to build browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(browser_config).await.map_err(|e| {
            AcquireError::Driver(format!(
                "failed to launch browser: {e}. Is Chrome or Chromium installed and in PATH?"
            ))
        })?;

        let handler = tokio::spawn(async move { while handler.next().await.is_some() {} });

        Ok(Box::new(ChromeDriver {
            browser,
            page: None,
            user_agent: config.user_agent.clone(),
            handler,
        }))
    }
}

impl ChromeDriver {
    fn page(&self) -> Result<&Page, AcquireError> {
        self.page
            .as_ref()
            .ok_or_else(|| AcquireError::Driver("no page has been opened yet".to_string()))
    }
}

#[async_trait]
impl PageDriver for ChromeDriver {
    async fn goto(&mut self, url: &str) -> Result<String, AcquireError> {
        if self.page.is_none() {
            let page = self
                .browser
                .new_page("about:blank")
                .await
                .map_err(|e| AcquireError::Driver(format!("failed to create page: {e}")))?;
            page.set_user_agent(self.user_agent.as_str())
                .await
                .map_err(|e| AcquireError::Driver(format!("failed to set user agent: {e}")))?;
            self.page = Some(page);
        }
        let page = self.page()?;
        page.goto(url)
            .await
            .map_err(|e| AcquireError::Driver(format!("navigation to {url} failed: {e}")))?;
        page.wait_for_navigation()
            .await
            .map_err(|e| AcquireError::Driver(format!("navigation to {url} failed: {e}")))?;
        self.content().await
    }

    async fn scroll_to_bottom(&mut self) -> Result<(), AcquireError> {
        self.page()?
            .evaluate("window.scrollTo(0, document.body.scrollHeight)")
            .await
            .map_err(|e| AcquireError::Driver(format!("scroll failed: {e}")))?;
        Ok(())
    }

    async fn content(&mut self) -> Result<String, AcquireError> {
        self.page()?
            .content()
            .await
            .map_err(|e| AcquireError::Driver(format!("failed to read page content: {e}")))
    }

    fn renders_scripts(&self) -> bool {
        true
    }

    async fn close(&mut self) -> Result<(), AcquireError> {
        if let Some(page) = self.page.take() {
            if let Err(e) = page.close().await {
                tracing::debug!(error = %e, "page close failed");
            }
        }
        let result = self
            .browser
            .close()
            .await
            .map(|_| ())
            .map_err(|e| AcquireError::Driver(format!("failed to close browser: {e}")));
        self.handler.abort();
        result
    }
}
