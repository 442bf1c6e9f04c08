use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::handler::viewport::Viewport as CdpViewport;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::{timeout, Instant};

use super::{BrowserSession, BrowserSettings, SessionFactory, WaitCondition};
use crate::error::ScraperError;

const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Launches one Chromium process per session.
#[derive(Debug, Clone)]
pub struct ChromiumSessionFactory {
    settings: BrowserSettings,
}

impl ChromiumSessionFactory {
    #[must_use]
    pub fn new(settings: BrowserSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl SessionFactory for ChromiumSessionFactory {
    type Session = ChromiumSession;

    async fn acquire(&self) -> Result<ChromiumSession, ScraperError> {
        let limit = self.settings.operation_timeout;
        // Dropping an in-flight launch drops the child process with it.
        timeout(limit, ChromiumSession::launch(&self.settings))
            .await
            .map_err(|_| ScraperError::Timeout {
                operation: "browser launch",
                timeout: limit,
            })?
    }
}

pub struct ChromiumSession {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
    operation_timeout: Duration,
    released: bool,
}

impl ChromiumSession {
    async fn launch(settings: &BrowserSettings) -> Result<Self, ScraperError> {
        let mut builder = BrowserConfig::builder()
            .viewport(Some(CdpViewport {
                width: settings.viewport.width,
                height: settings.viewport.height,
                device_scale_factor: Some(1.0),
                ..Default::default()
            }))
            .window_size(settings.viewport.width, settings.viewport.height)
            .arg(format!("--lang={}", settings.locale))
            .arg(format!("--user-agent={}", settings.user_agent))
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--no-first-run")
            .arg("--disable-dev-shm-usage");
        if !settings.headless {
            builder = builder.with_head();
        }
        if let Some(executable) = &settings.executable {
            builder = builder.chrome_executable(executable);
        }
        let config = builder.build().map_err(ScraperError::Launch)?;

        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ScraperError::Launch(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!(error = %e, "browser handler error");
                }
            }
        });

        match open_page(&browser, settings).await {
            Ok(page) => {
                tracing::debug!(headless = settings.headless, "browser session started");
                Ok(Self {
                    browser,
                    page,
                    handler_task,
                    operation_timeout: settings.operation_timeout,
                    released: false,
                })
            }
            Err(e) => {
                match timeout(settings.operation_timeout, browser.close()).await {
                    Ok(Ok(_)) => {}
                    Ok(Err(close_err)) => tracing::warn!(
                        error = %close_err,
                        "failed to close browser after page setup failure"
                    ),
                    Err(_) => tracing::warn!("browser close timed out after page setup failure"),
                }
                match timeout(settings.operation_timeout, browser.wait()).await {
                    Ok(Ok(_)) => {}
                    Ok(Err(wait_err)) => tracing::warn!(
                        error = %wait_err,
                        "browser process exit failed after page setup failure"
                    ),
                    Err(_) => tracing::warn!("browser did not exit after page setup failure"),
                }
                handler_task.abort();
                Err(e)
            }
        }
    }

    async fn bounded<T, F>(&self, operation: &'static str, fut: F) -> Result<T, ScraperError>
    where
        F: std::future::Future<Output = Result<T, chromiumoxide::error::CdpError>>,
    {
        match timeout(self.operation_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(ScraperError::Session(format!("{operation}: {e}"))),
            Err(_) => Err(ScraperError::Timeout {
                operation,
                timeout: self.operation_timeout,
            }),
        }
    }
}

/// Opens the working tab and applies the user agent and language headers.
async fn open_page(browser: &Browser, settings: &BrowserSettings) -> Result<Page, ScraperError> {
    let page = browser
        .new_page("about:blank")
        .await
        .map_err(|e| ScraperError::Launch(format!("failed to open page: {e}")))?;

    let fingerprint = SetUserAgentOverrideParams::builder()
        .user_agent(settings.user_agent.clone())
        .accept_language(settings.accept_language())
        .build()
        .map_err(ScraperError::Launch)?;
    page.execute(fingerprint)
        .await
        .map_err(|e| ScraperError::Launch(format!("failed to set user agent: {e}")))?;

    Ok(page)
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn navigate(
        &mut self,
        url: &str,
        wait: WaitCondition,
        limit: Duration,
    ) -> Result<(), ScraperError> {
        let page = &self.page;
        let navigation = async {
            page.goto(url).await?;
            if wait == WaitCondition::Load {
                page.wait_for_navigation().await?;
            }
            Ok::<(), chromiumoxide::error::CdpError>(())
        };

        match timeout(limit, navigation).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(ScraperError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            }),
            Err(_) => Err(ScraperError::Timeout {
                operation: "navigation",
                timeout: limit,
            }),
        }
    }

    async fn wait_for_selector(
        &mut self,
        selector: &str,
        limit: Duration,
    ) -> Result<bool, ScraperError> {
        let deadline = Instant::now() + limit;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(false);
            }
            // A lookup error only means "not there yet".
            if let Ok(Ok(_)) = timeout(remaining, self.page.find_element(selector)).await {
                return Ok(true);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            tokio::time::sleep(SELECTOR_POLL_INTERVAL.min(remaining)).await;
        }
    }

    async fn content(&mut self) -> Result<String, ScraperError> {
        self.bounded("page content", self.page.content()).await
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>, ScraperError> {
        let params = ScreenshotParams::builder().full_page(true).build();
        self.bounded("screenshot", self.page.screenshot(params))
            .await
    }

    async fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        if let Err(e) = self.bounded("page close", self.page.clone().close()).await {
            tracing::warn!(error = %e, "failed to close page during teardown");
        }
        match timeout(self.operation_timeout, self.browser.close()).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => tracing::warn!(error = %e, "failed to close browser during teardown"),
            Err(_) => tracing::warn!("browser close timed out during teardown"),
        }
        if timeout(self.operation_timeout, self.browser.wait())
            .await
            .is_err()
        {
            tracing::warn!("browser process did not exit during teardown");
        }
        self.handler_task.abort();
        tracing::debug!("browser session released");
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        if !self.released {
            tracing::warn!("browser session dropped without release");
            self.handler_task.abort();
        }
    }
}
