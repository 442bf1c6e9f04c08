//! Browser session lifecycle.
//!
//! A [`SessionFactory`] hands out one isolated [`BrowserSession`] per site
//! search. Sessions are never shared between concurrent searches, and every
//! acquired session must be released exactly once; [`BrowserSession::release`]
//! is idempotent so that a second call on an error path is harmless.

mod chromium;
#[cfg(test)]
pub(crate) mod fake;

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use pricewatch_core::{AppConfig, Viewport};

use crate::error::ScraperError;

pub use chromium::{ChromiumSession, ChromiumSessionFactory};

/// Page lifecycle event to wait for after a navigation is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitCondition {
    DomContentLoaded,
    Load,
}

/// A single isolated browser page.
#[async_trait]
pub trait BrowserSession: Send {
    /// Navigates to `url`, waiting for `wait` at most `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Timeout`] when the deadline passes and
    /// [`ScraperError::Navigation`] for any other navigation failure.
    async fn navigate(
        &mut self,
        url: &str,
        wait: WaitCondition,
        timeout: Duration,
    ) -> Result<(), ScraperError>;

    /// Polls until an element matching `selector` exists.
    ///
    /// Returns `Ok(false)` when `timeout` elapses without a match.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Session`] when the page can no longer be
    /// queried.
    async fn wait_for_selector(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<bool, ScraperError>;

    /// Returns the current serialized DOM.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError`] when the page cannot be read.
    async fn content(&mut self) -> Result<String, ScraperError>;

    /// Returns a PNG screenshot of the current page.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError`] when the capture fails.
    async fn screenshot(&mut self) -> Result<Vec<u8>, ScraperError>;

    /// Closes the page and its browser. Never fails; safe to call twice.
    async fn release(&mut self);
}

/// Creates fresh browser sessions.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    type Session: BrowserSession + 'static;

    /// Launches a browser and opens one page configured with the shared
    /// fingerprint.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError`] when the browser cannot be started within the
    /// launch timeout. Anything partially started is torn down first.
    async fn acquire(&self) -> Result<Self::Session, ScraperError>;
}

/// Fingerprint and launch options shared by every session.
#[derive(Debug, Clone)]
pub struct BrowserSettings {
    pub executable: Option<PathBuf>,
    pub headless: bool,
    pub user_agent: String,
    pub locale: String,
    pub viewport: Viewport,
    /// Bounds browser launch and each individual page operation.
    pub operation_timeout: Duration,
}

impl BrowserSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            executable: config.browser_executable.clone(),
            headless: config.browser_headless,
            user_agent: config.scraper_user_agent.clone(),
            locale: config.scraper_locale.clone(),
            viewport: config.scraper_viewport,
            operation_timeout: Duration::from_secs(config.scraper_navigation_timeout_secs),
        }
    }

    /// `Accept-Language` header value derived from the locale, e.g.
    /// `pt-BR,pt;q=0.9`.
    #[must_use]
    pub fn accept_language(&self) -> String {
        match self.locale.split_once('-') {
            Some((lang, _)) => format!("{},{lang};q=0.9", self.locale),
            None => self.locale.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(locale: &str) -> BrowserSettings {
        BrowserSettings {
            executable: None,
            headless: true,
            user_agent: "ua".to_string(),
            locale: locale.to_string(),
            viewport: Viewport {
                width: 1366,
                height: 768,
            },
            operation_timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn accept_language_adds_base_language() {
        assert_eq!(settings("pt-BR").accept_language(), "pt-BR,pt;q=0.9");
        assert_eq!(settings("pt").accept_language(), "pt");
    }
}
