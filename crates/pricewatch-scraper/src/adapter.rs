//! Site adapters: one search for one term on one site, always ending in a
//! [`SiteResult`].
//!
//! A [`BrowserSiteAdapter`] drives a fresh browser session through the
//! search flow, classifies whatever goes wrong into a [`FailureKind`], and
//! releases the session on every exit path, including panics.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use pricewatch_core::{AppConfig, FailureKind, Site, SiteResult};

use crate::diagnostics::DiagnosticsCapture;
use crate::error::ScraperError;
use crate::extract::{extract_page, PageExtraction};
use crate::session::{BrowserSession, SessionFactory, WaitCondition};
use crate::sites::{default_profiles, SiteProfile};

/// Searches a single site for a term.
///
/// Implementations must not panic or return errors for expected site
/// behavior; every outcome is expressed as a [`SiteResult`].
#[async_trait]
pub trait SiteAdapter: Send + Sync {
    fn site(&self) -> Site;

    async fn search(&self, term: &str) -> SiteResult;
}

/// Timeouts and limits applied to every search.
#[derive(Debug, Clone, Copy)]
pub struct SearchSettings {
    pub navigation_timeout: Duration,
    pub results_timeout: Duration,
    pub max_items_per_page: usize,
}

impl SearchSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            navigation_timeout: Duration::from_secs(config.scraper_navigation_timeout_secs),
            results_timeout: Duration::from_secs(config.scraper_results_timeout_secs),
            max_items_per_page: config.scraper_max_items_per_page,
        }
    }
}

pub struct BrowserSiteAdapter<F: SessionFactory> {
    profile: SiteProfile,
    sessions: Arc<F>,
    diagnostics: DiagnosticsCapture,
    settings: SearchSettings,
}

impl<F: SessionFactory> BrowserSiteAdapter<F> {
    #[must_use]
    pub fn new(
        profile: SiteProfile,
        sessions: Arc<F>,
        diagnostics: DiagnosticsCapture,
        settings: SearchSettings,
    ) -> Self {
        Self {
            profile,
            sessions,
            diagnostics,
            settings,
        }
    }

    /// The search flow proper. `Err` means an unexpected error that the
    /// caller classifies as [`FailureKind::UnknownError`].
    async fn run_search(
        &self,
        session: &mut F::Session,
        term: &str,
    ) -> Result<SiteResult, ScraperError> {
        let site = self.profile.site();
        let url = self.profile.search_url(term);
        tracing::debug!(%site, %url, "navigating to search page");

        match session
            .navigate(&url, WaitCondition::DomContentLoaded, self.settings.navigation_timeout)
            .await
        {
            Ok(()) => {}
            Err(e) if e.is_timeout() => {
                return Ok(self.missing_results(session, &e.to_string()).await);
            }
            Err(e) => return Err(e),
        }

        let appeared = session
            .wait_for_selector(self.profile.results_selector, self.settings.results_timeout)
            .await?;
        if !appeared {
            let reason = format!(
                "results did not appear within {}s",
                self.settings.results_timeout.as_secs()
            );
            return Ok(self.missing_results(session, &reason).await);
        }

        let html = session.content().await?;
        let extraction = extract_page(&html, &self.profile.rules, self.settings.max_items_per_page);

        match extraction {
            PageExtraction::NoItems => {
                let diagnostic = self
                    .diagnostics
                    .capture(session, site, FailureKind::NoProductsFound)
                    .await;
                Ok(SiteResult::failure(
                    site,
                    FailureKind::NoProductsFound,
                    Some("results page contained no product listings".to_string()),
                    Some(diagnostic),
                ))
            }
            PageExtraction::Items {
                offers,
                dropped,
                inspected,
            } => {
                tracing::debug!(
                    %site,
                    inspected,
                    extracted = offers.len(),
                    dropped = dropped.len(),
                    "results page extracted"
                );
                Ok(SiteResult::success(site, offers))
            }
        }
    }

    /// Results never showed up: tell a soft block apart from a slow or empty
    /// page, then capture diagnostics under the final classification.
    async fn missing_results(&self, session: &mut F::Session, reason: &str) -> SiteResult {
        let site = self.profile.site();
        let blocked = match session.content().await {
            Ok(html) => self.profile.soft_block.is_soft_blocked(&html),
            Err(e) => {
                tracing::debug!(%site, error = %e, "page unreadable while classifying missing results");
                false
            }
        };

        let (kind, message) = if blocked {
            (
                FailureKind::CaptchaDetected,
                "soft block page served instead of results".to_string(),
            )
        } else {
            (FailureKind::ResultsNotFound, reason.to_string())
        };

        let diagnostic = self.diagnostics.capture(session, site, kind).await;
        SiteResult::failure(site, kind, Some(message), Some(diagnostic))
    }

    async fn unknown_failure(&self, session: &mut F::Session, message: String) -> SiteResult {
        let site = self.profile.site();
        let diagnostic = self
            .diagnostics
            .capture(session, site, FailureKind::UnknownError)
            .await;
        SiteResult::failure(site, FailureKind::UnknownError, Some(message), Some(diagnostic))
    }
}

#[async_trait]
impl<F> SiteAdapter for BrowserSiteAdapter<F>
where
    F: SessionFactory + 'static,
{
    fn site(&self) -> Site {
        self.profile.site()
    }

    async fn search(&self, term: &str) -> SiteResult {
        let site = self.site();

        let mut session = match self.sessions.acquire().await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(%site, error = %e, "failed to start browser session");
                return SiteResult::failure(
                    site,
                    FailureKind::UnknownError,
                    Some(e.to_string()),
                    None,
                );
            }
        };

        let outcome = AssertUnwindSafe(self.run_search(&mut session, term))
            .catch_unwind()
            .await;
        let result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => self.unknown_failure(&mut session, e.to_string()).await,
            Err(payload) => {
                let message = format!("search panicked: {}", panic_message(payload.as_ref()));
                self.unknown_failure(&mut session, message).await
            }
        };

        session.release().await;

        match &result {
            SiteResult::Success { offers, .. } => {
                tracing::info!(%site, term, offers = offers.len(), "site search succeeded");
            }
            SiteResult::Failure(failure) => {
                tracing::warn!(
                    %site,
                    term,
                    kind = %failure.kind,
                    message = failure.message.as_deref().unwrap_or_default(),
                    "site search failed"
                );
            }
        }
        result
    }
}

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Builds one adapter per supported site, all sharing `sessions`.
///
/// # Errors
///
/// Returns [`ScraperError`] if a site profile fails to build.
pub fn build_adapters<F>(
    sessions: Arc<F>,
    diagnostics: &DiagnosticsCapture,
    settings: SearchSettings,
) -> Result<Vec<Arc<dyn SiteAdapter>>, ScraperError>
where
    F: SessionFactory + 'static,
{
    Ok(default_profiles()?
        .into_iter()
        .map(|profile| {
            Arc::new(BrowserSiteAdapter::new(
                profile,
                Arc::clone(&sessions),
                diagnostics.clone(),
                settings,
            )) as Arc<dyn SiteAdapter>
        })
        .collect())
}

#[cfg(test)]
#[path = "adapter_test.rs"]
mod tests;
