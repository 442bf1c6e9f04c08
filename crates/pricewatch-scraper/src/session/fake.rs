//! Scripted in-memory sessions for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::{BrowserSession, SessionFactory, WaitCondition};
use crate::error::ScraperError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Navigation {
    Ok,
    TimesOut,
    Fails,
}

#[derive(Debug, Clone)]
pub(crate) struct Script {
    pub navigation: Navigation,
    pub results_appear: bool,
    pub html: String,
    pub screenshot_fails: bool,
    pub panic_on_content: bool,
}

impl Script {
    pub(crate) fn results(html: &str) -> Self {
        Self {
            navigation: Navigation::Ok,
            results_appear: true,
            html: html.to_string(),
            screenshot_fails: false,
            panic_on_content: false,
        }
    }

    pub(crate) fn no_results(html: &str) -> Self {
        Self {
            results_appear: false,
            ..Self::results(html)
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub acquired: AtomicUsize,
    pub released: AtomicUsize,
    pub contents: AtomicUsize,
}

pub(crate) struct FakeSession {
    script: Script,
    counters: Arc<Counters>,
    released: bool,
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn navigate(
        &mut self,
        url: &str,
        _wait: WaitCondition,
        timeout: Duration,
    ) -> Result<(), ScraperError> {
        match self.script.navigation {
            Navigation::Ok => Ok(()),
            Navigation::TimesOut => Err(ScraperError::Timeout {
                operation: "navigation",
                timeout,
            }),
            Navigation::Fails => Err(ScraperError::Navigation {
                url: url.to_string(),
                reason: "net::ERR_CONNECTION_RESET".to_string(),
            }),
        }
    }

    async fn wait_for_selector(
        &mut self,
        _selector: &str,
        _timeout: Duration,
    ) -> Result<bool, ScraperError> {
        Ok(self.script.results_appear)
    }

    async fn content(&mut self) -> Result<String, ScraperError> {
        self.counters.contents.fetch_add(1, Ordering::SeqCst);
        assert!(!self.script.panic_on_content, "renderer crashed");
        Ok(self.script.html.clone())
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>, ScraperError> {
        if self.script.screenshot_fails {
            return Err(ScraperError::Session("target closed".to_string()));
        }
        Ok(b"\x89PNG fake".to_vec())
    }

    async fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.counters.released.fetch_add(1, Ordering::SeqCst);
        }
    }
}

pub(crate) struct FakeFactory {
    pub script: Script,
    pub launch_fails: bool,
    pub counters: Arc<Counters>,
}

impl FakeFactory {
    pub(crate) fn new(script: Script) -> Self {
        Self {
            script,
            launch_fails: false,
            counters: Arc::new(Counters::default()),
        }
    }
}

#[async_trait]
impl SessionFactory for FakeFactory {
    type Session = FakeSession;

    async fn acquire(&self) -> Result<FakeSession, ScraperError> {
        if self.launch_fails {
            return Err(ScraperError::Launch("no chromium binary".to_string()));
        }
        self.counters.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(FakeSession {
            script: self.script.clone(),
            counters: Arc::clone(&self.counters),
            released: false,
        })
    }
}
