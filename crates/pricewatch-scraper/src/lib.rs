//! Browser-driven offer scraping for Brazilian storefronts.
//!
//! Layers, bottom-up: price and text normalization, selector-driven
//! extraction, browser sessions, per-site adapters with failure
//! classification and diagnostics, and the batch orchestrator that feeds a
//! [`pricewatch_core::HistorySink`].

pub mod adapter;
pub mod diagnostics;
pub mod error;
pub mod extract;
pub mod normalize;
pub mod notify;
pub mod orchestrator;
pub mod price;
pub mod session;
pub mod sites;
pub mod soft_block;

pub use adapter::{build_adapters, BrowserSiteAdapter, SearchSettings, SiteAdapter};
pub use diagnostics::DiagnosticsCapture;
pub use error::ScraperError;
pub use extract::{extract_page, ExtractionRules, PageExtraction};
pub use notify::{BatchEvent, BatchNotifier, LogNotifier};
pub use orchestrator::ScrapeOrchestrator;
pub use price::parse_brl_price;
pub use session::{
    BrowserSession, BrowserSettings, ChromiumSession, ChromiumSessionFactory, SessionFactory,
    WaitCondition,
};
pub use sites::SiteProfile;
pub use soft_block::{MarkerDetector, SoftBlockDetector};

use std::sync::Arc;

use pricewatch_core::{AppConfig, HistorySink};

/// Wires the production pipeline from configuration: Chromium sessions,
/// every site adapter, diagnostics, and the orchestrator.
///
/// # Errors
///
/// Returns [`ScraperError`] if a built-in site profile fails to build.
pub fn build_orchestrator(
    config: &AppConfig,
    sink: Arc<dyn HistorySink>,
) -> Result<ScrapeOrchestrator, ScraperError> {
    let sessions = Arc::new(ChromiumSessionFactory::new(BrowserSettings::from_app_config(
        config,
    )));
    let diagnostics = if config.diagnostics_enabled {
        DiagnosticsCapture::new(config.diagnostics_dir.clone())
    } else {
        DiagnosticsCapture::disabled()
    };
    let adapters = build_adapters(
        sessions,
        &diagnostics,
        SearchSettings::from_app_config(config),
    )?;

    Ok(ScrapeOrchestrator::new(adapters, sink)
        .with_max_concurrent_items(config.scraper_max_concurrent_items))
}
