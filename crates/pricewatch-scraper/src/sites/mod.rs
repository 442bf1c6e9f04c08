//! Per-site search URL, wait target, extraction rules, and block markers.

pub mod amazon;
pub mod mercado_livre;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use pricewatch_core::Site;
use url::Url;

use crate::error::ScraperError;
use crate::extract::ExtractionRules;
use crate::soft_block::SoftBlockDetector;

/// Characters left unescaped in search terms placed in a URL.
const TERM_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Everything an adapter needs to search one storefront.
pub struct SiteProfile {
    pub rules: ExtractionRules,
    /// CSS selector whose presence means the results list has rendered.
    pub results_selector: &'static str,
    pub soft_block: Box<dyn SoftBlockDetector>,
    search_url: fn(&str) -> String,
}

impl SiteProfile {
    #[must_use]
    pub fn site(&self) -> Site {
        self.rules.site
    }

    /// Builds the search results URL for a wish-list term.
    #[must_use]
    pub fn search_url(&self, term: &str) -> String {
        (self.search_url)(term)
    }
}

impl std::fmt::Debug for SiteProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiteProfile")
            .field("site", &self.site())
            .field("results_selector", &self.results_selector)
            .finish_non_exhaustive()
    }
}

/// Profiles for every supported site, in a stable order.
///
/// # Errors
///
/// Returns [`ScraperError`] if any built-in selector or base URL fails to
/// parse.
pub fn default_profiles() -> Result<Vec<SiteProfile>, ScraperError> {
    Ok(vec![amazon::profile()?, mercado_livre::profile()?])
}

fn encode_term(term: &str) -> String {
    utf8_percent_encode(term, TERM_ENCODE_SET).to_string()
}

fn base_url(raw: &str) -> Result<Url, ScraperError> {
    Url::parse(raw).map_err(|e| ScraperError::InvalidBaseUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })
}
