//! Mercado Livre Brazil listing pages (`lista.mercadolivre.com.br`).

use pricewatch_core::Site;

use super::{base_url, encode_term, SiteProfile};
use crate::error::ScraperError;
use crate::extract::{selector, selectors, ExtractionRules, PriceRule};
use crate::soft_block::MarkerDetector;

pub const BASE_URL: &str = "https://lista.mercadolivre.com.br";

const RESULTS: &str = "ol.ui-search-layout, section.ui-search-results";

const BLOCK_MARKERS: &[&str] = &["iframe[src*='captcha']", "div.g-recaptcha", "#px-captcha"];

const BLOCK_PHRASES: &[&str] = &[
    "atividade incomum",
    "unusual activity",
    "não sou um robô",
    "confirme que você não é um robô",
];

/// Listing pages take the term as a dash-separated path slug.
fn search_url(term: &str) -> String {
    let slug = term
        .split_whitespace()
        .map(|word| encode_term(&word.to_lowercase()))
        .collect::<Vec<_>>()
        .join("-");
    format!("{BASE_URL}/{slug}")
}

/// # Errors
///
/// Returns [`ScraperError`] if a built-in selector fails to parse.
pub fn profile() -> Result<SiteProfile, ScraperError> {
    let rules = ExtractionRules {
        site: Site::MercadoLivre,
        base_url: base_url(BASE_URL)?,
        items: selector("li.ui-search-layout__item")?,
        name: selectors(&[
            "a.poly-component__title",
            "h2.ui-search-item__title",
            "h2, h3",
        ])?,
        price: vec![
            PriceRule::Split {
                whole: selector(".poly-price__current .andes-money-amount__fraction")?,
                fraction: selector(".andes-money-amount__cents")?,
            },
            PriceRule::Split {
                whole: selector(".andes-money-amount__fraction")?,
                fraction: selector(".andes-money-amount__cents")?,
            },
        ],
        url: selectors(&[
            "a.poly-component__title[href]",
            "a.ui-search-link[href]",
            "a[href]",
        ])?,
        installments: selectors(&[".poly-price__installments", ".ui-search-installments"])?,
        referral_markers: Vec::new(),
    };

    Ok(SiteProfile {
        rules,
        results_selector: RESULTS,
        soft_block: Box::new(MarkerDetector::new(BLOCK_MARKERS, BLOCK_PHRASES)?),
        search_url,
    })
}
