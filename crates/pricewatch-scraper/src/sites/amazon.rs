//! Amazon Brazil (`amazon.com.br`) search results.

use pricewatch_core::Site;

use super::{base_url, encode_term, SiteProfile};
use crate::error::ScraperError;
use crate::extract::{selector, selectors, ExtractionRules, PriceRule};
use crate::soft_block::MarkerDetector;

pub const BASE_URL: &str = "https://www.amazon.com.br";

const RESULTS: &str = "div.s-main-slot";

const BLOCK_MARKERS: &[&str] = &[
    "form[action*='validateCaptcha']",
    "input#captchacharacters",
    "img[src*='captcha']",
];

const BLOCK_PHRASES: &[&str] = &[
    "digite os caracteres",
    "enter the characters you see",
    "not a robot",
    "não é um robô",
    "sorry, we just need to make sure",
];

fn search_url(term: &str) -> String {
    format!("{BASE_URL}/s?k={}", encode_term(term.trim()))
}

/// # Errors
///
/// Returns [`ScraperError`] if a built-in selector fails to parse.
pub fn profile() -> Result<SiteProfile, ScraperError> {
    let rules = ExtractionRules {
        site: Site::Amazon,
        base_url: base_url(BASE_URL)?,
        items: selector("div[data-component-type='s-search-result']")?,
        name: selectors(&["h2 a span", "h2 span.a-text-normal", "h2"])?,
        price: vec![
            PriceRule::Split {
                whole: selector(".a-price:not([data-a-strike]) .a-price-whole")?,
                fraction: selector(".a-price-fraction")?,
            },
            PriceRule::Text(selector(".a-price:not([data-a-strike]) .a-offscreen")?),
            PriceRule::Text(selector(".a-price .a-offscreen")?),
        ],
        url: selectors(&[
            "h2 a[href]",
            "a.a-link-normal.s-no-outline[href]",
            "a[href*='/dp/']",
        ])?,
        installments: selectors(&[
            "[data-cy='secondary-offer-recipe'] span",
            ".a-row .a-size-base.a-color-secondary",
        ])?,
        referral_markers: vec!["/ref="],
    };

    Ok(SiteProfile {
        rules,
        results_selector: RESULTS,
        soft_block: Box::new(MarkerDetector::new(BLOCK_MARKERS, BLOCK_PHRASES)?),
        search_url,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_url_encodes_term() {
        assert_eq!(
            search_url(" cadeira gamer "),
            "https://www.amazon.com.br/s?k=cadeira%20gamer"
        );
    }
}
