//! Detection of "are you a robot" pages served in place of search results.

use scraper::{Html, Selector};

use crate::error::ScraperError;
use crate::extract::{selector, selectors};

/// Decides whether a rendered page is a soft block rather than a results page.
///
/// Implemented for plain closures so adapters can be tested with ad-hoc
/// detectors.
pub trait SoftBlockDetector: Send + Sync {
    fn is_soft_blocked(&self, html: &str) -> bool;
}

impl<F> SoftBlockDetector for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_soft_blocked(&self, html: &str) -> bool {
        self(html)
    }
}

/// Flags a page when any marker element is present or when a heading or the
/// title contains one of the known block phrases (case-insensitive).
#[derive(Debug)]
pub struct MarkerDetector {
    markers: Vec<Selector>,
    headings: Selector,
    phrases: Vec<String>,
}

impl MarkerDetector {
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidSelector`] if a marker selector does not
    /// parse.
    pub fn new(markers: &[&str], phrases: &[&str]) -> Result<Self, ScraperError> {
        Ok(Self {
            markers: selectors(markers)?,
            headings: selector("title, h1, h2, h3, h4")?,
            phrases: phrases.iter().map(|p| p.to_lowercase()).collect(),
        })
    }
}

impl SoftBlockDetector for MarkerDetector {
    fn is_soft_blocked(&self, html: &str) -> bool {
        let document = Html::parse_document(html);

        if self
            .markers
            .iter()
            .any(|sel| document.select(sel).next().is_some())
        {
            return true;
        }

        document.select(&self.headings).any(|heading| {
            let text = heading.text().collect::<String>().to_lowercase();
            self.phrases.iter().any(|phrase| text.contains(phrase))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> MarkerDetector {
        MarkerDetector::new(
            &["form[action*='validateCaptcha']", "input#captchacharacters"],
            &["Atividade incomum", "not a robot"],
        )
        .unwrap()
    }

    #[test]
    fn captcha_form_is_detected() {
        let html = r#"<html><body><form action="/errors/validateCaptcha"><input id="captchacharacters"></form></body></html>"#;
        assert!(detector().is_soft_blocked(html));
    }

    #[test]
    fn heading_phrase_is_detected_case_insensitively() {
        let html = "<html><body><h1>Detectamos ATIVIDADE INCOMUM na sua rede</h1></body></html>";
        assert!(detector().is_soft_blocked(html));
    }

    #[test]
    fn phrase_in_body_copy_is_ignored() {
        let html = "<html><body><p>this seller is not a robot</p><div class='results'></div></body></html>";
        assert!(!detector().is_soft_blocked(html));
    }

    #[test]
    fn closures_are_detectors() {
        let always = |_: &str| true;
        assert!(always.is_soft_blocked("<html></html>"));
    }
}
