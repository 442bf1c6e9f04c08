//! Selector-driven extraction of offers from a rendered results page.
//!
//! Each field is read by trying an ordered list of selectors and taking the
//! first that yields a usable value. A candidate node missing any required
//! field (name, price, URL) is dropped and logged; it never fails the page.
//!
//! Everything here is synchronous: [`scraper::Html`] is not `Send`, so the
//! document must be parsed and discarded between awaits.

use std::fmt;

use pricewatch_core::{FailureKind, Offer, Site};
use rust_decimal::Decimal;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::ScraperError;
use crate::normalize::{
    clean_title, find_installment_phrase, looks_like_installments, normalize_offer_url,
    normalize_whitespace,
};
use crate::price::{join_price_parts, parse_brl_price};

/// One way of reading a price out of a candidate node.
#[derive(Debug)]
pub enum PriceRule {
    /// Integer and cents rendered in separate elements. The fraction is
    /// looked up next to the whole part first, then anywhere in the node.
    Split { whole: Selector, fraction: Selector },
    /// A single element holding the full price text.
    Text(Selector),
}

/// Site-specific selectors plus the context needed to normalize URLs.
#[derive(Debug)]
pub struct ExtractionRules {
    pub site: Site,
    pub base_url: Url,
    pub items: Selector,
    pub name: Vec<Selector>,
    pub price: Vec<PriceRule>,
    pub url: Vec<Selector>,
    pub installments: Vec<Selector>,
    /// Path fragments after which a product URL is tracking noise.
    pub referral_markers: Vec<&'static str>,
}

/// A required offer field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingField {
    Name,
    Price,
    Url,
}

impl fmt::Display for MissingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MissingField::Name => "name",
            MissingField::Price => "price",
            MissingField::Url => "url",
        })
    }
}

/// A candidate node that could not be turned into an offer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedCandidate {
    /// Zero-based position among the inspected nodes.
    pub position: usize,
    pub missing: Vec<MissingField>,
}

/// Outcome of running [`extract_page`] over a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageExtraction {
    /// The document held zero candidate nodes.
    NoItems,
    Items {
        offers: Vec<Offer>,
        dropped: Vec<DroppedCandidate>,
        inspected: usize,
    },
}

/// Parses one selector, mapping the parse error to [`ScraperError`].
///
/// # Errors
///
/// Returns [`ScraperError::InvalidSelector`] when `css` is not valid.
pub fn selector(css: &str) -> Result<Selector, ScraperError> {
    Selector::parse(css).map_err(|e| ScraperError::InvalidSelector {
        selector: css.to_string(),
        reason: e.to_string(),
    })
}

/// Parses an ordered list of selectors.
///
/// # Errors
///
/// Returns the first [`ScraperError::InvalidSelector`] encountered.
pub fn selectors(css: &[&str]) -> Result<Vec<Selector>, ScraperError> {
    css.iter().map(|s| selector(s)).collect()
}

/// Extracts up to `max_items` offers from a results page.
///
/// Only the first `max_items` candidate nodes are inspected; dropped
/// candidates count against the limit. Each dropped node is logged at warn
/// as a partial extraction naming the missing fields.
#[must_use]
pub fn extract_page(html: &str, rules: &ExtractionRules, max_items: usize) -> PageExtraction {
    let document = Html::parse_document(html);
    let candidates: Vec<ElementRef<'_>> = document.select(&rules.items).take(max_items).collect();

    if candidates.is_empty() {
        return PageExtraction::NoItems;
    }

    let inspected = candidates.len();
    let mut offers = Vec::with_capacity(inspected);
    let mut dropped = Vec::new();

    for (position, node) in candidates.into_iter().enumerate() {
        match extract_candidate(node, rules) {
            Ok(offer) => offers.push(offer),
            Err(missing) => {
                tracing::warn!(
                    site = %rules.site,
                    kind = %FailureKind::PartialExtraction,
                    position,
                    missing = %join_fields(&missing),
                    "dropping listing with missing fields"
                );
                dropped.push(DroppedCandidate { position, missing });
            }
        }
    }

    PageExtraction::Items {
        offers,
        dropped,
        inspected,
    }
}

fn extract_candidate(
    node: ElementRef<'_>,
    rules: &ExtractionRules,
) -> Result<Offer, Vec<MissingField>> {
    let name = extract_name(node, &rules.name);
    let price = extract_price(node, &rules.price);
    let url = extract_url(node, rules);

    let mut missing = Vec::new();
    if name.is_none() {
        missing.push(MissingField::Name);
    }
    if price.is_none() {
        missing.push(MissingField::Price);
    }
    if url.is_none() {
        missing.push(MissingField::Url);
    }

    match (name, price, url) {
        (Some(name), Some(price), Some(url)) => {
            let installments = extract_installments(node, &rules.installments);
            // Offer::new rejects a non-positive price that parsed fine.
            Offer::new(name, price, url, rules.site, installments)
                .ok_or_else(|| vec![MissingField::Price])
        }
        _ => Err(missing),
    }
}

fn element_text(el: ElementRef<'_>) -> String {
    normalize_whitespace(&el.text().collect::<Vec<_>>().join(" "))
}

fn extract_name(node: ElementRef<'_>, rules: &[Selector]) -> Option<String> {
    rules
        .iter()
        .flat_map(|sel| node.select(sel))
        .find_map(|el| clean_title(&element_text(el)))
}

fn extract_price(node: ElementRef<'_>, rules: &[PriceRule]) -> Option<Decimal> {
    rules.iter().find_map(|rule| match rule {
        PriceRule::Split { whole, fraction } => {
            let whole_el = node.select(whole).next()?;
            let fraction_text = whole_el
                .parent()
                .and_then(ElementRef::wrap)
                .and_then(|parent| parent.select(fraction).next())
                .or_else(|| node.select(fraction).next())
                .map(element_text);
            join_price_parts(&element_text(whole_el), fraction_text.as_deref())
        }
        PriceRule::Text(sel) => node
            .select(sel)
            .find_map(|el| parse_brl_price(&element_text(el))),
    })
}

fn extract_url(node: ElementRef<'_>, rules: &ExtractionRules) -> Option<String> {
    rules
        .url
        .iter()
        .flat_map(|sel| node.select(sel))
        .filter_map(|el| el.value().attr("href"))
        .find_map(|href| normalize_offer_url(href, &rules.base_url, &rules.referral_markers))
}

/// Installment text: dedicated elements first, then a plan phrase inside a
/// single text node, then a pattern scan over the node's joined text.
fn extract_installments(node: ElementRef<'_>, rules: &[Selector]) -> Option<String> {
    rules
        .iter()
        .flat_map(|sel| node.select(sel))
        .map(element_text)
        .find(|text| looks_like_installments(text))
        .or_else(|| node.text().find_map(find_installment_phrase))
        .or_else(|| find_installment_phrase(&element_text(node)))
}

fn join_fields(fields: &[MissingField]) -> String {
    fields
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod tests;
