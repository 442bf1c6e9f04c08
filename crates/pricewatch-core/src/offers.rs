//! Domain types shared by the scraping pipeline, persistence, and the
//! binaries.
//!
//! An [`Offer`] is produced once by a site extractor and never mutated
//! afterwards. Failures are data: a [`SiteResult`] is either the offers one
//! site returned for one wish item, or a [`SiteFailure`] describing why it
//! returned none.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::CoreError;

/// Installment text stored when a listing shows no installment plan.
pub const INSTALLMENTS_NOT_INFORMED: &str = "not informed";

/// All prices handled by the pipeline are Brazilian reais.
pub const CURRENCY_CODE: &str = "BRL";

/// A product the user wants to track, as read from the wish-list store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WishItem {
    pub id: i64,
    pub search_term: String,
}

impl WishItem {
    #[must_use]
    pub fn new(id: i64, search_term: impl Into<String>) -> Self {
        Self {
            id,
            search_term: search_term.into(),
        }
    }
}

/// Retail sites the pipeline knows how to search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Site {
    Amazon,
    MercadoLivre,
}

impl Site {
    /// Stable identifier used in storage and logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Site::Amazon => "amazon",
            Site::MercadoLivre => "mercado_livre",
        }
    }

    /// Human-readable storefront name.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Site::Amazon => "Amazon BR",
            Site::MercadoLivre => "Mercado Livre",
        }
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Site {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "amazon" => Ok(Site::Amazon),
            "mercado_livre" => Ok(Site::MercadoLivre),
            other => Err(CoreError::UnknownSite(other.to_string())),
        }
    }
}

/// One normalized listing found on a site for a search term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offer {
    pub name: String,
    /// Price in BRL with two decimal places.
    pub price: Decimal,
    /// Absolute product URL with query string, fragment, and referral
    /// suffixes removed.
    pub url_offer: String,
    pub site: Site,
    /// Installment plan text, or [`INSTALLMENTS_NOT_INFORMED`].
    pub installment_details: String,
}

impl Offer {
    /// Builds an offer, returning `None` when any required field is unusable:
    /// an empty name, a price that is not strictly positive, or an empty URL.
    #[must_use]
    pub fn new(
        name: String,
        price: Decimal,
        url_offer: String,
        site: Site,
        installment_details: Option<String>,
    ) -> Option<Self> {
        if name.trim().is_empty() || url_offer.trim().is_empty() || price <= Decimal::ZERO {
            return None;
        }
        Some(Self {
            name,
            price,
            url_offer,
            site,
            installment_details: installment_details
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| INSTALLMENTS_NOT_INFORMED.to_string()),
        })
    }
}

/// Classification of a site failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// A CAPTCHA or "unusual activity" page was served instead of results.
    CaptchaDetected,
    /// The results container never appeared within the wait timeout.
    ResultsNotFound,
    /// The results container loaded but held zero product nodes.
    NoProductsFound,
    /// A candidate listing was dropped for a missing field. Logged only.
    PartialExtraction,
    /// Anything else raised inside the adapter.
    UnknownError,
}

impl FailureKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::CaptchaDetected => "captcha_detected",
            FailureKind::ResultsNotFound => "results_not_found",
            FailureKind::NoProductsFound => "no_products_found",
            FailureKind::PartialExtraction => "partial_extraction",
            FailureKind::UnknownError => "unknown_error",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FailureKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "captcha_detected" => Ok(FailureKind::CaptchaDetected),
            "results_not_found" => Ok(FailureKind::ResultsNotFound),
            "no_products_found" => Ok(FailureKind::NoProductsFound),
            "partial_extraction" => Ok(FailureKind::PartialExtraction),
            "unknown_error" => Ok(FailureKind::UnknownError),
            other => Err(CoreError::UnknownFailureKind(other.to_string())),
        }
    }
}

/// Write-once record of a diagnostics capture.
///
/// The paths are `None` when the corresponding artifact could not be written
/// (for example because the browser had already died).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticRecord {
    pub id: Uuid,
    pub captured_at: DateTime<Utc>,
    pub site: Site,
    pub kind: FailureKind,
    pub snapshot_path: Option<PathBuf>,
    pub html_path: Option<PathBuf>,
}

/// Why one site produced no offers for one wish item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteFailure {
    pub site: Site,
    pub kind: FailureKind,
    pub message: Option<String>,
    pub diagnostic: Option<DiagnosticRecord>,
}

/// Outcome of a single `(wish item, site)` search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SiteResult {
    Success { site: Site, offers: Vec<Offer> },
    Failure(SiteFailure),
}

impl SiteResult {
    #[must_use]
    pub fn success(site: Site, offers: Vec<Offer>) -> Self {
        SiteResult::Success { site, offers }
    }

    #[must_use]
    pub fn failure(
        site: Site,
        kind: FailureKind,
        message: Option<String>,
        diagnostic: Option<DiagnosticRecord>,
    ) -> Self {
        SiteResult::Failure(SiteFailure {
            site,
            kind,
            message,
            diagnostic,
        })
    }

    #[must_use]
    pub fn site(&self) -> Site {
        match self {
            SiteResult::Success { site, .. } => *site,
            SiteResult::Failure(failure) => failure.site,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, SiteResult::Success { .. })
    }

    /// Returns the failure kind, or `None` for a success.
    #[must_use]
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            SiteResult::Success { .. } => None,
            SiteResult::Failure(failure) => Some(failure.kind),
        }
    }
}

/// Merged outcome for one wish item across every configured site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemResult {
    pub wish_item: WishItem,
    pub offers: Vec<Offer>,
    pub failures: Vec<SiteFailure>,
}

/// Result of one orchestrator run: exactly one [`ItemResult`] per input
/// wish item, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeBatchResult {
    pub items: Vec<ItemResult>,
    pub total_offers: usize,
}

impl ScrapeBatchResult {
    #[must_use]
    pub fn from_items(items: Vec<ItemResult>) -> Self {
        let total_offers = items.iter().map(|i| i.offers.len()).sum();
        Self {
            items,
            total_offers,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total number of site failures recorded across all items.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.items.iter().map(|i| i.failures.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn price(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn offer_new_defaults_missing_installments() {
        let offer = Offer::new(
            "Cadeira Gamer".into(),
            price("899.90"),
            "https://www.amazon.com.br/dp/B0TEST".into(),
            Site::Amazon,
            None,
        )
        .unwrap();
        assert_eq!(offer.installment_details, INSTALLMENTS_NOT_INFORMED);
    }

    #[test]
    fn offer_new_treats_blank_installments_as_absent() {
        let offer = Offer::new(
            "Cadeira Gamer".into(),
            price("899.90"),
            "https://www.amazon.com.br/dp/B0TEST".into(),
            Site::Amazon,
            Some("   ".into()),
        )
        .unwrap();
        assert_eq!(offer.installment_details, INSTALLMENTS_NOT_INFORMED);
    }

    #[test]
    fn offer_new_rejects_empty_name() {
        assert!(Offer::new(
            "  ".into(),
            price("10.00"),
            "https://x.test/p".into(),
            Site::Amazon,
            None
        )
        .is_none());
    }

    #[test]
    fn offer_new_rejects_non_positive_price() {
        assert!(Offer::new(
            "Mesa".into(),
            Decimal::ZERO,
            "https://x.test/p".into(),
            Site::MercadoLivre,
            None
        )
        .is_none());
    }

    #[test]
    fn offer_new_rejects_empty_url() {
        assert!(Offer::new(
            "Mesa".into(),
            price("10.00"),
            String::new(),
            Site::MercadoLivre,
            None
        )
        .is_none());
    }

    #[test]
    fn site_round_trips_through_str() {
        for site in [Site::Amazon, Site::MercadoLivre] {
            assert_eq!(site.as_str().parse::<Site>().unwrap(), site);
        }
        assert!("shopee".parse::<Site>().is_err());
    }

    #[test]
    fn failure_kind_parses_storage_names() {
        assert_eq!(
            "captcha_detected".parse::<FailureKind>().unwrap(),
            FailureKind::CaptchaDetected
        );
        assert!("timeout".parse::<FailureKind>().is_err());
    }

    #[test]
    fn site_result_serializes_with_status_tag() {
        let result = SiteResult::failure(Site::Amazon, FailureKind::CaptchaDetected, None, None);
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"status\":\"failure\""));
        assert!(json.contains("\"kind\":\"captcha_detected\""));
    }

    #[test]
    fn batch_result_counts_offers_and_failures() {
        let offer = Offer::new(
            "Mesa".into(),
            price("10.00"),
            "https://x.test/p".into(),
            Site::MercadoLivre,
            None,
        )
        .unwrap();
        let batch = ScrapeBatchResult::from_items(vec![
            ItemResult {
                wish_item: WishItem::new(1, "mesa"),
                offers: vec![offer.clone(), offer],
                failures: vec![SiteFailure {
                    site: Site::Amazon,
                    kind: FailureKind::ResultsNotFound,
                    message: None,
                    diagnostic: None,
                }],
            },
            ItemResult {
                wish_item: WishItem::new(2, "cadeira"),
                offers: vec![],
                failures: vec![],
            },
        ]);
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.total_offers, 2);
        assert_eq!(batch.failure_count(), 1);
    }
}
