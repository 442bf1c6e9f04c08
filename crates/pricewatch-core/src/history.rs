//! The append-only price history seam.
//!
//! The orchestrator hands every discovered offer to a [`HistorySink`]; the
//! database crate provides the Postgres implementation.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::offers::{Offer, Site, WishItem};

/// One price observation, annotated with the wish item that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub wish_item_id: i64,
    pub wish_item_name: String,
    pub site: Site,
    pub price: Decimal,
    pub url_offer: String,
    pub installment_details: String,
}

impl HistoryEntry {
    #[must_use]
    pub fn from_offer(wish_item: &WishItem, offer: &Offer) -> Self {
        Self {
            wish_item_id: wish_item.id,
            wish_item_name: wish_item.search_term.clone(),
            site: offer.site,
            price: offer.price,
            url_offer: offer.url_offer.clone(),
            installment_details: offer.installment_details.clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history write failed: {0}")]
    Write(String),
}

/// External append-only store for price observations.
///
/// Each call is an independent write; callers must not assume exclusive
/// access to the underlying store.
#[async_trait]
pub trait HistorySink: Send + Sync {
    /// Appends a single observation.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::Write`] when the store rejects the write.
    async fn append(&self, entry: &HistoryEntry) -> Result<(), HistoryError>;
}
