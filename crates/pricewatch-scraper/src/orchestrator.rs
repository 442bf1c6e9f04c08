//! Runs a batch of wish items across every site adapter.
//!
//! Items are processed with bounded concurrency (sequential by default) and
//! results come back in input order. Within an item all adapters run
//! concurrently and every one is awaited, whatever the others do. Offers are
//! written to the history sink one by one; a failed write is logged and
//! skipped.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::{join_all, BoxFuture};
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use pricewatch_core::{
    FailureKind, HistoryEntry, HistorySink, ItemResult, ScrapeBatchResult, SiteResult, WishItem,
};

use crate::adapter::{panic_message, SiteAdapter};
use crate::notify::{BatchEvent, BatchNotifier, LogNotifier};

pub struct ScrapeOrchestrator {
    adapters: Vec<Arc<dyn SiteAdapter>>,
    sink: Arc<dyn HistorySink>,
    notifier: Arc<dyn BatchNotifier>,
    max_concurrent_items: usize,
}

impl ScrapeOrchestrator {
    #[must_use]
    pub fn new(adapters: Vec<Arc<dyn SiteAdapter>>, sink: Arc<dyn HistorySink>) -> Self {
        Self {
            adapters,
            sink,
            notifier: Arc::new(LogNotifier),
            max_concurrent_items: 1,
        }
    }

    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn BatchNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Number of wish items processed at once. Values below 1 are raised to 1.
    #[must_use]
    pub fn with_max_concurrent_items(mut self, max: usize) -> Self {
        self.max_concurrent_items = max.max(1);
        self
    }

    /// Scrapes every item on every site.
    ///
    /// Never fails: site problems are recorded per item in the returned
    /// [`ScrapeBatchResult`], which holds exactly one entry per input item in
    /// input order.
    pub async fn run(&self, items: &[WishItem]) -> ScrapeBatchResult {
        self.notifier
            .notify(&BatchEvent::Started { items: items.len() });
        tracing::info!(
            items = items.len(),
            sites = self.adapters.len(),
            max_concurrent_items = self.max_concurrent_items,
            "starting scrape batch"
        );

        let pending: Vec<BoxFuture<'_, ItemResult>> = items
            .iter()
            .map(|item| self.scrape_item(item).boxed())
            .collect();
        let results: Vec<ItemResult> = stream::iter(pending)
            .buffered(self.max_concurrent_items)
            .collect()
            .await;
        let batch = ScrapeBatchResult::from_items(results);

        let searches = items.len() * self.adapters.len();
        let failures = batch.failure_count();
        if searches > 0 && failures == searches {
            self.notifier.notify(&BatchEvent::Failed {
                message: format!("all {searches} site searches failed"),
            });
        } else {
            self.notifier.notify(&BatchEvent::Succeeded {
                offers: batch.total_offers,
            });
        }

        tracing::info!(
            items = batch.len(),
            offers = batch.total_offers,
            failures,
            "scrape batch complete"
        );
        batch
    }

    async fn scrape_item(&self, item: &WishItem) -> ItemResult {
        tracing::debug!(wish_item_id = item.id, term = %item.search_term, "scraping wish item");

        let searches = self.adapters.iter().map(|adapter| {
            let site = adapter.site();
            AssertUnwindSafe(adapter.search(&item.search_term))
                .catch_unwind()
                .map(move |outcome| {
                    outcome.unwrap_or_else(|payload| {
                        SiteResult::failure(
                            site,
                            FailureKind::UnknownError,
                            Some(format!(
                                "adapter panicked: {}",
                                panic_message(payload.as_ref())
                            )),
                            None,
                        )
                    })
                })
                .boxed()
        });
        let site_results = join_all(searches).await;

        let mut offers = Vec::new();
        let mut failures = Vec::new();
        for result in site_results {
            match result {
                SiteResult::Success {
                    offers: site_offers,
                    ..
                } => offers.extend(site_offers),
                SiteResult::Failure(failure) => {
                    tracing::warn!(
                        wish_item_id = item.id,
                        site = %failure.site,
                        kind = %failure.kind,
                        "site failed for wish item"
                    );
                    failures.push(failure);
                }
            }
        }

        for offer in &offers {
            let entry = HistoryEntry::from_offer(item, offer);
            if let Err(e) = self.sink.append(&entry).await {
                tracing::error!(
                    wish_item_id = item.id,
                    site = %offer.site,
                    url = %offer.url_offer,
                    error = %e,
                    "failed to record price history"
                );
            }
        }

        ItemResult {
            wish_item: item.clone(),
            offers,
            failures,
        }
    }
}
