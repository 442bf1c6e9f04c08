//! `scrape` subcommand: run one orchestrator batch from the terminal.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use pricewatch_core::{
    AppConfig, HistoryEntry, HistoryError, HistorySink, ScrapeBatchResult, WishItem,
};
use pricewatch_db::ScrapeRunTotals;
use pricewatch_scraper::{BatchEvent, BatchNotifier};

/// What a `scrape` invocation should search for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ScrapeTarget {
    /// Every wish item, in priority order.
    All,
    /// A single stored wish item.
    Item(i64),
    /// A free-text term that is not on the wish list.
    Term(String),
}

/// Id given to the synthetic wish item built for `--term`.
const AD_HOC_ITEM_ID: i64 = 0;

/// Prints batch milestones to stdout.
struct ConsoleNotifier;

impl BatchNotifier for ConsoleNotifier {
    fn notify(&self, event: &BatchEvent) {
        match event {
            BatchEvent::Started { items } => println!("scraping {items} wish item(s)..."),
            BatchEvent::Succeeded { offers } => println!("batch finished: {offers} offers found"),
            BatchEvent::Failed { message } => eprintln!("batch failed: {message}"),
        }
    }
}

/// Sink for dry runs and ad hoc terms: logs observations instead of storing
/// them.
struct LogOnlySink;

#[async_trait]
impl HistorySink for LogOnlySink {
    async fn append(&self, entry: &HistoryEntry) -> Result<(), HistoryError> {
        tracing::info!(
            wish_item_id = entry.wish_item_id,
            site = %entry.site,
            price = %entry.price,
            url = %entry.url_offer,
            "offer (not stored)"
        );
        Ok(())
    }
}

/// Run a scrape batch.
///
/// Persisted runs are tracked in `scrape_runs`; when setup fails after the
/// run row exists the run is marked `failed` before the error is returned.
///
/// # Errors
///
/// Returns an error if the wish list cannot be loaded, the run cannot be
/// tracked, or the scraper cannot be built.
pub(crate) async fn run_scrape(
    config: &AppConfig,
    target: ScrapeTarget,
    dry_run: bool,
) -> anyhow::Result<()> {
    if let ScrapeTarget::Term(term) = target {
        let term = term.trim();
        if term.is_empty() {
            anyhow::bail!("--term must not be blank");
        }
        let items = vec![WishItem::new(AD_HOC_ITEM_ID, term)];
        let batch = run_unstored(config, &items).await?;
        print_summary(&batch);
        return Ok(());
    }

    let pool = crate::connect(config).await?;
    let items = load_items(&pool, &target).await?;
    if items.is_empty() {
        println!("wish list is empty; add one with `wish add <name>`");
        return Ok(());
    }

    if dry_run {
        println!("dry run: prices will not be stored");
        let batch = run_unstored(config, &items).await?;
        print_summary(&batch);
        return Ok(());
    }

    let run = pricewatch_db::create_scrape_run(&pool, "cli").await?;
    if let Err(err) = pricewatch_db::start_scrape_run(&pool, run.id).await {
        fail_run_best_effort(&pool, run.id, format!("{err:#}")).await;
        return Err(err.into());
    }

    let sink = Arc::new(pricewatch_db::PgHistorySink::for_run(pool.clone(), run.id));
    let orchestrator = match pricewatch_scraper::build_orchestrator(config, sink) {
        Ok(orchestrator) => orchestrator.with_notifier(Arc::new(ConsoleNotifier)),
        Err(err) => {
            fail_run_best_effort(&pool, run.id, format!("{err:#}")).await;
            return Err(err.into());
        }
    };

    let batch = orchestrator.run(&items).await;
    let finish = pricewatch_db::finish_scrape_run(&pool, run.id, &batch);
    let totals = settle_run(&pool, run.id, finish).await?;
    tracing::info!(
        run_id = run.id,
        public_id = %run.public_id,
        items = totals.items_processed,
        offers = totals.offers_found,
        failures = totals.failures_count,
        "scrape run completed"
    );
    print_summary(&batch);
    Ok(())
}

async fn load_items(pool: &sqlx::PgPool, target: &ScrapeTarget) -> anyhow::Result<Vec<WishItem>> {
    let items = match target {
        ScrapeTarget::Item(id) => vec![pricewatch_db::get_wish_item(pool, *id)
            .await?
            .to_wish_item()],
        ScrapeTarget::All | ScrapeTarget::Term(_) => pricewatch_db::list_wish_items(pool)
            .await?
            .iter()
            .map(pricewatch_db::WishItemRow::to_wish_item)
            .collect(),
    };
    Ok(items)
}

async fn run_unstored(
    config: &AppConfig,
    items: &[WishItem],
) -> anyhow::Result<ScrapeBatchResult> {
    let orchestrator = pricewatch_scraper::build_orchestrator(config, Arc::new(LogOnlySink))?
        .with_notifier(Arc::new(ConsoleNotifier));
    Ok(orchestrator.run(items).await)
}

fn print_summary(batch: &ScrapeBatchResult) {
    for line in summary_lines(batch) {
        println!("{line}");
    }
}

/// Per-item table followed by the batch total.
pub(crate) fn summary_lines(batch: &ScrapeBatchResult) -> Vec<String> {
    let mut lines = Vec::with_capacity(batch.len() + 2);
    lines.push(format!("{:<40}{:>8}  FAILURES", "ITEM", "OFFERS"));
    for item in &batch.items {
        let failures = if item.failures.is_empty() {
            "-".to_string()
        } else {
            item.failures
                .iter()
                .map(|f| format!("{}:{}", f.site, f.kind))
                .collect::<Vec<_>>()
                .join(", ")
        };
        lines.push(format!(
            "{:<40}{:>8}  {}",
            crate::wish::truncate(&item.wish_item.search_term, 38),
            item.offers.len(),
            failures
        ));
    }
    lines.push(format!("{} offers found", batch.total_offers));
    lines
}

/// Awaits the write that completes a run. When it fails the run is marked
/// failed before the error is returned, so it never stays `running`.
pub(crate) async fn settle_run<F>(
    pool: &sqlx::PgPool,
    run_id: i64,
    finish: F,
) -> anyhow::Result<ScrapeRunTotals>
where
    F: Future<Output = Result<ScrapeRunTotals, pricewatch_db::DbError>>,
{
    match finish.await {
        Ok(totals) => Ok(totals),
        Err(err) => {
            fail_run_best_effort(pool, run_id, format!("{err:#}")).await;
            Err(err.into())
        }
    }
}

/// Attempt to mark a scrape run as failed, logging any secondary error.
async fn fail_run_best_effort(pool: &sqlx::PgPool, run_id: i64, message: String) {
    if let Err(mark_err) = pricewatch_db::fail_scrape_run(pool, run_id, &message).await {
        tracing::error!(
            run_id,
            error = %mark_err,
            "failed to mark scrape run as failed"
        );
    }
}
