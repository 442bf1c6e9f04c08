//! Database operations for `scrape_runs` and `scrape_run_failures`.
//!
//! A run moves `queued` → `running` → `succeeded` | `failed`. Each
//! transition is guarded on the expected current status so that a stale
//! caller cannot overwrite a finished run.

use chrono::{DateTime, Utc};
use pricewatch_core::{ScrapeBatchResult, SiteFailure};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `scrape_runs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScrapeRunRow {
    pub id: i64,
    pub public_id: Uuid,
    pub trigger_source: String,
    pub status: String,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub items_processed: i32,
    pub offers_found: i32,
    pub failures_count: i32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A row from the `scrape_run_failures` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScrapeRunFailureRow {
    pub id: i64,
    pub scrape_run_id: i64,
    pub wish_item_id: i64,
    pub site: String,
    pub kind: String,
    pub message: Option<String>,
    pub snapshot_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Counters written when a run completes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrapeRunTotals {
    pub items_processed: i32,
    pub offers_found: i32,
    pub failures_count: i32,
}

impl ScrapeRunTotals {
    /// Builds totals from `usize` counts, saturating at `i32::MAX`.
    #[must_use]
    pub fn from_counts(items: usize, offers: usize, failures: usize) -> Self {
        let clamp = |n: usize| i32::try_from(n).unwrap_or(i32::MAX);
        Self {
            items_processed: clamp(items),
            offers_found: clamp(offers),
            failures_count: clamp(failures),
        }
    }
}

const RUN_COLUMNS: &str = "id, public_id, trigger_source, status, started_at, completed_at, \
     items_processed, offers_found, failures_count, error_message, created_at";

// ---------------------------------------------------------------------------
// scrape_runs operations
// ---------------------------------------------------------------------------

/// Creates a new scrape run in `queued` status.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_scrape_run(pool: &PgPool, trigger_source: &str) -> Result<ScrapeRunRow, DbError> {
    let public_id = Uuid::new_v4();

    let row = sqlx::query_as::<_, ScrapeRunRow>(&format!(
        "INSERT INTO scrape_runs (public_id, trigger_source, status) \
         VALUES ($1, $2, 'queued') \
         RETURNING {RUN_COLUMNS}"
    ))
    .bind(public_id)
    .bind(trigger_source)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Marks a queued run as `running` and sets `started_at = NOW()`.
///
/// # Errors
///
/// Returns [`DbError::InvalidScrapeRunTransition`] if the run is not queued,
/// or [`DbError::Sqlx`] if the update fails.
pub async fn start_scrape_run(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE scrape_runs \
         SET status = 'running', started_at = NOW() \
         WHERE id = $1 AND status = 'queued'",
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidScrapeRunTransition {
            id,
            expected_status: "queued",
        });
    }

    Ok(())
}

/// Marks a running run as `succeeded` and records its totals.
///
/// # Errors
///
/// Returns [`DbError::InvalidScrapeRunTransition`] if the run is not
/// running, or [`DbError::Sqlx`] if the update fails.
pub async fn complete_scrape_run(
    pool: &PgPool,
    id: i64,
    totals: ScrapeRunTotals,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE scrape_runs \
         SET status = 'succeeded', completed_at = NOW(), \
             items_processed = $1, offers_found = $2, failures_count = $3 \
         WHERE id = $4 AND status = 'running'",
    )
    .bind(totals.items_processed)
    .bind(totals.offers_found)
    .bind(totals.failures_count)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidScrapeRunTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// Marks a running run as `failed` with an error message.
///
/// # Errors
///
/// Returns [`DbError::InvalidScrapeRunTransition`] if the run is not
/// running, or [`DbError::Sqlx`] if the update fails.
pub async fn fail_scrape_run(pool: &PgPool, id: i64, error_message: &str) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE scrape_runs \
         SET status = 'failed', completed_at = NOW(), error_message = $1 \
         WHERE id = $2 AND status = 'running'",
    )
    .bind(error_message)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidScrapeRunTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// Fetches a run by its public UUID.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no run has that id, or [`DbError::Sqlx`]
/// if the query fails.
pub async fn get_scrape_run_by_public_id(
    pool: &PgPool,
    public_id: Uuid,
) -> Result<ScrapeRunRow, DbError> {
    sqlx::query_as::<_, ScrapeRunRow>(&format!(
        "SELECT {RUN_COLUMNS} FROM scrape_runs WHERE public_id = $1"
    ))
    .bind(public_id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Returns the most recent `limit` runs, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_scrape_runs(pool: &PgPool, limit: i64) -> Result<Vec<ScrapeRunRow>, DbError> {
    let rows = sqlx::query_as::<_, ScrapeRunRow>(&format!(
        "SELECT {RUN_COLUMNS} FROM scrape_runs \
         ORDER BY created_at DESC, id DESC \
         LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

// ---------------------------------------------------------------------------
// scrape_run_failures operations
// ---------------------------------------------------------------------------

/// Persists one site failure for a wish item, with its diagnostic snapshot
/// path when one was written.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn record_scrape_run_failure(
    pool: &PgPool,
    run_id: i64,
    wish_item_id: i64,
    failure: &SiteFailure,
) -> Result<(), DbError> {
    let snapshot_path = failure
        .diagnostic
        .as_ref()
        .and_then(|d| d.snapshot_path.as_ref().or(d.html_path.as_ref()))
        .map(|p| p.display().to_string());

    sqlx::query(
        "INSERT INTO scrape_run_failures \
             (scrape_run_id, wish_item_id, site, kind, message, snapshot_path) \
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(run_id)
    .bind(wish_item_id)
    .bind(failure.site.as_str())
    .bind(failure.kind.as_str())
    .bind(failure.message.as_deref())
    .bind(snapshot_path)
    .execute(pool)
    .await?;

    Ok(())
}

/// Returns every failure recorded for a run, in insertion order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_scrape_run_failures(
    pool: &PgPool,
    run_id: i64,
) -> Result<Vec<ScrapeRunFailureRow>, DbError> {
    let rows = sqlx::query_as::<_, ScrapeRunFailureRow>(
        "SELECT id, scrape_run_id, wish_item_id, site, kind, message, snapshot_path, created_at \
         FROM scrape_run_failures \
         WHERE scrape_run_id = $1 \
         ORDER BY id",
    )
    .bind(run_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Persists every failure in `batch` and marks the run `succeeded` with the
/// batch totals.
///
/// Individual failure rows that cannot be written are logged and skipped;
/// the run itself still completes.
///
/// # Errors
///
/// Returns [`DbError`] if the run cannot be marked complete.
pub async fn finish_scrape_run(
    pool: &PgPool,
    run_id: i64,
    batch: &ScrapeBatchResult,
) -> Result<ScrapeRunTotals, DbError> {
    for item in &batch.items {
        for failure in &item.failures {
            if let Err(e) = record_scrape_run_failure(pool, run_id, item.wish_item.id, failure).await
            {
                tracing::warn!(
                    run_id,
                    wish_item_id = item.wish_item.id,
                    site = %failure.site,
                    error = %e,
                    "failed to record scrape failure"
                );
            }
        }
    }

    let totals =
        ScrapeRunTotals::from_counts(batch.len(), batch.total_offers, batch.failure_count());
    complete_scrape_run(pool, run_id, totals).await?;
    Ok(totals)
}
