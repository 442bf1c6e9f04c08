//! Database operations for `price_history`, and the Postgres
//! [`HistorySink`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pricewatch_core::{HistoryEntry, HistoryError, HistorySink, CURRENCY_CODE};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::DbError;

/// A row from the `price_history` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PriceHistoryRow {
    pub id: i64,
    pub wish_item_id: i64,
    pub wish_item_name: String,
    /// Stored as the site's storage name, e.g. `mercado_livre`.
    pub site: String,
    pub price: Decimal,
    pub currency_code: String,
    pub url_offer: String,
    pub installment_details: String,
    pub scrape_run_id: Option<i64>,
    pub captured_at: DateTime<Utc>,
}

/// Appends one observation. Returns the new row id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_price_history(
    pool: &PgPool,
    entry: &HistoryEntry,
    scrape_run_id: Option<i64>,
) -> Result<i64, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO price_history \
             (wish_item_id, wish_item_name, site, price, currency_code, url_offer, \
              installment_details, scrape_run_id) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         RETURNING id",
    )
    .bind(entry.wish_item_id)
    .bind(&entry.wish_item_name)
    .bind(entry.site.as_str())
    .bind(entry.price.round_dp(2))
    .bind(CURRENCY_CODE)
    .bind(&entry.url_offer)
    .bind(&entry.installment_details)
    .bind(scrape_run_id)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Returns the most recent `limit` observations, optionally for one wish
/// item, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_price_history(
    pool: &PgPool,
    wish_item_id: Option<i64>,
    limit: i64,
) -> Result<Vec<PriceHistoryRow>, DbError> {
    let rows = sqlx::query_as::<_, PriceHistoryRow>(
        "SELECT id, wish_item_id, wish_item_name, site, price, currency_code, \
                url_offer, installment_details, scrape_run_id, captured_at \
         FROM price_history \
         WHERE ($1::BIGINT IS NULL OR wish_item_id = $1) \
         ORDER BY captured_at DESC, id DESC \
         LIMIT $2",
    )
    .bind(wish_item_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// [`HistorySink`] writing one `price_history` row per append.
#[derive(Debug, Clone)]
pub struct PgHistorySink {
    pool: PgPool,
    scrape_run_id: Option<i64>,
}

impl PgHistorySink {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            scrape_run_id: None,
        }
    }

    /// Tags every appended row with the run that produced it.
    #[must_use]
    pub fn for_run(pool: PgPool, scrape_run_id: i64) -> Self {
        Self {
            pool,
            scrape_run_id: Some(scrape_run_id),
        }
    }
}

#[async_trait]
impl HistorySink for PgHistorySink {
    async fn append(&self, entry: &HistoryEntry) -> Result<(), HistoryError> {
        insert_price_history(&self.pool, entry, self.scrape_run_id)
            .await
            .map(|_| ())
            .map_err(|e| HistoryError::Write(e.to_string()))
    }
}
