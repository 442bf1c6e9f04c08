//! Database operations for `wish_items`.

use chrono::{DateTime, Utc};
use pricewatch_core::WishItem;
use sqlx::PgPool;

use crate::DbError;

/// A row from the `wish_items` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WishItemRow {
    pub id: i64,
    pub name: String,
    /// Optional reference link kept for the user; not used for searching.
    pub url: Option<String>,
    pub priority: i32,
    pub created_at: DateTime<Utc>,
}

impl WishItemRow {
    /// The search input the scraper works from: the name is the search term.
    #[must_use]
    pub fn to_wish_item(&self) -> WishItem {
        WishItem::new(self.id, self.name.clone())
    }
}

/// Inserts a wish item and returns the stored row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (including a blank name,
/// which the schema rejects).
pub async fn insert_wish_item(
    pool: &PgPool,
    name: &str,
    url: Option<&str>,
    priority: i32,
) -> Result<WishItemRow, DbError> {
    let row = sqlx::query_as::<_, WishItemRow>(
        "INSERT INTO wish_items (name, url, priority) \
         VALUES ($1, $2, $3) \
         RETURNING id, name, url, priority, created_at",
    )
    .bind(name.trim())
    .bind(url)
    .bind(priority)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Returns every wish item, highest priority first, then oldest first.
///
/// The order is stable for the duration of a batch.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_wish_items(pool: &PgPool) -> Result<Vec<WishItemRow>, DbError> {
    let rows = sqlx::query_as::<_, WishItemRow>(
        "SELECT id, name, url, priority, created_at \
         FROM wish_items \
         ORDER BY priority DESC, id ASC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Fetches a single wish item by `id`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_wish_item(pool: &PgPool, id: i64) -> Result<WishItemRow, DbError> {
    sqlx::query_as::<_, WishItemRow>(
        "SELECT id, name, url, priority, created_at \
         FROM wish_items \
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}
