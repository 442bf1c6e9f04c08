use crate::wish::truncate;

/// Print recorded prices, newest first.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub(crate) async fn run_history(
    pool: &sqlx::PgPool,
    item: Option<i64>,
    limit: i64,
) -> anyhow::Result<()> {
    let rows = pricewatch_db::list_price_history(pool, item, limit.max(1)).await?;

    if rows.is_empty() {
        println!(
            "no prices recorded{}; run `scrape` first",
            item.map(|id| format!(" for wish item #{id}"))
                .unwrap_or_default()
        );
        return Ok(());
    }

    println!(
        "{:<18}{:<15}{:>12}  {:<30}URL",
        "CAPTURED", "SITE", "PRICE", "ITEM"
    );
    for row in &rows {
        println!(
            "{:<18}{:<15}{:>12}  {:<30}{}",
            row.captured_at.format("%Y-%m-%d %H:%M"),
            row.site,
            format!("R$ {}", row.price),
            truncate(&row.wish_item_name, 28),
            row.url_offer
        );
    }

    Ok(())
}
