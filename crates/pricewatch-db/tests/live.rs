//! Live integration tests for pricewatch-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database from the sqlx
//! test harness. They need `DATABASE_URL` and are ignored by default; run
//! with `cargo test -p pricewatch-db -- --ignored`.

use std::path::PathBuf;

use chrono::Utc;
use pricewatch_core::{
    DiagnosticRecord, FailureKind, HistoryEntry, HistorySink, Site, SiteFailure,
};
use pricewatch_db::{
    complete_scrape_run, create_scrape_run, fail_scrape_run, get_scrape_run_by_public_id,
    get_wish_item, insert_wish_item, list_price_history, list_scrape_run_failures,
    list_scrape_runs, list_wish_items, record_scrape_run_failure, start_scrape_run, DbError,
    PgHistorySink, ScrapeRunTotals,
};
use uuid::Uuid;

fn entry(wish_item_id: i64, price: &str) -> HistoryEntry {
    HistoryEntry {
        wish_item_id,
        wish_item_name: "cadeira gamer".to_string(),
        site: Site::MercadoLivre,
        price: price.parse().unwrap(),
        url_offer: "https://produto.mercadolivre.com.br/MLB-1".to_string(),
        installment_details: "12x R$ 66,66".to_string(),
    }
}

// ---------------------------------------------------------------------------
// wish_items
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn wish_items_list_by_priority(pool: sqlx::PgPool) {
    let low = insert_wish_item(&pool, "mesa", None, 0).await.unwrap();
    let high = insert_wish_item(&pool, "  cadeira gamer ", Some("https://x.test"), 5)
        .await
        .unwrap();

    assert_eq!(high.name, "cadeira gamer");
    let ids: Vec<i64> = list_wish_items(&pool)
        .await
        .unwrap()
        .iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(ids, vec![high.id, low.id]);

    assert!(matches!(
        get_wish_item(&pool, 9_999).await,
        Err(DbError::NotFound)
    ));
}

// ---------------------------------------------------------------------------
// price_history
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn sink_appends_one_row_per_entry(pool: sqlx::PgPool) {
    let run = create_scrape_run(&pool, "test").await.unwrap();
    let sink = PgHistorySink::for_run(pool.clone(), run.id);

    sink.append(&entry(1, "799.90")).await.unwrap();
    sink.append(&entry(1, "749.90")).await.unwrap();
    sink.append(&entry(2, "99.00")).await.unwrap();

    let rows = list_price_history(&pool, Some(1), 10).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.scrape_run_id == Some(run.id)));
    assert!(rows.iter().all(|r| r.currency_code == "BRL"));
    assert_eq!(rows[0].site, "mercado_livre");

    let all = list_price_history(&pool, None, 10).await.unwrap();
    assert_eq!(all.len(), 3);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn sink_reports_rejected_rows(pool: sqlx::PgPool) {
    let sink = PgHistorySink::new(pool);
    let err = sink.append(&entry(1, "0.00")).await.unwrap_err();
    assert!(err.to_string().contains("history write failed"));
}

// ---------------------------------------------------------------------------
// scrape_runs
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn scrape_run_lifecycle_queued_to_succeeded(pool: sqlx::PgPool) {
    let run = create_scrape_run(&pool, "cli").await.unwrap();
    assert_eq!(run.status, "queued");

    start_scrape_run(&pool, run.id).await.unwrap();
    complete_scrape_run(&pool, run.id, ScrapeRunTotals::from_counts(2, 5, 1))
        .await
        .unwrap();

    let stored = get_scrape_run_by_public_id(&pool, run.public_id)
        .await
        .unwrap();
    assert_eq!(stored.status, "succeeded");
    assert_eq!(stored.offers_found, 5);
    assert!(stored.completed_at.is_some());

    let err = fail_scrape_run(&pool, run.id, "late").await.unwrap_err();
    assert!(matches!(
        err,
        DbError::InvalidScrapeRunTransition {
            expected_status: "running",
            ..
        }
    ));
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn failures_are_recorded_with_snapshot_path(pool: sqlx::PgPool) {
    let run = create_scrape_run(&pool, "scheduler").await.unwrap();
    start_scrape_run(&pool, run.id).await.unwrap();

    let failure = SiteFailure {
        site: Site::Amazon,
        kind: FailureKind::CaptchaDetected,
        message: Some("soft block".to_string()),
        diagnostic: Some(DiagnosticRecord {
            id: Uuid::new_v4(),
            captured_at: Utc::now(),
            site: Site::Amazon,
            kind: FailureKind::CaptchaDetected,
            snapshot_path: Some(PathBuf::from("/tmp/diag/a.png")),
            html_path: None,
        }),
    };
    record_scrape_run_failure(&pool, run.id, 7, &failure)
        .await
        .unwrap();

    let rows = list_scrape_run_failures(&pool, run.id).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].kind, "captcha_detected");
    assert_eq!(rows[0].snapshot_path.as_deref(), Some("/tmp/diag/a.png"));

    fail_scrape_run(&pool, run.id, "all site searches failed")
        .await
        .unwrap();
    let runs = list_scrape_runs(&pool, 10).await.unwrap();
    assert_eq!(runs[0].status, "failed");
}
