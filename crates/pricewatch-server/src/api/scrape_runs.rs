use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct ScrapeRunsQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct ScrapeRunItem {
    scrape_run_id: Uuid,
    trigger_source: String,
    status: String,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    items_processed: i32,
    offers_found: i32,
    failures_count: i32,
    error_message: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<pricewatch_db::ScrapeRunRow> for ScrapeRunItem {
    fn from(row: pricewatch_db::ScrapeRunRow) -> Self {
        Self {
            scrape_run_id: row.public_id,
            trigger_source: row.trigger_source,
            status: row.status,
            started_at: row.started_at,
            completed_at: row.completed_at,
            items_processed: row.items_processed,
            offers_found: row.offers_found,
            failures_count: row.failures_count,
            error_message: row.error_message,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct ScrapeFailureItem {
    wish_item_id: i64,
    site: String,
    kind: String,
    message: Option<String>,
    snapshot_path: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub(super) struct ScrapeRunDetail {
    #[serde(flatten)]
    run: ScrapeRunItem,
    failures: Vec<ScrapeFailureItem>,
}

#[derive(Debug, Serialize)]
pub(super) struct TriggeredRun {
    scrape_run_id: Uuid,
    status: String,
}

pub(super) async fn list_scrape_runs(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ScrapeRunsQuery>,
) -> Result<Json<ApiResponse<Vec<ScrapeRunItem>>>, ApiError> {
    let rows = pricewatch_db::list_scrape_runs(&state.pool, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(ScrapeRunItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn get_scrape_run(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(run_id): Path<Uuid>,
) -> Result<Json<ApiResponse<ScrapeRunDetail>>, ApiError> {
    let run = pricewatch_db::get_scrape_run_by_public_id(&state.pool, run_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    let failures = pricewatch_db::list_scrape_run_failures(&state.pool, run.id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let failures = failures
        .into_iter()
        .map(|f| ScrapeFailureItem {
            wish_item_id: f.wish_item_id,
            site: f.site,
            kind: f.kind,
            message: f.message,
            snapshot_path: f.snapshot_path,
            created_at: f.created_at,
        })
        .collect();

    Ok(Json(ApiResponse {
        data: ScrapeRunDetail {
            run: run.into(),
            failures,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// Queues a full-batch scrape and returns immediately with `202 Accepted`.
pub(super) async fn trigger_scrape_run(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<(StatusCode, Json<ApiResponse<TriggeredRun>>), ApiError> {
    let run = state
        .runner
        .trigger("api")
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| {
            ApiError::new(
                req_id.0.clone(),
                "conflict",
                "a scrape batch is already running",
            )
        })?;

    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse {
            data: TriggeredRun {
                scrape_run_id: run.public_id,
                status: run.status,
            },
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}
