use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct WishItemSummary {
    id: i64,
    name: String,
    url: Option<String>,
    priority: i32,
    created_at: DateTime<Utc>,
}

/// Lists the wish list in the order a batch visits it.
pub(super) async fn list_wish_items(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<WishItemSummary>>>, ApiError> {
    let rows = pricewatch_db::list_wish_items(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| WishItemSummary {
            id: row.id,
            name: row.name,
            url: row.url,
            priority: row.priority,
            created_at: row.created_at,
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}
