use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct PriceHistoryQuery {
    pub wish_item_id: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct PriceHistoryItem {
    wish_item_id: i64,
    wish_item_name: String,
    site: String,
    price: Decimal,
    currency_code: String,
    url_offer: String,
    installment_details: String,
    captured_at: DateTime<Utc>,
}

pub(super) async fn list_price_history(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<PriceHistoryQuery>,
) -> Result<Json<ApiResponse<Vec<PriceHistoryItem>>>, ApiError> {
    if query.wish_item_id.is_some_and(|id| id <= 0) {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "wish_item_id must be positive",
        ));
    }

    let rows = pricewatch_db::list_price_history(
        &state.pool,
        query.wish_item_id,
        normalize_limit(query.limit),
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| PriceHistoryItem {
            wish_item_id: row.wish_item_id,
            wish_item_name: row.wish_item_name,
            site: row.site,
            price: row.price,
            currency_code: row.currency_code,
            url_offer: row.url_offer,
            installment_details: row.installment_details,
            captured_at: row.captured_at,
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}
