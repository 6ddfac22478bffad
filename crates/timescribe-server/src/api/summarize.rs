use axum::extract::State;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use timescribe_traits::DateRange;
use tracing::info;

use crate::api::caller::CallerId;
use crate::api::error::{ApiError, ApiResult};
use crate::api::extract::Json;
use crate::api::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SummarizeRequest {
    pub date_start: String,
    pub date_end: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SummarizeResponse {
    pub summary: String,
}

fn parse_date(field: &str, value: &str) -> ApiResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        ApiError::bad_request(format!("{} must be an ISO date (YYYY-MM-DD)", field))
    })
}

/// POST /summarize - prose summary of the caller's memories in a date range.
pub async fn summarize(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
    Json(request): Json<SummarizeRequest>,
) -> ApiResult<Json<SummarizeResponse>> {
    let range = DateRange::new(
        parse_date("date_start", &request.date_start)?,
        parse_date("date_end", &request.date_end)?,
    );

    match state.journal.summarize(&user_id, range).await? {
        Some(summary) => {
            info!(user_id = %user_id, start = %range.start, end = %range.end, "Summary produced");
            Ok(Json(SummarizeResponse { summary }))
        }
        None => Err(ApiError::not_found("No memories found")),
    }
}
