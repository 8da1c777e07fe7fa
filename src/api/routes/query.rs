//! Query Route
//!
//! - POST /query - Evaluate dashboard query targets

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::api::dto::{QueryRequest, SeriesDto};
use crate::api::error::ApiResult;
use crate::api::state::AppState;

/// POST /query
///
/// Evaluate every target in the request over the shared range and return
/// one series list, ready for charting.
pub async fn query_metrics(
    State(state): State<Arc<AppState>>,
    Json(request): Json<QueryRequest>,
) -> ApiResult<Json<Vec<SeriesDto>>> {
    let range = request.range.to_time_range()?;

    tracing::debug!(targets = request.targets.len(), "evaluating query request");

    let series = state
        .resolver
        .evaluate_targets(&request.targets, range)
        .await?;

    Ok(Json(series.into_iter().map(SeriesDto::from).collect()))
}
