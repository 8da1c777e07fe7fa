//! Search Route
//!
//! - POST /search - Metric label lookup for dashboard autocomplete

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::api::dto::SearchRequest;
use crate::api::error::ApiResult;
use crate::api::state::AppState;

/// POST /search
///
/// Returns the `original_target` labels matching the request pattern; an
/// absent or empty pattern returns every known metric.
pub async fn search_metrics(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SearchRequest>,
) -> ApiResult<Json<Vec<String>>> {
    let pattern = request.target.unwrap_or_default();
    let labels = state.resolver.search_metrics(&pattern).await?;
    Ok(Json(labels))
}
