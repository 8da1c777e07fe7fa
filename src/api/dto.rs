//! Data Transfer Objects
//!
//! Request and response types for the dashboard-facing endpoints. The wire
//! shapes follow the generic JSON time-series datasource protocol: each
//! response element maps 1:1 to one chart series, datapoints are
//! `[value, timestampMs]` pairs.

use serde::{Deserialize, Serialize};

use crate::api::error::{ApiError, ApiResult};
use crate::query::QueryTarget;
use crate::series::{Series, TimeRange};

/// Dashboard query request
#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    /// Query expressions to evaluate; extra per-target fields (refId,
    /// hide, type, ...) are ignored
    #[serde(default)]
    pub targets: Vec<QueryTarget>,
    /// Time window shared by all targets
    pub range: RangeDto,
}

/// Time range specification
#[derive(Debug, Deserialize)]
pub struct RangeDto {
    /// Start time (RFC 3339 or epoch milliseconds)
    pub from: String,
    /// End time (RFC 3339 or epoch milliseconds)
    pub to: String,
}

impl RangeDto {
    /// Convert to the engine's millisecond range
    pub fn to_time_range(&self) -> ApiResult<TimeRange> {
        Ok(TimeRange::new(
            parse_timestamp(&self.from)?,
            parse_timestamp(&self.to)?,
        ))
    }
}

/// Parse a timestamp string as epoch milliseconds or RFC 3339
fn parse_timestamp(raw: &str) -> ApiResult<i64> {
    if let Ok(millis) = raw.parse::<i64>() {
        return Ok(millis);
    }

    if let Ok(datetime) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Ok(datetime.timestamp_millis());
    }

    Err(ApiError::Validation(format!(
        "Cannot parse timestamp: {raw}"
    )))
}

/// Metric search request
#[derive(Debug, Default, Deserialize)]
pub struct SearchRequest {
    /// Pattern to match; absent or empty returns every known metric
    #[serde(default)]
    pub target: Option<String>,
}

/// One chart series in a query response
#[derive(Debug, Serialize)]
pub struct SeriesDto {
    /// Display label
    pub target: String,
    /// `[value, timestampMs]` pairs, ascending by timestamp
    pub datapoints: Vec<(Option<f64>, i64)>,
}

impl From<Series> for SeriesDto {
    fn from(series: Series) -> Self {
        Self {
            target: series.target,
            datapoints: series
                .datapoints
                .into_iter()
                .map(|point| (point.value, point.timestamp))
                .collect(),
        }
    }
}
