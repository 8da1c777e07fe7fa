//! Query evaluation
//!
//! [`MetricResolver`] is the sole entry point the server layer calls. It
//! parses each dashboard target into an expression tree, resolves leaves
//! against the catalog, and applies transformations bottom-up. Nesting
//! recurses through [`MetricResolver::resolve`]: a transformation resolves
//! its own sub-expression by calling back into the resolver with a smaller
//! expression and a (possibly shifted or extended) range.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::future::{join_all, try_join_all, BoxFuture};
use regex::Regex;
use serde::Deserialize;

use crate::catalog::{MetricCatalog, MetricDescriptor};
use crate::hub::{LogEntriesRequest, SampleProvider};
use crate::query::error::{QueryError, QueryResult};
use crate::query::expr::{parse_expression, Expression};
use crate::query::functions;
use crate::query::resolution::Resolution;
use crate::series::{Series, TimeRange};

/// One requested target as the dashboard sends it
///
/// Only `target` matters to the engine; any other request fields are
/// passthrough noise and ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryTarget {
    /// The query expression string
    pub target: String,
}

/// Resolves dashboard query expressions into series
pub struct MetricResolver {
    provider: Arc<dyn SampleProvider>,
    catalog: MetricCatalog,
}

impl MetricResolver {
    /// Create a resolver over the given provider
    pub fn new(provider: Arc<dyn SampleProvider>, catalog_ttl: Duration) -> Self {
        Self {
            catalog: MetricCatalog::new(Arc::clone(&provider), catalog_ttl),
            provider,
        }
    }

    /// Evaluate every target of a dashboard query request
    ///
    /// Targets resolve concurrently; the resulting series lists are
    /// flattened into one. A syntax error in any target fails the whole
    /// request; a half-rendered dashboard panel would silently lie.
    pub async fn evaluate_targets(
        &self,
        targets: &[QueryTarget],
        range: TimeRange,
    ) -> QueryResult<Vec<Series>> {
        tracing::debug!(count = targets.len(), ?range, "evaluating query targets");

        let resolved = try_join_all(targets.iter().map(|target| async move {
            let expression = parse_expression(&target.target)?;
            self.resolve(&expression, range).await
        }))
        .await?;

        Ok(resolved.into_iter().flatten().collect())
    }

    /// Matching `original_target` labels for autocomplete-style lookups
    ///
    /// An empty pattern returns every known label.
    pub async fn search_metrics(&self, pattern: &str) -> QueryResult<Vec<String>> {
        let matches = self.catalog.search(pattern).await?;
        Ok(matches
            .into_iter()
            .map(|descriptor| descriptor.original_target)
            .collect())
    }

    /// Resolve one expression over one range
    ///
    /// Boxed so transformations can recurse through it.
    pub fn resolve<'a>(
        &'a self,
        expression: &'a Expression,
        range: TimeRange,
    ) -> BoxFuture<'a, QueryResult<Vec<Series>>> {
        Box::pin(async move {
            match expression {
                Expression::Metric(pattern) => self.resolve_leaf(pattern, range).await,

                Expression::Alias { expr, label } => {
                    let series = self.resolve(expr, range).await?;
                    Ok(functions::apply_alias(series, label))
                }

                Expression::AliasSub {
                    expr,
                    pattern,
                    replacement,
                } => {
                    let regex = Regex::new(pattern).map_err(|error| {
                        QueryError::Syntax(format!(
                            "aliasSub regex '{pattern}' is not a valid regular expression: {error}"
                        ))
                    })?;
                    let series = self.resolve(expr, range).await?;
                    Ok(functions::apply_alias_sub(series, &regex, replacement))
                }

                Expression::Sum(inner) => {
                    let series = self.resolve(inner, range).await?;
                    Ok(functions::apply_sum(series, expression.to_string()))
                }

                Expression::Increase { expr, interval } => {
                    let shift = interval.as_millis();
                    // Fetch one interval of extra history so points near the
                    // start of the window still find their reference sample.
                    let series = self.resolve(expr, range.extended_back(shift)).await?;
                    Ok(functions::apply_increase(series, shift))
                }

                Expression::IncreaseRange(inner) => {
                    let series = self.resolve(inner, range).await?;
                    Ok(functions::apply_increase_range(series))
                }

                Expression::TimeShift { expr, interval } => {
                    let shift = interval.as_millis();
                    let series = self.resolve(expr, range.shifted_back(shift)).await?;
                    Ok(functions::apply_time_shift(series, shift))
                }
            }
        })
    }

    /// Leaf metric resolution: catalog search, resolution pick, fan-out
    /// fetch, trim
    async fn resolve_leaf(&self, pattern: &str, range: TimeRange) -> QueryResult<Vec<Series>> {
        let matches = self.catalog.search(pattern).await?;
        let resolution = Resolution::for_range(&range, Utc::now().timestamp_millis());

        tracing::debug!(
            pattern,
            %resolution,
            matched = matches.len(),
            "resolving leaf metric pattern"
        );

        let series = join_all(
            matches
                .iter()
                .map(|descriptor| self.fetch_series(descriptor, resolution)),
        )
        .await;

        Ok(series
            .into_iter()
            .map(|entry| trim_to_range(entry, &range))
            .collect())
    }

    /// Fetch one metric's samples, absorbing failures into an empty series
    ///
    /// One unreachable device must not take down the rest of the batch; the
    /// dashboard shows an empty line for it instead.
    async fn fetch_series(&self, descriptor: &MetricDescriptor, resolution: Resolution) -> Series {
        let target = descriptor.display_target();
        let request = LogEntriesRequest {
            uri: descriptor.uri.clone(),
            id: descriptor.id.clone(),
            resolution,
        };

        match self.provider.log_entries(&request).await {
            Ok(entries) => Series::new(target, entries.values, entries.step),
            Err(error) => {
                tracing::warn!(
                    metric = %descriptor.original_target,
                    %resolution,
                    %error,
                    "failed to fetch log entries, returning empty series"
                );
                Series::empty(target)
            }
        }
    }
}

/// Drop samples outside `[from - step, to + step]`
///
/// The hub returns whole resolution buckets, which over-fetch beyond the
/// requested window; one step of slack is kept on both ends to tolerate
/// boundary jitter.
fn trim_to_range(series: Series, range: &TimeRange) -> Series {
    let slack = series.step as i64;
    let datapoints = series
        .datapoints
        .into_iter()
        .filter(|point| {
            point.timestamp >= range.from - slack && point.timestamp <= range.to + slack
        })
        .collect();

    Series {
        target: series.target,
        datapoints,
        step: series.step,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::DEFAULT_CATALOG_TTL;
    use crate::hub::{HubError, HubMetric, LogEntries, UriInfo};
    use crate::series::SamplePoint;
    use async_trait::async_trait;
    use std::collections::HashMap;

    const HOUR: i64 = 3_600_000;
    const DAY: i64 = 24 * HOUR;
    const STEP: u64 = 60_000;

    /// Provider stub: fixed catalog, per-metric canned samples, optional
    /// per-metric failures
    struct StubProvider {
        metrics: Vec<HubMetric>,
        samples: HashMap<String, Vec<SamplePoint>>,
        failing: Vec<String>,
    }

    impl StubProvider {
        fn new() -> Self {
            Self {
                metrics: Vec::new(),
                samples: HashMap::new(),
                failing: Vec::new(),
            }
        }

        fn with_metric(mut self, device: &str, id: &str, samples: Vec<SamplePoint>) -> Self {
            self.metrics.push(HubMetric {
                id: id.to_string(),
                uri: format!("homey:device:{}", device.to_lowercase()),
                uri_obj: UriInfo {
                    name: device.to_string(),
                },
                kind: "number".to_string(),
                title: None,
                units: None,
                decimals: None,
            });
            self.samples.insert(id.to_string(), samples);
            self
        }

        fn with_failing_metric(mut self, device: &str, id: &str) -> Self {
            self = self.with_metric(device, id, Vec::new());
            self.failing.push(id.to_string());
            self
        }
    }

    #[async_trait]
    impl SampleProvider for StubProvider {
        async fn list_metrics(&self) -> Result<Vec<HubMetric>, HubError> {
            Ok(self.metrics.clone())
        }

        async fn log_entries(&self, request: &LogEntriesRequest) -> Result<LogEntries, HubError> {
            if self.failing.contains(&request.id) {
                return Err(HubError::Unreachable("device offline".to_string()));
            }
            Ok(LogEntries {
                values: self.samples.get(&request.id).cloned().unwrap_or_default(),
                step: STEP,
            })
        }
    }

    /// Provider whose catalog listing always fails
    struct BrokenProvider;

    #[async_trait]
    impl SampleProvider for BrokenProvider {
        async fn list_metrics(&self) -> Result<Vec<HubMetric>, HubError> {
            Err(HubError::Unreachable("hub down".to_string()))
        }

        async fn log_entries(&self, _request: &LogEntriesRequest) -> Result<LogEntries, HubError> {
            Err(HubError::Unreachable("hub down".to_string()))
        }
    }

    fn resolver(provider: StubProvider) -> MetricResolver {
        MetricResolver::new(Arc::new(provider), DEFAULT_CATALOG_TTL)
    }

    fn targets(expressions: &[&str]) -> Vec<QueryTarget> {
        expressions
            .iter()
            .map(|expression| QueryTarget {
                target: expression.to_string(),
            })
            .collect()
    }

    fn now_ms() -> i64 {
        Utc::now().timestamp_millis()
    }

    #[tokio::test]
    async fn test_evaluate_empty_targets_is_empty() {
        let resolver = resolver(StubProvider::new());
        let range = TimeRange::new(now_ms() - HOUR, now_ms());

        let series = resolver.evaluate_targets(&[], range).await.unwrap();
        assert!(series.is_empty());
    }

    #[tokio::test]
    async fn test_leaf_resolution_labels_and_samples() {
        let now = now_ms();
        let provider = StubProvider::new().with_metric(
            "Weer",
            "measure_temperature",
            vec![SamplePoint::new(Some(21.5), now - HOUR / 2)],
        );
        let resolver = resolver(provider);
        let range = TimeRange::new(now - HOUR, now);

        let series = resolver
            .evaluate_targets(&targets(&["measure_temperature"]), range)
            .await
            .unwrap();

        assert_eq!(series.len(), 1);
        assert_eq!(series[0].target, "Weer~measure_temperature");
        assert_eq!(series[0].step, STEP);
        assert_eq!(series[0].datapoints.len(), 1);
    }

    #[tokio::test]
    async fn test_leaf_resolution_trims_overfetched_padding() {
        let now = now_ms();
        let slack = STEP as i64;
        let provider = StubProvider::new().with_metric(
            "Weer",
            "measure_temperature",
            vec![
                // Far outside the window: dropped
                SamplePoint::new(Some(1.0), now - 3 * HOUR),
                // Within one step of the window edge: kept
                SamplePoint::new(Some(2.0), now - HOUR - slack / 2),
                // Inside: kept
                SamplePoint::new(Some(3.0), now - HOUR / 2),
            ],
        );
        let resolver = resolver(provider);
        let range = TimeRange::new(now - HOUR, now);

        let series = resolver
            .evaluate_targets(&targets(&["measure_temperature"]), range)
            .await
            .unwrap();

        let values: Vec<_> = series[0].datapoints.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![Some(2.0), Some(3.0)]);
    }

    #[tokio::test]
    async fn test_one_failing_metric_does_not_poison_batch() {
        let now = now_ms();
        let provider = StubProvider::new()
            .with_metric(
                "Meter",
                "meter_power",
                vec![SamplePoint::new(Some(5.0), now - HOUR / 2)],
            )
            .with_failing_metric("Heater", "meter_power_heater");
        let resolver = resolver(provider);
        let range = TimeRange::new(now - HOUR, now);

        let mut series = resolver
            .evaluate_targets(&targets(&["meter_power"]), range)
            .await
            .unwrap();

        assert_eq!(series.len(), 2);
        series.sort_by(|a, b| a.target.cmp(&b.target));
        assert_eq!(series[0].target, "Heater~meter_power_heater");
        assert!(series[0].datapoints.is_empty());
        assert_eq!(series[1].target, "Meter~meter_power");
        assert_eq!(series[1].datapoints.len(), 1);
    }

    #[tokio::test]
    async fn test_multiple_targets_flatten() {
        let now = now_ms();
        let provider = StubProvider::new()
            .with_metric(
                "Weer",
                "measure_temperature",
                vec![SamplePoint::new(Some(21.5), now - HOUR / 2)],
            )
            .with_metric(
                "Weer",
                "measure_pressure",
                vec![SamplePoint::new(Some(1013.0), now - HOUR / 2)],
            );
        let resolver = resolver(provider);
        let range = TimeRange::new(now - HOUR, now);

        let series = resolver
            .evaluate_targets(
                &targets(&["measure_temperature", "measure_pressure"]),
                range,
            )
            .await
            .unwrap();

        assert_eq!(series.len(), 2);
    }

    #[tokio::test]
    async fn test_alias_end_to_end() {
        let now = now_ms();
        let provider = StubProvider::new().with_metric(
            "Weer",
            "measure_temperature",
            vec![SamplePoint::new(Some(21.5), now - HOUR / 2)],
        );
        let resolver = resolver(provider);
        let range = TimeRange::new(now - HOUR, now);

        let series = resolver
            .evaluate_targets(
                &targets(&[r#"alias(measure_temperature, "Outside Temp")"#]),
                range,
            )
            .await
            .unwrap();

        assert_eq!(series[0].target, "Outside Temp");
        assert_eq!(series[0].datapoints[0].value, Some(21.5));
    }

    #[tokio::test]
    async fn test_sum_labels_with_query_text() {
        let now = now_ms();
        let provider = StubProvider::new()
            .with_metric(
                "MeterA",
                "meter_power_a",
                vec![SamplePoint::new(Some(1.0), now - HOUR / 2)],
            )
            .with_metric(
                "MeterB",
                "meter_power_b",
                vec![SamplePoint::new(Some(2.0), now - HOUR / 2)],
            );
        let resolver = resolver(provider);
        let range = TimeRange::new(now - HOUR, now);

        let series = resolver
            .evaluate_targets(&targets(&["sum(meter_power)"]), range)
            .await
            .unwrap();

        assert_eq!(series.len(), 1);
        assert_eq!(series[0].target, "sum(meter_power)");
        assert_eq!(series[0].datapoints[0].value, Some(3.0));
    }

    #[tokio::test]
    async fn test_time_shift_fetches_shifted_window() {
        let now = now_ms();
        // One sample a day ago, one in the current window. Only the
        // historical one falls inside the shifted fetch window; it comes
        // back moved forward by exactly one day.
        let historical = now - DAY - HOUR / 2;
        let provider = StubProvider::new().with_metric(
            "Meter",
            "meter_power",
            vec![
                SamplePoint::new(Some(7.0), historical),
                SamplePoint::new(Some(9.0), now - HOUR / 4),
            ],
        );
        let resolver = resolver(provider);
        let range = TimeRange::new(now - HOUR, now);

        let series = resolver
            .evaluate_targets(&targets(&["timeShift(meter_power, 1d)"]), range)
            .await
            .unwrap();

        assert_eq!(series[0].datapoints.len(), 1);
        assert_eq!(series[0].datapoints[0].value, Some(7.0));
        assert_eq!(series[0].datapoints[0].timestamp, historical + DAY);
        assert_eq!(series[0].step, STEP);
    }

    #[tokio::test]
    async fn test_increase_end_to_end() {
        let now = now_ms();
        let base = now - 4 * HOUR;
        let provider = StubProvider::new().with_metric(
            "Meter",
            "meter_power",
            vec![
                SamplePoint::new(Some(10.0), base),
                SamplePoint::new(Some(12.0), base + HOUR),
                SamplePoint::new(Some(15.0), base + 2 * HOUR),
                SamplePoint::new(Some(20.0), base + 3 * HOUR),
            ],
        );
        let resolver = resolver(provider);
        // Window covers the last three samples; the first is the extra
        // history pulled in by the extended fetch range.
        let range = TimeRange::new(base + HOUR, base + 3 * HOUR);

        let series = resolver
            .evaluate_targets(&targets(&["increase(meter_power, 1h)"]), range)
            .await
            .unwrap();

        let deltas: Vec<_> = series[0]
            .datapoints
            .iter()
            .map(|p| (p.value, p.timestamp))
            .collect();
        assert_eq!(
            deltas,
            vec![
                (Some(2.0), base + HOUR),
                (Some(3.0), base + 2 * HOUR),
                (Some(5.0), base + 3 * HOUR),
            ]
        );
    }

    #[tokio::test]
    async fn test_syntax_error_fails_whole_request() {
        let now = now_ms();
        let provider = StubProvider::new().with_metric(
            "Weer",
            "measure_temperature",
            vec![SamplePoint::new(Some(21.5), now - HOUR / 2)],
        );
        let resolver = resolver(provider);
        let range = TimeRange::new(now - HOUR, now);

        let result = resolver
            .evaluate_targets(
                &targets(&["measure_temperature", "increase(meter_power, 5x)"]),
                range,
            )
            .await;

        assert!(matches!(result, Err(QueryError::Syntax(_))));
    }

    #[tokio::test]
    async fn test_hub_failure_during_catalog_rebuild_is_fatal() {
        let resolver = MetricResolver::new(Arc::new(BrokenProvider), DEFAULT_CATALOG_TTL);
        let now = now_ms();
        let range = TimeRange::new(now - HOUR, now);

        let result = resolver
            .evaluate_targets(&targets(&["measure_temperature"]), range)
            .await;

        assert!(matches!(result, Err(QueryError::Hub(_))));
    }

    #[tokio::test]
    async fn test_search_metrics_returns_labels() {
        let provider = StubProvider::new()
            .with_metric("Weer", "measure_temperature", Vec::new())
            .with_metric("Weer", "measure_pressure", Vec::new());
        let resolver = resolver(provider);

        let all = resolver.search_metrics("").await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all[0].contains("measure_temperature"));

        let hits = resolver.search_metrics("pressure").await.unwrap();
        assert_eq!(hits, vec!["Weer~measure_pressure~homey:device:weer"]);
    }
}
