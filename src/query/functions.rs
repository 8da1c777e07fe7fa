//! Transformation functions
//!
//! Each function consumes the series resolved for its sub-expression and
//! produces a transformed set. All of them are pure: ranges and input
//! series are never mutated, datapoint vectors are replaced wholesale.
//! Range derivation (shifting, extending) happens in the resolver before
//! the sub-expression is resolved; only the sample-level work lives here.

use regex::Regex;

use crate::query::align::{find_at, merge_sum};
use crate::series::{SamplePoint, Series};

/// `alias(expr, "label")`
///
/// Overwrites every result label with the literal. Datapoints untouched.
///
/// Example: `alias(measure_temperature, "Outside Temp")` resolves every
/// metric matching `measure_temperature` and shows each as "Outside Temp".
pub fn apply_alias(series: Vec<Series>, label: &str) -> Vec<Series> {
    series
        .into_iter()
        .map(|entry| entry.with_target(label))
        .collect()
}

/// `aliasSub(expr, "regex", "replacement")`
///
/// Rewrites each label by regex substitution against the current label,
/// with `$1`-style backreferences into the replacement.
///
/// Example: a metric labeled `Apps~net.i-dev.betterlogic-memusage` run
/// through `aliasSub(memusage, ".+?~(.*)-.*", "memory usage $1")` becomes
/// `memory usage net.i-dev.betterlogic`.
pub fn apply_alias_sub(series: Vec<Series>, pattern: &Regex, replacement: &str) -> Vec<Series> {
    series
        .into_iter()
        .map(|entry| {
            let rewritten = pattern.replace(&entry.target, replacement).into_owned();
            entry.with_target(rewritten)
        })
        .collect()
}

/// `sum(expr)`
///
/// Folds every resolved series into a single one by pairwise
/// timestamp-aligned merging, left to right. The result carries `label`
/// (the canonical query text). Folding zero series yields one series with
/// no datapoints, so a pattern that matches nothing still renders as an
/// empty chart line instead of disappearing.
pub fn apply_sum(series: Vec<Series>, label: String) -> Vec<Series> {
    let step = series.iter().map(|entry| entry.step).max().unwrap_or(0);
    let datapoints = series
        .iter()
        .fold(Vec::new(), |acc, entry| merge_sum(&acc, &entry.datapoints));

    vec![Series::new(label, datapoints, step)]
}

/// `increase(expr, interval)`
///
/// For every sample at time `t`, emits the delta against the sample at
/// exactly `t - interval`. The resolver already extended the fetch range
/// backward by one interval so the reference history exists. A point is
/// emitted only when its own value is non-null, the reference timestamp is
/// not before the first fetched sample, and a non-null sample exists at
/// exactly that timestamp; otherwise the point is dropped. No
/// interpolation: hub resolutions are fixed-step, so an aligned reference
/// either exists exactly or the history is genuinely missing.
pub fn apply_increase(series: Vec<Series>, interval_ms: i64) -> Vec<Series> {
    series
        .into_iter()
        .map(|entry| {
            let datapoints = entry
                .datapoints
                .iter()
                .filter_map(|point| {
                    let value = point.value?;
                    let reference = reference_value(&entry.datapoints, point.timestamp, interval_ms)?;
                    Some(SamplePoint::new(Some(value - reference), point.timestamp))
                })
                .collect();

            Series::new(entry.target, datapoints, entry.step)
        })
        .collect()
}

/// Non-null sample value at exactly `timestamp - interval_ms`, if that
/// reference time falls inside the fetched window
fn reference_value(points: &[SamplePoint], timestamp: i64, interval_ms: i64) -> Option<f64> {
    let reference_time = timestamp - interval_ms;
    if reference_time < points.first()?.timestamp {
        return None;
    }
    find_at(points, reference_time)?.value
}

/// `increaseRange(expr)`
///
/// Deltas against the first non-null sample of the range. Null-valued
/// points are dropped entirely; a series with no non-null sample at all
/// comes back empty.
pub fn apply_increase_range(series: Vec<Series>) -> Vec<Series> {
    series
        .into_iter()
        .map(|entry| {
            let baseline = entry.datapoints.iter().find_map(|point| point.value);
            let datapoints = match baseline {
                Some(baseline) => entry
                    .datapoints
                    .iter()
                    .filter_map(|point| {
                        let value = point.value?;
                        Some(SamplePoint::new(Some(value - baseline), point.timestamp))
                    })
                    .collect(),
                None => Vec::new(),
            };

            Series::new(entry.target, datapoints, entry.step)
        })
        .collect()
}

/// `timeShift(expr, interval)`
///
/// The sub-expression was resolved over a range shifted back by one
/// interval; moving every timestamp forward by the same amount renders the
/// historical data aligned with the current window. Values and step are
/// unchanged.
pub fn apply_time_shift(series: Vec<Series>, interval_ms: i64) -> Vec<Series> {
    series
        .into_iter()
        .map(|entry| {
            let datapoints = entry
                .datapoints
                .iter()
                .map(|point| SamplePoint::new(point.value, point.timestamp + interval_ms))
                .collect();

            Series::new(entry.target, datapoints, entry.step)
        })
        .collect()
}
