//! Sampling-resolution selection
//!
//! The hub stores every metric at a fixed ladder of sampling resolutions.
//! One bucket is picked per request from the requested time window; the
//! choice is never stored.

use serde::{Deserialize, Serialize};

use crate::series::TimeRange;

/// Multiplier applied to each ladder threshold so a window that is nominally
/// "the last 6 hours" still fits the `Last6Hours` bucket when the caller's
/// clock is slightly ahead or the range carries refresh jitter.
const RESOLUTION_BUFFER: f64 = 1.1;

const HOUR_MILLIS: f64 = 1000.0 * 60.0 * 60.0;
const DAYS_PER_MONTH: f64 = 365.25 / 12.0;

/// A sampling-resolution bucket the hub can serve
///
/// Serialized to the hub's camelCase labels (`lastHour`, `last6Hours`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Resolution {
    LastHour,
    Last6Hours,
    Last24Hours,
    Last3Days,
    Last7Days,
    Last14Days,
    Last31Days,
    Last3Months,
    Last6Months,
    Last2Years,
}

/// Fallback when the requested span exceeds the top of the ladder
pub const DEFAULT_RESOLUTION: Resolution = Resolution::Last6Hours;

impl Resolution {
    /// Pick the resolution bucket for a requested window
    ///
    /// The span is measured from `now_ms` back to `range.from` (not `to`):
    /// the hub's buckets all end at the present, so what matters is how far
    /// back the window reaches. Walks the ladder ascending and returns the
    /// first threshold the span fits under; a span past the top of the
    /// ladder logs a diagnostic and falls back to [`DEFAULT_RESOLUTION`].
    /// No input is rejected.
    pub fn for_range(range: &TimeRange, now_ms: i64) -> Resolution {
        let hours = (now_ms - range.from) as f64 / HOUR_MILLIS;

        if hours <= 1.0 * RESOLUTION_BUFFER {
            return Resolution::LastHour;
        }
        if hours <= 6.0 * RESOLUTION_BUFFER {
            return Resolution::Last6Hours;
        }
        if hours <= 24.0 * RESOLUTION_BUFFER {
            return Resolution::Last24Hours;
        }
        if hours <= 72.0 * RESOLUTION_BUFFER {
            return Resolution::Last3Days;
        }

        let days = hours / 24.0;
        if days <= 7.0 * RESOLUTION_BUFFER {
            return Resolution::Last7Days;
        }
        if days <= 14.0 * RESOLUTION_BUFFER {
            return Resolution::Last14Days;
        }
        if days <= 31.0 * RESOLUTION_BUFFER {
            return Resolution::Last31Days;
        }

        let months = days / DAYS_PER_MONTH;
        if months <= 3.0 * RESOLUTION_BUFFER {
            return Resolution::Last3Months;
        }
        if months <= 6.0 * RESOLUTION_BUFFER {
            return Resolution::Last6Months;
        }
        if months <= 24.0 * RESOLUTION_BUFFER {
            return Resolution::Last2Years;
        }

        tracing::warn!(
            from = range.from,
            to = range.to,
            "requested range exceeds the resolution ladder, using default"
        );
        DEFAULT_RESOLUTION
    }

    /// The hub's label for this bucket
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::LastHour => "lastHour",
            Resolution::Last6Hours => "last6Hours",
            Resolution::Last24Hours => "last24Hours",
            Resolution::Last3Days => "last3Days",
            Resolution::Last7Days => "last7Days",
            Resolution::Last14Days => "last14Days",
            Resolution::Last31Days => "last31Days",
            Resolution::Last3Months => "last3Months",
            Resolution::Last6Months => "last6Months",
            Resolution::Last2Years => "last2Years",
        }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: i64 = 3_600_000;
    const DAY: i64 = 24 * HOUR;
    const NOW: i64 = 1_700_000_000_000;

    fn range_back(millis: i64) -> TimeRange {
        TimeRange::new(NOW - millis, NOW)
    }

    #[test]
    fn test_ladder_boundaries() {
        assert_eq!(
            Resolution::for_range(&range_back(HOUR / 2), NOW),
            Resolution::LastHour
        );
        // Just inside the 1.1 buffer still counts as an hour window
        assert_eq!(
            Resolution::for_range(&range_back(HOUR + HOUR / 20), NOW),
            Resolution::LastHour
        );
        // Past the buffer rolls to the next bucket
        assert_eq!(
            Resolution::for_range(&range_back(HOUR + HOUR / 5), NOW),
            Resolution::Last6Hours
        );

        assert_eq!(
            Resolution::for_range(&range_back(6 * HOUR), NOW),
            Resolution::Last6Hours
        );
        assert_eq!(
            Resolution::for_range(&range_back(20 * HOUR), NOW),
            Resolution::Last24Hours
        );
        assert_eq!(
            Resolution::for_range(&range_back(3 * DAY), NOW),
            Resolution::Last3Days
        );
        assert_eq!(
            Resolution::for_range(&range_back(7 * DAY), NOW),
            Resolution::Last7Days
        );
        assert_eq!(
            Resolution::for_range(&range_back(14 * DAY), NOW),
            Resolution::Last14Days
        );
        assert_eq!(
            Resolution::for_range(&range_back(31 * DAY), NOW),
            Resolution::Last31Days
        );
        assert_eq!(
            Resolution::for_range(&range_back(80 * DAY), NOW),
            Resolution::Last3Months
        );
        assert_eq!(
            Resolution::for_range(&range_back(170 * DAY), NOW),
            Resolution::Last6Months
        );
        assert_eq!(
            Resolution::for_range(&range_back(700 * DAY), NOW),
            Resolution::Last2Years
        );
    }

    #[test]
    fn test_out_of_ladder_span_falls_back_to_default() {
        assert_eq!(
            Resolution::for_range(&range_back(5 * 365 * DAY), NOW),
            DEFAULT_RESOLUTION
        );
    }

    #[test]
    fn test_every_span_maps_to_exactly_one_bucket() {
        // Monotonic sweep: the picked bucket never moves back down the
        // ladder as the span grows.
        let order = |r: Resolution| match r {
            Resolution::LastHour => 0,
            Resolution::Last6Hours => 1,
            Resolution::Last24Hours => 2,
            Resolution::Last3Days => 3,
            Resolution::Last7Days => 4,
            Resolution::Last14Days => 5,
            Resolution::Last31Days => 6,
            Resolution::Last3Months => 7,
            Resolution::Last6Months => 8,
            Resolution::Last2Years => 9,
        };

        let mut last = 0;
        for hours_back in 1..(24 * 31 * 20) {
            let picked = Resolution::for_range(&range_back(hours_back * HOUR), NOW);
            if picked == DEFAULT_RESOLUTION && last > order(DEFAULT_RESOLUTION) {
                // Fell off the top of the ladder
                break;
            }
            assert!(order(picked) >= last, "ladder regressed at {hours_back}h");
            last = order(picked);
        }
    }

    #[test]
    fn test_hub_labels() {
        assert_eq!(Resolution::LastHour.to_string(), "lastHour");
        assert_eq!(Resolution::Last2Years.to_string(), "last2Years");
        assert_eq!(
            serde_json::to_string(&Resolution::Last6Hours).unwrap(),
            "\"last6Hours\""
        );
    }
}
