//! Core data types shared across the Hearth query engine
//!
//! This module defines the fundamental types used throughout the resolver:
//! - `SamplePoint`: A single (value, timestamp) sample
//! - `Series`: A labeled, time-ordered sequence of samples plus its step
//! - `TimeRange`: The wall-clock window a query covers

use serde::{Deserialize, Serialize};

/// A single sample in a series
///
/// `value` is `None` when the hub recorded an explicit gap for the bucket.
/// Missing samples are preserved as-is; transformations that cannot handle
/// gaps drop the point rather than inventing a value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplePoint {
    /// Measured value, or `None` for an explicit gap
    pub value: Option<f64>,
    /// Unix timestamp in milliseconds
    pub timestamp: i64,
}

impl SamplePoint {
    /// Create a new sample
    pub fn new(value: Option<f64>, timestamp: i64) -> Self {
        Self { value, timestamp }
    }
}

/// A labeled, time-ordered series of samples
///
/// `datapoints` are always sorted by ascending timestamp. Transformations
/// replace the vector wholesale; they never mutate points in place.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    /// Display label, mutable by alias/aliasSub transformations
    pub target: String,
    /// Ascending-timestamp samples
    pub datapoints: Vec<SamplePoint>,
    /// Sampling interval of the leaf fetch, in milliseconds
    ///
    /// Propagated unchanged through renaming and shifting: a shift moves
    /// timestamps, not the interval between them.
    pub step: u64,
}

impl Series {
    /// Create a series with no datapoints (used for failed per-metric fetches)
    pub fn empty(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            datapoints: Vec::new(),
            step: 0,
        }
    }

    /// Create a series from parts
    pub fn new(target: impl Into<String>, datapoints: Vec<SamplePoint>, step: u64) -> Self {
        Self {
            target: target.into(),
            datapoints,
            step,
        }
    }

    /// Replace the display label, keeping samples and step
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }
}

/// Time range for queries, in absolute wall-clock milliseconds
///
/// Always caller-supplied. Transformations derive shifted or extended copies
/// but never mutate the range they were given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    /// Start timestamp (inclusive), in milliseconds
    pub from: i64,
    /// End timestamp (inclusive), in milliseconds
    pub to: i64,
}

impl TimeRange {
    /// Create a new time range
    pub fn new(from: i64, to: i64) -> Self {
        Self { from, to }
    }

    /// A copy with both endpoints moved back by `millis`
    pub fn shifted_back(&self, millis: i64) -> Self {
        Self {
            from: self.from - millis,
            to: self.to - millis,
        }
    }

    /// A copy with only `from` moved back by `millis`, keeping `to`
    ///
    /// Used by delta-over-interval so enough history exists to find the
    /// reference sample for points near the start of the window.
    pub fn extended_back(&self, millis: i64) -> Self {
        Self {
            from: self.from - millis,
            to: self.to,
        }
    }

    /// Span of the range in milliseconds
    pub fn duration_millis(&self) -> i64 {
        self.to - self.from
    }
}
