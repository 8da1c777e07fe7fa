//! Hearth Query Engine
//!
//! Resolves dashboard query expressions into time series:
//!
//! - **Expr**: expression grammar and nom parser
//! - **Resolution**: sampling-resolution ladder selection
//! - **Align**: ordered-array search and timestamp-aligned merging
//! - **Functions**: the six transformation calls
//! - **Resolver**: recursive evaluation against the catalog and provider
//!
//! # Query Language
//!
//! A target is either a metric pattern (literal substring or `/regex/`)
//! or one of a fixed set of transformation calls, nested arbitrarily:
//!
//! ```text
//! measure_temperature
//! alias(measure_temperature, "Outside Temp")
//! aliasSub(measure_temperature, "(Thermometer\s+)(.*?)~.*", "$2")
//! sum(/Energiemeter.*power/)
//! increase(meter_power, 7d)
//! increaseRange(meter_power)
//! timeShift(sum(meter_power), 1d)
//! ```

mod align;
mod error;
mod expr;
mod functions;
mod resolution;
mod resolver;

pub use align::{find_at, find_index, merge_sum};
pub use error::{QueryError, QueryResult};
pub use expr::{parse_expression, Expression, Interval, IntervalUnit};
pub use resolution::{Resolution, DEFAULT_RESOLUTION};
pub use resolver::{MetricResolver, QueryTarget};
