//! # Hearth
//!
//! Time-series query bridge between a home-automation hub and JSON
//! dashboard datasources.
//!
//! Dashboards write small composable query expressions instead of raw
//! metric identifiers; Hearth resolves them against the hub's metric
//! catalog, fetches raw samples at a resolution fitting the requested
//! window, and applies transformations bottom-up:
//!
//! ```text
//! alias(measure_temperature, "Outside Temp")
//! sum(/Energiemeter.*power/)
//! increase(meter_power, 7d)
//! timeShift(sum(meter_power), 1d)
//! ```
//!
//! ## Modules
//!
//! - [`hub`]: provider boundary to the hub's insights API
//! - [`catalog`]: TTL-cached metric catalog with pattern search
//! - [`query`]: expression parser, resolution ladder, transformations,
//!   and the recursive resolver
//! - [`api`]: dashboard-facing HTTP server with Axum
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hearth::catalog::DEFAULT_CATALOG_TTL;
//! use hearth::hub::{HubClient, HubConfig};
//! use hearth::query::{MetricResolver, QueryTarget};
//! use hearth::series::TimeRange;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let hub = HubClient::connect(HubConfig {
//!         base_url: "http://homey.local".into(),
//!         token: std::env::var("HEARTH_HUB_TOKEN")?,
//!         request_timeout_ms: 10_000,
//!     })
//!     .await?;
//!
//!     let resolver = MetricResolver::new(Arc::new(hub), DEFAULT_CATALOG_TTL);
//!
//!     let now = chrono::Utc::now().timestamp_millis();
//!     let series = resolver
//!         .evaluate_targets(
//!             &[QueryTarget { target: "sum(meter_power)".into() }],
//!             TimeRange::new(now - 3_600_000, now),
//!         )
//!         .await?;
//!
//!     println!("Resolved {} series", series.len());
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod catalog;
pub mod config;
pub mod hub;
pub mod query;
pub mod series;

// Re-export top-level types for convenience
pub use series::{SamplePoint, Series, TimeRange};

pub use catalog::{MetricCatalog, MetricDescriptor, DEFAULT_CATALOG_TTL, TARGET_SEPARATOR};

pub use hub::{HubClient, HubError, HubMetric, LogEntries, LogEntriesRequest, SampleProvider};

pub use query::{
    parse_expression, Expression, Interval, IntervalUnit, MetricResolver, QueryError, QueryResult,
    QueryTarget, Resolution, DEFAULT_RESOLUTION,
};

pub use api::{build_router, serve, ApiConfig, ApiError, AppState};

pub use config::{
    ApiConfig as ConfigApiConfig, CatalogConfig, Config, ConfigError,
    HubConfig as ConfigHubConfig, LoggingConfig,
};
