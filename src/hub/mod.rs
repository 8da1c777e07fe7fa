//! Hub Metrics Provider
//!
//! Boundary to the home-automation hub that records the metrics Hearth
//! serves. The rest of the crate depends on the hub only through the
//! [`SampleProvider`] trait:
//!
//! - `list_metrics`: the raw catalog of every metric log the hub knows
//! - `log_entries`: raw samples for one metric at one resolution
//!
//! [`client::HubClient`] is the production implementation against the hub's
//! HTTP insights API; tests substitute in-memory stubs.

mod client;

pub use client::{HubClient, HubConfig};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::query::Resolution;
use crate::series::SamplePoint;

/// A raw metric log as the hub reports it
///
/// `uri` identifies the owning device (or manager), `id` the logged property
/// on it. `uri_obj.name` carries the human-readable device name used for
/// display labels.
#[derive(Debug, Clone, Deserialize)]
pub struct HubMetric {
    /// Property identifier, unique within the owning uri
    pub id: String,
    /// Owning device/manager uri
    pub uri: String,
    /// Expanded info about the owning uri
    #[serde(rename = "uriObj")]
    pub uri_obj: UriInfo,
    /// Value type of the log: "number", "boolean", ...
    #[serde(rename = "type")]
    pub kind: String,
    /// Optional display title of the property
    #[serde(default)]
    pub title: Option<String>,
    /// Optional measurement units
    #[serde(default)]
    pub units: Option<String>,
    /// Optional display precision
    #[serde(default)]
    pub decimals: Option<u8>,
}

/// Owning-uri details included with each metric log
#[derive(Debug, Clone, Deserialize)]
pub struct UriInfo {
    /// Human-readable device name
    pub name: String,
}

/// Parameters for one raw-sample fetch
#[derive(Debug, Clone, Serialize)]
pub struct LogEntriesRequest {
    /// Owning device/manager uri
    pub uri: String,
    /// Property identifier
    pub id: String,
    /// Sampling resolution bucket to fetch
    pub resolution: Resolution,
}

/// Raw samples for one metric at one resolution
#[derive(Debug, Clone)]
pub struct LogEntries {
    /// Time-ordered samples, ascending
    pub values: Vec<SamplePoint>,
    /// Sampling interval in milliseconds
    pub step: u64,
}

/// Errors from the hub boundary
#[derive(Debug, Error)]
pub enum HubError {
    /// The hub could not be reached or timed out
    #[error("hub unreachable: {0}")]
    Unreachable(String),

    /// The hub answered with a non-success status
    #[error("hub returned status {status}: {message}")]
    Status { status: u16, message: String },

    /// A hub response could not be decoded
    #[error("failed to decode hub response: {0}")]
    Decode(String),

    /// Underlying HTTP client error
    #[error("hub request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Raw catalog and sample retrieval for the hub's metric logs
///
/// The single seam the query engine depends on. Implementations must be
/// cheap to call concurrently; the resolver fans out one `log_entries` call
/// per matched metric.
#[async_trait]
pub trait SampleProvider: Send + Sync {
    /// List every metric log the hub knows about
    async fn list_metrics(&self) -> Result<Vec<HubMetric>, HubError>;

    /// Fetch raw samples for one metric at one resolution
    async fn log_entries(&self, request: &LogEntriesRequest) -> Result<LogEntries, HubError>;
}
