//! Hub HTTP Client
//!
//! Talks to the hub's insights HTTP API. Session bootstrap, authentication
//! headers and timeouts live here; the query engine never sees them.

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use super::{HubError, HubMetric, LogEntries, LogEntriesRequest, SampleProvider};
use crate::series::SamplePoint;
use async_trait::async_trait;

/// Configuration for the hub client
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Base URL of the hub API (e.g. "http://192.168.1.10")
    pub base_url: String,
    /// Bearer token for the hub session
    pub token: String,
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:80".to_string(),
            token: String::new(),
            request_timeout_ms: 10_000,
        }
    }
}

/// HTTP client for the hub's insights API
pub struct HubClient {
    client: Client,
    config: HubConfig,
}

/// One raw sample as the hub serializes it
#[derive(Debug, Deserialize)]
struct WireSample {
    /// Sample timestamp, RFC 3339
    t: DateTime<Utc>,
    /// Sample value, null for an explicit gap
    v: Option<f64>,
}

/// Wire shape of a log-entries response
#[derive(Debug, Deserialize)]
struct WireLogEntries {
    values: Vec<WireSample>,
    /// Sampling interval in milliseconds
    step: u64,
}

impl HubClient {
    /// Create a new hub client with the given configuration
    pub fn new(config: HubConfig) -> Result<Self, HubError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self { client, config })
    }

    /// Create a client and verify the hub session is usable
    ///
    /// Performs a ping so a bad address or token fails at startup instead of
    /// on the first dashboard request.
    pub async fn connect(config: HubConfig) -> Result<Self, HubError> {
        let client = Self::new(config)?;
        client.ping().await?;
        Ok(client)
    }

    /// Get the current configuration
    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Check the hub is reachable and the session token is accepted
    pub async fn ping(&self) -> Result<(), HubError> {
        let url = format!("{}/api/manager/system/ping", self.config.base_url);
        let response = self.get(&url).await?;
        Self::check_status(&response)?;
        Ok(())
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, HubError> {
        self.client
            .get(url)
            .bearer_auth(&self.config.token)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    HubError::Unreachable(e.to_string())
                } else {
                    HubError::Request(e)
                }
            })
    }

    fn check_status(response: &reqwest::Response) -> Result<(), HubError> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(HubError::Status {
                status: status.as_u16(),
                message: status
                    .canonical_reason()
                    .unwrap_or("unknown status")
                    .to_string(),
            })
        }
    }
}

#[async_trait]
impl SampleProvider for HubClient {
    async fn list_metrics(&self) -> Result<Vec<HubMetric>, HubError> {
        let url = format!("{}/api/manager/insights/logs", self.config.base_url);

        let response = self.get(&url).await?;
        Self::check_status(&response)?;

        response
            .json::<Vec<HubMetric>>()
            .await
            .map_err(|e| HubError::Decode(e.to_string()))
    }

    async fn log_entries(&self, request: &LogEntriesRequest) -> Result<LogEntries, HubError> {
        let url = format!("{}/api/manager/insights/entries", self.config.base_url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.config.token)
            .query(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    HubError::Unreachable(e.to_string())
                } else {
                    HubError::Request(e)
                }
            })?;
        Self::check_status(&response)?;

        let wire = response
            .json::<WireLogEntries>()
            .await
            .map_err(|e| HubError::Decode(e.to_string()))?;

        let values = wire
            .values
            .into_iter()
            .map(|sample| SamplePoint::new(sample.v, sample.t.timestamp_millis()))
            .collect();

        Ok(LogEntries {
            values,
            step: wire.step,
        })
    }
}
