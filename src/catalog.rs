//! Metric Catalog
//!
//! Time-bounded cache of the hub's enriched metric list. The catalog is
//! rebuilt wholesale from the provider when the cache is cold or past its
//! TTL, never mutated in place. Boolean-typed hub properties are excluded
//! at build time since they are not meaningful as numeric series.
//!
//! Search supports two pattern forms against `original_target`:
//! literal case-sensitive substring, or `/.../`-delimited regular expression.
//! A malformed regex yields an empty result rather than an error: a bad
//! filter must look like "no matches" to the caller instead of failing the
//! whole dashboard batch.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use regex::Regex;
use tokio::sync::RwLock;

use crate::hub::{HubError, HubMetric, SampleProvider};

/// Separator joining device name, property id and device uri into one
/// readable metric handle
pub const TARGET_SEPARATOR: char = '~';

/// How long a cached catalog stays valid
pub const DEFAULT_CATALOG_TTL: Duration = Duration::from_secs(180);

/// Enriched identity of one hub metric
///
/// Regenerated on every catalog refresh; immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDescriptor {
    /// Unique readable handle: `device_name~id~uri`
    pub original_target: String,
    /// Human-readable device name
    pub device_name: String,
    /// Property identifier on the device
    pub id: String,
    /// Owning device/manager uri
    pub uri: String,
}

impl MetricDescriptor {
    fn from_hub(metric: &HubMetric) -> Self {
        let device_name = metric.uri_obj.name.clone();
        let original_target = format!(
            "{}{sep}{}{sep}{}",
            device_name,
            metric.id,
            metric.uri,
            sep = TARGET_SEPARATOR
        );

        Self {
            original_target,
            device_name,
            id: metric.id.clone(),
            uri: metric.uri.clone(),
        }
    }

    /// Shorter label used for resolved series: `device_name~id`
    pub fn display_target(&self) -> String {
        format!("{}{}{}", self.device_name, TARGET_SEPARATOR, self.id)
    }
}

struct CachedCatalog {
    metrics: Arc<Vec<MetricDescriptor>>,
    fetched_at: Instant,
}

/// TTL-bounded cache of all known metric descriptors
///
/// Owns the only copy of the catalog. Refresh is single-flight: concurrent
/// requests that miss the cache coalesce behind the write lock, so the
/// provider sees one `list_metrics` call per expiry instead of one per
/// in-flight request.
pub struct MetricCatalog {
    provider: Arc<dyn SampleProvider>,
    ttl: Duration,
    cache: RwLock<Option<CachedCatalog>>,
}

impl MetricCatalog {
    /// Create a catalog over the given provider
    pub fn new(provider: Arc<dyn SampleProvider>, ttl: Duration) -> Self {
        Self {
            provider,
            ttl,
            cache: RwLock::new(None),
        }
    }

    /// The full catalog, rebuilding through the provider if stale
    ///
    /// A provider failure here propagates: without a catalog no leaf
    /// expression can resolve.
    pub async fn get_all(&self) -> Result<Arc<Vec<MetricDescriptor>>, HubError> {
        if let Some(cached) = &*self.cache.read().await {
            if cached.fetched_at.elapsed() < self.ttl {
                return Ok(Arc::clone(&cached.metrics));
            }
        }

        let mut guard = self.cache.write().await;
        // Another request may have refreshed while we waited for the lock.
        if let Some(cached) = &*guard {
            if cached.fetched_at.elapsed() < self.ttl {
                return Ok(Arc::clone(&cached.metrics));
            }
        }

        let metrics = Arc::new(self.rebuild().await?);
        *guard = Some(CachedCatalog {
            metrics: Arc::clone(&metrics),
            fetched_at: Instant::now(),
        });

        Ok(metrics)
    }

    async fn rebuild(&self) -> Result<Vec<MetricDescriptor>, HubError> {
        let raw = self.provider.list_metrics().await?;

        let mut seen = HashSet::new();
        let mut descriptors = Vec::with_capacity(raw.len());
        for metric in raw.iter().filter(|metric| metric.kind != "boolean") {
            let descriptor = MetricDescriptor::from_hub(metric);
            if seen.insert(descriptor.original_target.clone()) {
                descriptors.push(descriptor);
            }
        }

        tracing::info!(total = raw.len(), kept = descriptors.len(), "rebuilt metric catalog");
        tracing::debug!(
            targets = ?descriptors.iter().map(|d| d.original_target.as_str()).collect::<Vec<_>>(),
            "catalog contents"
        );

        Ok(descriptors)
    }

    /// Descriptors whose `original_target` matches `pattern`
    ///
    /// An empty pattern returns the full catalog, order preserved. A
    /// malformed regex pattern returns no matches, never an error.
    pub async fn search(&self, pattern: &str) -> Result<Vec<MetricDescriptor>, HubError> {
        let all = self.get_all().await?;

        if pattern.is_empty() {
            return Ok(all.to_vec());
        }

        match PatternFilter::compile(pattern) {
            Ok(filter) => Ok(all
                .iter()
                .filter(|descriptor| filter.matches(&descriptor.original_target))
                .cloned()
                .collect()),
            Err(error) => {
                tracing::debug!(pattern, %error, "malformed search pattern, returning no matches");
                Ok(Vec::new())
            }
        }
    }
}

/// Compiled search pattern: the compile step makes the fail-soft policy a
/// visible contract rather than a caught panic
enum PatternFilter {
    Substring(String),
    Regex(Regex),
}

impl PatternFilter {
    fn compile(pattern: &str) -> Result<Self, regex::Error> {
        match pattern
            .strip_prefix('/')
            .and_then(|inner| inner.strip_suffix('/'))
        {
            Some(inner) => Ok(Self::Regex(Regex::new(inner)?)),
            None => Ok(Self::Substring(pattern.to_string())),
        }
    }

    fn matches(&self, target: &str) -> bool {
        match self {
            Self::Substring(needle) => target.contains(needle.as_str()),
            Self::Regex(regex) => regex.is_match(target),
        }
    }
}
