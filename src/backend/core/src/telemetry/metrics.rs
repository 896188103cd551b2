//! Prometheus metrics for pools, sourcing and errors.
//!
//! Library code records through the `metrics` facade unconditionally; values
//! are dropped unless a recorder is installed with [`init_metrics`].
//!
//! | metric | kind | labels |
//! |---|---|---|
//! | `lazy_pattern_errors_total` | counter | code, category, severity, retryable |
//! | `lazy_pattern_pool_fetch_total` | counter | pool, outcome |
//! | `lazy_pattern_pool_constructed_total` | counter | pool |
//! | `lazy_pattern_pool_leased` | gauge | pool |
//! | `lazy_pattern_pool_wait_seconds` | histogram | pool |
//! | `lazy_pattern_sourcer_orderings_total` | counter | |

use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde::Deserialize;
use std::collections::HashMap;

/// Metrics configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Whether a Prometheus recorder is installed
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,

    /// Histogram buckets for wait durations (in seconds)
    #[serde(default = "default_wait_buckets")]
    pub wait_buckets: Vec<f64>,

    /// Global labels to add to all metrics
    #[serde(default)]
    pub global_labels: HashMap<String, String>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
            wait_buckets: default_wait_buckets(),
            global_labels: HashMap::new(),
        }
    }
}

fn default_metrics_enabled() -> bool {
    false
}

fn default_wait_buckets() -> Vec<f64> {
    vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0]
}

/// Handle to the installed recorder.
pub struct MetricsRegistry {
    prometheus_handle: Option<PrometheusHandle>,
}

impl std::fmt::Debug for MetricsRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsRegistry")
            .field("prometheus_handle", &self.prometheus_handle.is_some())
            .finish()
    }
}

impl MetricsRegistry {
    /// A registry with no recorder behind it.
    pub fn disabled() -> Self {
        Self {
            prometheus_handle: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.prometheus_handle.is_some()
    }

    /// Render all metrics in Prometheus text format.
    pub fn render(&self) -> String {
        self.prometheus_handle
            .as_ref()
            .map(|h| h.render())
            .unwrap_or_default()
    }
}

/// Install the global Prometheus recorder and describe every metric.
///
/// # Errors
///
/// Fails on invalid buckets or when a recorder is already installed.
pub fn init_metrics(config: &MetricsConfig) -> anyhow::Result<MetricsRegistry> {
    if !config.enabled {
        return Ok(MetricsRegistry::disabled());
    }

    let mut builder = PrometheusBuilder::new();
    for (key, value) in &config.global_labels {
        builder = builder.add_global_label(key, value);
    }
    builder = builder.set_buckets(&config.wait_buckets)?;

    let handle = builder.install_recorder()?;
    register_metric_descriptions();

    tracing::info!(global_labels = config.global_labels.len(), "Metrics initialized");

    Ok(MetricsRegistry {
        prometheus_handle: Some(handle),
    })
}

fn register_metric_descriptions() {
    describe_counter!(
        "lazy_pattern_errors_total",
        "Total number of errors by code"
    );

    describe_counter!(
        "lazy_pattern_pool_fetch_total",
        "Pool fetches by outcome (hit, constructed, waited, timeout, cancelled, failed)"
    );
    describe_counter!(
        "lazy_pattern_pool_constructed_total",
        "Instances built by the pool factory"
    );
    describe_gauge!(
        "lazy_pattern_pool_leased",
        "Instances currently leased from the pool"
    );
    describe_histogram!(
        "lazy_pattern_pool_wait_seconds",
        Unit::Seconds,
        "Time fetchers spent suspended waiting for an instance"
    );

    describe_counter!(
        "lazy_pattern_sourcer_orderings_total",
        "Orderings yielded by exhaustive traversal"
    );
}
