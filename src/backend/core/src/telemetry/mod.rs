//! Telemetry: structured logging and Prometheus metrics.
//!
//! # Example
//!
//! ```rust,no_run
//! use lazy_pattern_core::telemetry::{init_telemetry, TelemetryConfig};
//!
//! let config = TelemetryConfig::default();
//! let handle = init_telemetry(&config).expect("Failed to initialize telemetry");
//! println!("{}", handle.metrics.render());
//! ```

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, LogFormat, LoggingConfig, SpanEventConfig};
pub use metrics::{init_metrics, MetricsConfig, MetricsRegistry};

use serde::Deserialize;

/// Unified telemetry configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TelemetryConfig {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Initialize logging and metrics. Call once at startup.
pub fn init_telemetry(config: &TelemetryConfig) -> anyhow::Result<TelemetryHandle> {
    init_logging(&config.logging)?;
    let metrics = init_metrics(&config.metrics)?;

    Ok(TelemetryHandle { metrics })
}

/// Handle for the installed telemetry.
#[derive(Debug)]
pub struct TelemetryHandle {
    /// Metrics handle for rendering
    pub metrics: MetricsRegistry,
}
