//! Configuration management.
//!
//! Values come from an optional file layered under environment variables
//! prefixed with `LAZY_PATTERN`, nested with `__`:
//!
//! ```text
//! LAZY_PATTERN__POOL__MAX_LIVE=8
//! LAZY_PATTERN__POOL__ACQUIRE_TIMEOUT=500ms
//! LAZY_PATTERN__LOGGING__LEVEL=debug
//! ```

use serde::Deserialize;

use crate::pool::PoolSettings;
use crate::telemetry::{LoggingConfig, MetricsConfig, TelemetryConfig};

const ENV_PREFIX: &str = "LAZY_PATTERN";
const ENV_SEPARATOR: &str = "__";

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Object pool sizing
    #[serde(default)]
    pub pool: PoolSettings,
}

impl Config {
    /// Load configuration from the environment.
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(environment())
            .build()?;

        let cfg: Config = config.try_deserialize()?;
        Ok(cfg)
    }

    /// Load from a specific file path (TOML, YAML or JSON by extension),
    /// with the environment taking precedence.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(environment())
            .build()?;

        let cfg: Config = config.try_deserialize()?;
        Ok(cfg)
    }

    /// The telemetry portion of this configuration.
    pub fn telemetry(&self) -> TelemetryConfig {
        TelemetryConfig {
            logging: self.logging.clone(),
            metrics: self.metrics.clone(),
        }
    }
}

fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .separator(ENV_SEPARATOR)
        .try_parsing(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.pool.max_live, 20);
        assert_eq!(config.pool.min_warm, 5);
        assert_eq!(config.pool.acquire_timeout, Duration::from_secs(30));
        assert!(!config.metrics.enabled);
    }

    #[test]
    fn test_telemetry_view() {
        let mut config = Config::default();
        config.logging.level = "trace".to_string();

        assert_eq!(config.telemetry().logging.level, "trace");
    }
}
