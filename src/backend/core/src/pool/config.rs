//! Pool configuration and the instance factory.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::recyclable::Recyclable;
use crate::error::{PatternError, Result};

/// Constructs new pool instances.
#[async_trait]
pub trait Factory<T>: Send + Sync {
    /// Build one instance.
    async fn produce(&self) -> Result<T>;
}

#[async_trait]
impl<T, F, Fut> Factory<T> for F
where
    T: Send + 'static,
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<T>> + Send,
{
    async fn produce(&self) -> Result<T> {
        (self)().await
    }
}

/// Deserializable pool settings (the `pool` section of the configuration).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolSettings {
    /// Instances constructed by `prewarm()`
    #[serde(default = "default_min_warm")]
    pub min_warm: usize,

    /// Ceiling on live instances
    #[serde(default = "default_max_live")]
    pub max_live: usize,

    /// How long `fetch()` waits for availability
    #[serde(default = "default_acquire_timeout", with = "humantime_serde")]
    pub acquire_timeout: Duration,

    /// Pool name for logs and metrics
    #[serde(default = "default_name")]
    pub name: String,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            min_warm: default_min_warm(),
            max_live: default_max_live(),
            acquire_timeout: default_acquire_timeout(),
            name: default_name(),
        }
    }
}

fn default_min_warm() -> usize {
    5
}

fn default_max_live() -> usize {
    20
}

fn default_acquire_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_name() -> String {
    "default".to_string()
}

/// Configuration for an [`ObjectPool`](super::ObjectPool).
pub struct PoolConfig<T> {
    /// Builds new instances
    pub factory: Arc<dyn Factory<T>>,
    /// Instances eagerly constructed by `prewarm()`
    pub min_warm: usize,
    /// Hard ceiling on free + leased + in-flight instances
    pub max_live: usize,
    /// Maximum wait in `fetch()`
    pub acquire_timeout: Duration,
    /// Name for this pool (for logging/metrics)
    pub name: String,
}

impl<T: Recyclable> PoolConfig<T> {
    /// Create with the default sizing and an async factory.
    pub fn new(factory: impl Factory<T> + 'static) -> Self {
        Self::from_settings(&PoolSettings::default(), factory)
    }

    /// Create from a synchronous constructor.
    pub fn from_fn<F>(constructor: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::new(move || {
            let instance = constructor();
            async move { Ok::<T, PatternError>(instance) }
        })
    }

    /// Create from deserialized settings.
    pub fn from_settings(settings: &PoolSettings, factory: impl Factory<T> + 'static) -> Self {
        Self {
            factory: Arc::new(factory),
            min_warm: settings.min_warm,
            max_live: settings.max_live,
            acquire_timeout: settings.acquire_timeout,
            name: settings.name.clone(),
        }
    }

    /// Create with a specific name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_min_warm(mut self, min_warm: usize) -> Self {
        self.min_warm = min_warm;
        self
    }

    pub fn with_max_live(mut self, max_live: usize) -> Self {
        self.max_live = max_live;
        self
    }

    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Check sizing limits.
    pub fn validate(&self) -> Result<()> {
        if self.max_live == 0 {
            return Err(PatternError::invalid_configuration(format!(
                "pool '{}': max_live must be at least 1",
                self.name
            )));
        }

        if self.min_warm > self.max_live {
            return Err(PatternError::invalid_configuration(format!(
                "pool '{}': min_warm ({}) exceeds max_live ({})",
                self.name, self.min_warm, self.max_live
            )));
        }

        Ok(())
    }
}

impl<T> Clone for PoolConfig<T> {
    fn clone(&self) -> Self {
        Self {
            factory: Arc::clone(&self.factory),
            min_warm: self.min_warm,
            max_live: self.max_live,
            acquire_timeout: self.acquire_timeout,
            name: self.name.clone(),
        }
    }
}

impl<T> fmt::Debug for PoolConfig<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolConfig")
            .field("min_warm", &self.min_warm)
            .field("max_live", &self.max_live)
            .field("acquire_timeout", &self.acquire_timeout)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
