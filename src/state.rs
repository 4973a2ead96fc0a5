//! Application state shared across all handlers
//!
//! Everything here is read-only after startup except the metrics counters.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::metrics::Metrics;
use crate::provider::AudioProvider;
use crate::retry::RetryPolicy;

pub struct AppState {
    /// Server configuration
    pub config: ServerConfig,

    /// Remote platform adapter
    pub provider: Arc<dyn AudioProvider>,

    /// Metadata retry policy
    pub retry: RetryPolicy,

    /// Metrics collector
    pub metrics: Arc<Metrics>,
}

impl AppState {
    /// Create a new AppState with the given configuration and provider
    pub fn new(config: ServerConfig, provider: Arc<dyn AudioProvider>) -> Self {
        let retry = RetryPolicy::from(&config.retry);
        Self {
            config,
            provider,
            retry,
            metrics: Arc::new(Metrics::new()),
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}
