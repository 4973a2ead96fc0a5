//! Prometheus-compatible metrics endpoint

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::state::AppState;

/// How a relay ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// All source bytes were forwarded
    Completed,
    /// The client went away before the source ended
    ClientClosed,
    /// The source failed after headers were committed
    SourceFailed,
}

impl RelayOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelayOutcome::Completed => "completed",
            RelayOutcome::ClientClosed => "client_closed",
            RelayOutcome::SourceFailed => "source_failed",
        }
    }
}

/// Metrics collector
#[derive(Debug)]
pub struct Metrics {
    /// Server start time
    start_time: Instant,
    /// Total requests processed
    request_count: RwLock<u64>,
    /// Requests by endpoint
    requests_by_endpoint: RwLock<HashMap<String, u64>>,
    /// Total audio bytes relayed to clients
    bytes_relayed: RwLock<u64>,
    /// Relays currently forwarding
    active_relays: RwLock<u64>,
    /// Finished relays by outcome
    relays_by_outcome: RwLock<HashMap<&'static str, u64>>,
    /// Errors by type
    errors_by_type: RwLock<HashMap<String, u64>>,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            request_count: RwLock::new(0),
            requests_by_endpoint: RwLock::new(HashMap::new()),
            bytes_relayed: RwLock::new(0),
            active_relays: RwLock::new(0),
            relays_by_outcome: RwLock::new(HashMap::new()),
            errors_by_type: RwLock::new(HashMap::new()),
        }
    }

    /// Record a request
    pub fn record_request(&self, endpoint: &str) {
        *self.request_count.write() += 1;
        *self
            .requests_by_endpoint
            .write()
            .entry(endpoint.to_string())
            .or_insert(0) += 1;
    }

    /// Record bytes handed to a client
    pub fn record_bytes(&self, bytes: u64) {
        *self.bytes_relayed.write() += bytes;
    }

    /// Mark a relay as started; the count drops again when the guard is dropped
    pub fn relay_started(self: &Arc<Self>) -> ActiveRelayGuard {
        *self.active_relays.write() += 1;
        ActiveRelayGuard {
            metrics: Arc::clone(self),
        }
    }

    /// Record how a relay ended
    pub fn record_outcome(&self, outcome: RelayOutcome) {
        *self
            .relays_by_outcome
            .write()
            .entry(outcome.as_str())
            .or_insert(0) += 1;
    }

    /// Record error
    pub fn record_error(&self, error_type: &str) {
        *self
            .errors_by_type
            .write()
            .entry(error_type.to_string())
            .or_insert(0) += 1;
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn active_relays(&self) -> u64 {
        *self.active_relays.read()
    }

    pub fn bytes_relayed(&self) -> u64 {
        *self.bytes_relayed.read()
    }

    /// Export metrics in Prometheus format
    pub fn export_prometheus(&self) -> String {
        let mut output = String::new();

        output.push_str("# HELP relay_uptime_seconds Server uptime in seconds\n");
        output.push_str("# TYPE relay_uptime_seconds counter\n");
        output.push_str(&format!("relay_uptime_seconds {}\n", self.uptime_secs()));

        output.push_str("\n# HELP relay_start_time_seconds Server start time as Unix timestamp\n");
        output.push_str("# TYPE relay_start_time_seconds gauge\n");
        output.push_str(&format!(
            "relay_start_time_seconds {}\n",
            std::time::SystemTime::UNIX_EPOCH
                .elapsed()
                .unwrap_or(Duration::ZERO)
                .as_secs()
                .saturating_sub(self.uptime_secs())
        ));

        // Request metrics
        output.push_str("\n# HELP relay_requests_total Total number of HTTP requests\n");
        output.push_str("# TYPE relay_requests_total counter\n");
        output.push_str(&format!(
            "relay_requests_total {}\n",
            *self.request_count.read()
        ));

        output.push_str("\n# HELP relay_requests_by_endpoint Requests by endpoint\n");
        output.push_str("# TYPE relay_requests_by_endpoint counter\n");
        for (endpoint, count) in self.requests_by_endpoint.read().iter() {
            output.push_str(&format!(
                "relay_requests_by_endpoint{{endpoint=\"{}\"}} {}\n",
                endpoint, count
            ));
        }

        // Relay metrics
        output.push_str("\n# HELP relay_bytes_total Total audio bytes relayed\n");
        output.push_str("# TYPE relay_bytes_total counter\n");
        output.push_str(&format!("relay_bytes_total {}\n", self.bytes_relayed()));

        output.push_str("\n# HELP relay_active Number of relays in progress\n");
        output.push_str("# TYPE relay_active gauge\n");
        output.push_str(&format!("relay_active {}\n", self.active_relays()));

        output.push_str("\n# HELP relay_finished_total Finished relays by outcome\n");
        output.push_str("# TYPE relay_finished_total counter\n");
        for (outcome, count) in self.relays_by_outcome.read().iter() {
            output.push_str(&format!(
                "relay_finished_total{{outcome=\"{}\"}} {}\n",
                outcome, count
            ));
        }

        // Error metrics
        output.push_str("\n# HELP relay_errors_total Total errors by type\n");
        output.push_str("# TYPE relay_errors_total counter\n");
        for (error_type, count) in self.errors_by_type.read().iter() {
            output.push_str(&format!(
                "relay_errors_total{{type=\"{}\"}} {}\n",
                error_type, count
            ));
        }

        output
    }
}

#[cfg(test)]
impl Metrics {
    pub fn outcome_count(&self, outcome: RelayOutcome) -> u64 {
        self.relays_by_outcome
            .read()
            .get(outcome.as_str())
            .copied()
            .unwrap_or(0)
    }

    pub fn error_count(&self, error_type: &str) -> u64 {
        self.errors_by_type
            .read()
            .get(error_type)
            .copied()
            .unwrap_or(0)
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Decrements the active relay gauge on drop
#[derive(Debug)]
pub struct ActiveRelayGuard {
    metrics: Arc<Metrics>,
}

impl Drop for ActiveRelayGuard {
    fn drop(&mut self) {
        let mut active = self.metrics.active_relays.write();
        *active = active.saturating_sub(1);
    }
}

/// Metrics endpoint handler
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    let prometheus_output = state.metrics.export_prometheus();

    (
        StatusCode::OK,
        [("Content-Type", "text/plain; version=0.0.4")],
        prometheus_output,
    )
        .into_response()
}
