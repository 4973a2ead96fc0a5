//! Outbound transport configuration
//!
//! Certificate verification is a property of the client handed to the
//! provider, never of the process.

use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = concat!("yt-audio-relay/", env!("CARGO_PKG_VERSION"));

/// Settings for the HTTP client used to reach the platform
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Verify upstream TLS certificates. Disabling this is opt-in.
    pub verify_certificates: bool,

    /// Timeout for establishing a connection
    pub connect_timeout: Duration,

    /// User-Agent header sent upstream
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            verify_certificates: true,
            connect_timeout: Duration::from_secs(10),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl TransportConfig {
    /// Same settings with certificate verification disabled
    pub fn insecure(mut self) -> Self {
        self.verify_certificates = false;
        self
    }

    /// Build a client carrying these settings.
    ///
    /// No overall request timeout is set: audio bodies can stream for as
    /// long as the track lasts.
    pub fn build_client(&self) -> Result<reqwest::Client, reqwest::Error> {
        if !self.verify_certificates {
            tracing::warn!("TLS certificate verification is DISABLED for upstream requests");
        }

        reqwest::Client::builder()
            .danger_accept_invalid_certs(!self.verify_certificates)
            .connect_timeout(self.connect_timeout)
            .user_agent(self.user_agent.clone())
            .build()
    }
}
