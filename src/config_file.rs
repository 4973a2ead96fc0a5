//! Configuration file support
//!
//! Loads server configuration from TOML files. Every section and key is
//! optional; anything missing falls back to the built-in default.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::{ProviderConfig, RetryConfig, ServerConfig};
use crate::error::{Result, ServerError};

/// Configuration file format
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Server settings
    pub server: Option<ServerSettings>,
    /// Metadata retry settings
    pub retry: Option<RetrySettings>,
    /// Upstream platform settings
    pub provider: Option<ProviderSettings>,
    /// Logging settings
    pub logging: Option<LoggingSettings>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Host address to bind to
    pub host: Option<String>,
    /// Port to listen on
    pub port: Option<u16>,
    /// Enable CORS
    pub cors_enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Total metadata attempts per request
    pub max_attempts: Option<u32>,
    /// Pause between attempts in milliseconds
    pub delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderSettings {
    pub base_url: Option<String>,
    pub lang: Option<String>,
    /// Disable upstream certificate verification
    pub insecure_tls: Option<bool>,
    pub connect_timeout_secs: Option<u64>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl ConfigFile {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ServerError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ServerError::Config(e.to_string()))?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Generate default configuration file
    pub fn default_config() -> Self {
        let defaults = ServerConfig::default();
        Self {
            server: Some(ServerSettings {
                host: Some(defaults.host),
                port: Some(defaults.port),
                cors_enabled: Some(defaults.cors_enabled),
            }),
            retry: Some(RetrySettings {
                max_attempts: Some(defaults.retry.max_attempts),
                delay_ms: Some(defaults.retry.delay_ms),
            }),
            provider: Some(ProviderSettings {
                base_url: Some(defaults.provider.base_url),
                lang: Some(defaults.provider.lang),
                insecure_tls: Some(defaults.provider.insecure_tls),
                connect_timeout_secs: Some(defaults.provider.connect_timeout_secs),
                user_agent: Some(defaults.provider.user_agent),
            }),
            logging: Some(LoggingSettings {
                level: defaults.log_level,
            }),
        }
    }

    /// Convert to ServerConfig
    pub fn into_server_config(self) -> ServerConfig {
        let defaults = ServerConfig::default();
        let server = self.server.unwrap_or_default();
        let retry = self.retry.unwrap_or_default();
        let provider = self.provider.unwrap_or_default();

        ServerConfig {
            host: server.host.unwrap_or(defaults.host),
            port: server.port.unwrap_or(defaults.port),
            cors_enabled: server.cors_enabled.unwrap_or(defaults.cors_enabled),
            log_level: self
                .logging
                .map(|l| l.level)
                .unwrap_or(defaults.log_level),
            retry: RetryConfig {
                max_attempts: retry.max_attempts.unwrap_or(defaults.retry.max_attempts),
                delay_ms: retry.delay_ms.unwrap_or(defaults.retry.delay_ms),
            },
            provider: ProviderConfig {
                base_url: provider.base_url.unwrap_or(defaults.provider.base_url),
                lang: provider.lang.unwrap_or(defaults.provider.lang),
                insecure_tls: provider
                    .insecure_tls
                    .unwrap_or(defaults.provider.insecure_tls),
                connect_timeout_secs: provider
                    .connect_timeout_secs
                    .unwrap_or(defaults.provider.connect_timeout_secs),
                user_agent: provider.user_agent.unwrap_or(defaults.provider.user_agent),
            },
        }
    }
}

/// Load the server configuration from `path`.
///
/// A missing file is not an error and yields the defaults.
pub fn load<P: AsRef<Path>>(path: P) -> Result<ServerConfig> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(ServerConfig::default());
    }
    Ok(ConfigFile::from_file(path)?.into_server_config())
}

/// Generate default configuration file at the specified path
pub fn generate_default_config<P: AsRef<Path>>(path: P) -> Result<()> {
    ConfigFile::default_config().to_file(path)
}
