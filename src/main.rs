//! YouTube Music audio relay
//!
//! Resolves a YouTube Music video ID to its audio stream and relays the
//! bytes to the client, either for inline playback or as a download.

mod config;
mod config_file;
mod error;
mod http;
mod identifier;
#[cfg(test)]
mod integration;
mod metrics;
mod provider;
mod relay;
mod retry;
mod state;

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::ServerConfig;
use crate::error::Result;
use crate::http::create_router;
use crate::provider::InnertubeProvider;
use crate::state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
const APP_NAME: &str = "yt-audio-relay";

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Host address to bind to
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Skip upstream TLS certificate verification
    #[arg(long)]
    insecure_tls: bool,

    /// Write a default configuration file to this path and exit
    #[arg(long, value_name = "PATH")]
    write_default_config: Option<PathBuf>,
}

impl Args {
    /// Command-line flags take precedence over the configuration file
    fn apply(&self, config: &mut ServerConfig) {
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if self.insecure_tls {
            config.provider.insecure_tls = true;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(path) = &args.write_default_config {
        config_file::generate_default_config(path)?;
        println!("Wrote default configuration to {}", path.display());
        return Ok(());
    }

    // Logging needs the configured level, so load first and report afterwards
    let loaded = config_file::load(&args.config);
    let mut config = match &loaded {
        Ok(config) => config.clone(),
        Err(_) => ServerConfig::default(),
    };
    args.apply(&mut config);

    init_logging(&config.log_level);

    tracing::info!("{} v{} starting", APP_NAME, VERSION);
    if let Err(e) = loaded {
        tracing::warn!(
            "Failed to load config file {}: {}. Using defaults.",
            args.config.display(),
            e
        );
    }
    tracing::debug!("Configuration loaded: {:?}", config);

    let provider = InnertubeProvider::with_base_url(
        &config.provider.base_url,
        &config.provider.lang,
        &config.provider.transport(),
    )?;

    let state = Arc::new(AppState::new(config.clone(), Arc::new(provider)));
    let app = create_router(state);

    tracing::info!("Starting HTTP server on {}", config.socket_addr());
    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    let url = config.public_url();
    tracing::info!("YouTube Music Server is running at {}", url);
    tracing::info!("Available endpoints:");
    tracing::info!("- Stream music: {}/stream/:videoId", url);
    tracing::info!("- Download music: {}/download/:videoId", url);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Initialize logging with tracing
fn init_logging(level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("yt_audio_relay={level},tower_http={level}").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install Ctrl+C handler: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received");
}
