//! Video provider abstraction
//!
//! This module defines the seam between the HTTP layer and the remote
//! platform:
//! - `AudioProvider` trait for metadata lookup and audio stream opening
//! - Metadata and audio format records
//! - Structured `ProviderError` carrying a kind set by the adapter

pub mod innertube;
pub mod transport;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use thiserror::Error;

use crate::identifier::VideoId;

pub use innertube::InnertubeProvider;
pub use transport::TransportConfig;

/// Classification set by the provider adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// The resource has been permanently removed
    Gone,
    /// The platform refuses playback (age gate, region lock, ...)
    Unplayable,
    /// The metadata lists no audio format
    NoAudio,
    /// Non-success status from the platform
    Upstream,
    /// Connection or TLS failure
    Transport,
    /// Unexpected response shape
    Decode,
}

impl ProviderErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderErrorKind::Gone => "gone",
            ProviderErrorKind::Unplayable => "unplayable",
            ProviderErrorKind::NoAudio => "no_audio",
            ProviderErrorKind::Upstream => "upstream",
            ProviderErrorKind::Transport => "transport",
            ProviderErrorKind::Decode => "decode",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_gone(&self) -> bool {
        self.kind == ProviderErrorKind::Gone
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.status() == Some(reqwest::StatusCode::GONE) {
            return ProviderError::new(ProviderErrorKind::Gone, err.to_string());
        }
        let kind = if err.is_decode() {
            ProviderErrorKind::Decode
        } else if err.is_status() {
            ProviderErrorKind::Upstream
        } else {
            ProviderErrorKind::Transport
        };
        ProviderError::new(kind, err.to_string())
    }
}

/// A single downloadable format
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFormat {
    pub itag: u32,
    pub mime_type: String,
    pub bitrate: u64,
    pub content_length: Option<u64>,
    pub url: String,
}

impl AudioFormat {
    pub fn is_audio(&self) -> bool {
        self.mime_type.starts_with("audio/")
    }
}

/// Requested audio quality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AudioQuality {
    #[default]
    Highest,
}

/// Descriptive record for a video
#[derive(Debug, Clone, PartialEq)]
pub struct Metadata {
    pub id: String,
    pub title: String,
    pub author: Option<String>,
    pub duration_secs: Option<u64>,
    pub formats: Vec<AudioFormat>,
}

impl Metadata {
    /// Pick the audio-only format matching the requested quality
    pub fn choose_format(&self, quality: AudioQuality) -> Option<&AudioFormat> {
        let audio = self.formats.iter().filter(|f| f.is_audio());
        match quality {
            AudioQuality::Highest => audio.max_by_key(|f| f.bitrate),
        }
    }
}

/// An open remote byte stream
pub struct AudioStream {
    pub mime_type: String,
    pub content_length: Option<u64>,
    pub body: BoxStream<'static, Result<Bytes, ProviderError>>,
}

impl std::fmt::Debug for AudioStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioStream")
            .field("mime_type", &self.mime_type)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Port for the remote video platform
#[async_trait]
pub trait AudioProvider: Send + Sync {
    /// Fetch descriptive metadata for a video.
    async fn fetch_metadata(&self, id: &VideoId) -> Result<Metadata, ProviderError>;

    /// Open the audio stream of a video whose metadata was already fetched.
    async fn open_audio(
        &self,
        metadata: &Metadata,
        quality: AudioQuality,
    ) -> Result<AudioStream, ProviderError>;
}
