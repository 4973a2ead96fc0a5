//! HTTP request handlers
//!
//! `/stream/{id}` and `/download/{id}` share one code path and differ only in
//! the Content-Disposition mode and their log labels.

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::sync::Arc;

use crate::error::RelayError;
use crate::identifier::VideoId;
use crate::provider::AudioQuality;
use crate::relay::{self, RelayContext};
use crate::retry::{fetch_metadata_with_retry, tokio_sleep};
use crate::state::AppState;

/// Banner served at `/`
pub const BANNER: &str = "YouTube Music Streamer/Downloader";

const AUDIO_CONTENT_TYPE: &str = "audio/mpeg";
const AUDIO_EXTENSION: &str = "mp3";

/// RFC 5987 `attr-char`
const ATTR_CHAR: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

/// How the client should present the audio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Inline,
    Attachment,
}

impl Disposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Disposition::Inline => "inline",
            Disposition::Attachment => "attachment",
        }
    }

    /// Verb used in log lines and error bodies
    pub fn action(&self) -> &'static str {
        match self {
            Disposition::Inline => "streaming",
            Disposition::Attachment => "downloading",
        }
    }
}

/// HTTP error type
#[derive(Debug)]
pub struct HttpError {
    pub action: &'static str,
    pub error: RelayError,
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, body) = match &self.error {
            RelayError::InvalidIdentifier => (StatusCode::BAD_REQUEST, self.error.to_string()),
            RelayError::ResourceGone => (StatusCode::NOT_FOUND, self.error.to_string()),
            RelayError::RetrievalFailure(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error {} music: {}", self.action, msg),
            ),
            RelayError::StreamFailure(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error {} music", self.action),
            ),
        };

        (status, body).into_response()
    }
}

/// Root banner endpoint
pub async fn root() -> &'static str {
    BANNER
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "OK"
}

/// Version endpoint
pub async fn version_check() -> &'static str {
    concat!("yt-audio-relay v", env!("CARGO_PKG_VERSION"))
}

/// Fallback for unknown paths
pub async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not found")
}

/// Stream endpoint
/// GET /stream/{video_id}
pub async fn stream_audio(
    State(state): State<Arc<AppState>>,
    Path(video_id): Path<String>,
) -> Result<Response, HttpError> {
    relay_audio(&state, &video_id, Disposition::Inline).await
}

/// Download endpoint
/// GET /download/{video_id}
pub async fn download_audio(
    State(state): State<Arc<AppState>>,
    Path(video_id): Path<String>,
) -> Result<Response, HttpError> {
    relay_audio(&state, &video_id, Disposition::Attachment).await
}

async fn relay_audio(
    state: &AppState,
    raw_id: &str,
    disposition: Disposition,
) -> Result<Response, HttpError> {
    let action = disposition.action();
    let fail = |error: RelayError| {
        match &error {
            RelayError::InvalidIdentifier => {
                tracing::warn!("Rejected {} request for invalid id {:?}", action, raw_id)
            }
            other => tracing::error!("Error {} music {}: {}", action, raw_id, other),
        }
        state.metrics.record_error(error.kind());
        HttpError { action, error }
    };

    let id = VideoId::parse(raw_id).map_err(fail)?;

    let metadata =
        fetch_metadata_with_retry(state.provider.as_ref(), &id, state.retry, tokio_sleep)
            .await
            .map_err(fail)?;

    tracing::info!(
        "Start {} {} ({:?} by {}, {}s)",
        action,
        id,
        metadata.title,
        metadata.author.as_deref().unwrap_or("unknown"),
        metadata.duration_secs.unwrap_or(0)
    );

    let audio = state
        .provider
        .open_audio(&metadata, AudioQuality::Highest)
        .await
        .map_err(|e| {
            if e.is_gone() {
                fail(RelayError::ResourceGone)
            } else {
                fail(RelayError::StreamFailure(e.to_string()))
            }
        })?;

    tracing::debug!(
        "Upstream format for {}: {} ({:?} bytes)",
        id,
        audio.mime_type,
        audio.content_length
    );
    let content_length = audio.content_length;

    // Nothing is committed until the first chunk is in hand
    let primed = relay::prime(audio.body)
        .await
        .map_err(|e| fail(RelayError::StreamFailure(e.to_string())))?;

    let title = if metadata.title.trim().is_empty() {
        id.as_str()
    } else {
        metadata.title.as_str()
    };

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(AUDIO_CONTENT_TYPE),
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        content_disposition(disposition, title),
    );
    if let Some(len) = content_length {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    }

    let body = primed.into_body(RelayContext {
        video_id: id.to_string(),
        action,
        metrics: Arc::clone(&state.metrics),
    });

    Ok((StatusCode::OK, headers, body).into_response())
}

/// Build the Content-Disposition value for `title`.
///
/// Quotes, backslashes and control characters become `_`. Non-ASCII titles
/// get an ASCII `filename` plus an RFC 5987 `filename*`.
pub fn content_disposition(disposition: Disposition, title: &str) -> HeaderValue {
    let filename: String = format!("{}.{}", title, AUDIO_EXTENSION)
        .chars()
        .map(|c| {
            if c == '"' || c == '\\' || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();

    let value = if filename.is_ascii() {
        format!("{}; filename=\"{}\"", disposition.as_str(), filename)
    } else {
        let ascii: String = filename
            .chars()
            .map(|c| if c.is_ascii() { c } else { '_' })
            .collect();
        format!(
            "{}; filename=\"{}\"; filename*=UTF-8''{}",
            disposition.as_str(),
            ascii,
            utf8_percent_encode(&filename, ATTR_CHAR)
        )
    };

    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static(disposition.as_str()))
}
