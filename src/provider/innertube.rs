//! Player API adapter
//!
//! Resolves metadata and direct audio URLs through the platform's public
//! `youtubei/v1/player` endpoint and opens the chosen format as a byte stream.

use async_trait::async_trait;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};

use super::{
    AudioFormat, AudioProvider, AudioQuality, AudioStream, Metadata, ProviderError,
    ProviderErrorKind, TransportConfig,
};
use crate::identifier::VideoId;

/// Platform base URL
pub const DEFAULT_BASE_URL: &str = "https://www.youtube.com";

const PLAYER_PATH: &str = "/youtubei/v1/player?prettyPrint=false";
const CLIENT_NAME: &str = "ANDROID";
const CLIENT_VERSION: &str = "19.09.37";
const ANDROID_SDK_VERSION: u32 = 30;

// Request types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlayerRequest<'a> {
    video_id: &'a str,
    context: RequestContext<'a>,
    content_check_ok: bool,
    racy_check_ok: bool,
}

#[derive(Debug, Serialize)]
struct RequestContext<'a> {
    client: ClientInfo<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClientInfo<'a> {
    client_name: &'a str,
    client_version: &'a str,
    android_sdk_version: u32,
    hl: &'a str,
}

// Response types

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerResponse {
    playability_status: Option<PlayabilityStatus>,
    video_details: Option<VideoDetails>,
    streaming_data: Option<StreamingData>,
}

#[derive(Debug, Deserialize)]
struct PlayabilityStatus {
    status: String,
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoDetails {
    video_id: Option<String>,
    title: Option<String>,
    author: Option<String>,
    length_seconds: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreamingData {
    #[serde(default)]
    adaptive_formats: Vec<RawFormat>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFormat {
    itag: u32,
    url: Option<String>,
    mime_type: String,
    #[serde(default)]
    bitrate: u64,
    content_length: Option<String>,
}

/// Provider backed by the platform's player API
pub struct InnertubeProvider {
    base_url: String,
    lang: String,
    client: reqwest::Client,
}

impl InnertubeProvider {
    /// Create a provider against `base_url`
    pub fn with_base_url(
        base_url: impl Into<String>,
        lang: impl Into<String>,
        transport: &TransportConfig,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            lang: lang.into(),
            client: transport.build_client()?,
        })
    }

    fn player_url(&self) -> String {
        format!("{}{}", self.base_url, PLAYER_PATH)
    }
}

#[async_trait]
impl AudioProvider for InnertubeProvider {
    async fn fetch_metadata(&self, id: &VideoId) -> Result<Metadata, ProviderError> {
        let request = PlayerRequest {
            video_id: id.as_str(),
            context: RequestContext {
                client: ClientInfo {
                    client_name: CLIENT_NAME,
                    client_version: CLIENT_VERSION,
                    android_sdk_version: ANDROID_SDK_VERSION,
                    hl: &self.lang,
                },
            },
            content_check_ok: true,
            racy_check_ok: true,
        };

        tracing::debug!("Requesting player data for {}", id);

        let response = self
            .client
            .post(self.player_url())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, "player request"));
        }

        let body: PlayerResponse = response.json().await?;
        metadata_from_response(id, body)
    }

    async fn open_audio(
        &self,
        metadata: &Metadata,
        quality: AudioQuality,
    ) -> Result<AudioStream, ProviderError> {
        let format = metadata.choose_format(quality).ok_or_else(|| {
            ProviderError::new(
                ProviderErrorKind::NoAudio,
                format!("No audio format available for {}", metadata.id),
            )
        })?;

        tracing::debug!(
            "Opening itag {} ({}, {} bps) for {}",
            format.itag,
            format.mime_type,
            format.bitrate,
            metadata.id
        );

        let response = self.client.get(&format.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, "audio request"));
        }

        let content_length = response.content_length().or(format.content_length);
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(ProviderError::from))
            .boxed();

        Ok(AudioStream {
            mime_type: format.mime_type.clone(),
            content_length,
            body,
        })
    }
}

fn status_error(status: reqwest::StatusCode, what: &str) -> ProviderError {
    let kind = if status == reqwest::StatusCode::GONE {
        ProviderErrorKind::Gone
    } else {
        ProviderErrorKind::Upstream
    };
    ProviderError::new(kind, format!("{} failed: status code {}", what, status.as_u16()))
}

fn metadata_from_response(id: &VideoId, body: PlayerResponse) -> Result<Metadata, ProviderError> {
    let playability = body.playability_status.ok_or_else(|| {
        ProviderError::new(ProviderErrorKind::Decode, "missing playabilityStatus")
    })?;

    match playability.status.as_str() {
        "OK" => {}
        // Removed, private or terminated videos all report ERROR
        "ERROR" => {
            return Err(ProviderError::new(
                ProviderErrorKind::Gone,
                playability
                    .reason
                    .unwrap_or_else(|| "Video unavailable".to_string()),
            ))
        }
        other => {
            return Err(ProviderError::new(
                ProviderErrorKind::Unplayable,
                playability
                    .reason
                    .unwrap_or_else(|| format!("playability status {}", other)),
            ))
        }
    }

    let details = body
        .video_details
        .ok_or_else(|| ProviderError::new(ProviderErrorKind::Decode, "missing videoDetails"))?;

    let formats = body
        .streaming_data
        .map(|data| data.adaptive_formats)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|raw| {
            // Ciphered formats carry no direct URL
            let url = raw.url?;
            Some(AudioFormat {
                itag: raw.itag,
                mime_type: raw.mime_type,
                bitrate: raw.bitrate,
                content_length: raw.content_length.and_then(|s| s.parse().ok()),
                url,
            })
        })
        .collect();

    Ok(Metadata {
        id: details.video_id.unwrap_or_else(|| id.to_string()),
        title: details.title.unwrap_or_else(|| id.to_string()),
        author: details.author,
        duration_secs: details.length_seconds.and_then(|s| s.parse().ok()),
        formats,
    })
}
