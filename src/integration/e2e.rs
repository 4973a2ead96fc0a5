//! End-to-end integration tests

use axum::body::Body;
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::Router;
use bytes::Bytes;
use std::sync::Arc;
use tower::util::ServiceExt;

use crate::http::create_router;
use crate::integration::fixtures::{
    audio_payload, fast_retry_config, ids, sample_metadata, MockProvider, MockUpstream,
};
use crate::provider::{InnertubeProvider, ProviderError, ProviderErrorKind, TransportConfig};
use crate::state::AppState;

struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: Result<Bytes, String>,
}

impl Reply {
    fn text(&self) -> String {
        String::from_utf8_lossy(self.body.as_ref().unwrap()).into_owned()
    }

    fn disposition(&self) -> &str {
        self.headers
            .get(header::CONTENT_DISPOSITION)
            .unwrap()
            .to_str()
            .unwrap()
    }
}

async fn get(app: &Router, uri: &str) -> Reply {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .map_err(|e| e.to_string());
    Reply {
        status,
        headers,
        body,
    }
}

fn app_with(provider: Arc<MockProvider>) -> Router {
    create_router(Arc::new(AppState::new(fast_retry_config(), provider)))
}

fn chunks(parts: &[&'static str]) -> Vec<Result<Bytes, ProviderError>> {
    parts
        .iter()
        .map(|p| Ok(Bytes::from_static(p.as_bytes())))
        .collect()
}

fn upstream_error(msg: &str) -> ProviderError {
    ProviderError::new(ProviderErrorKind::Upstream, msg)
}

fn gone() -> ProviderError {
    ProviderError::new(ProviderErrorKind::Gone, "status code 410")
}

// Route behavior against a scripted provider

#[tokio::test]
async fn test_root_banner_never_touches_provider() {
    let provider = Arc::new(MockProvider::new(vec![Err(upstream_error("down"))]));
    let app = app_with(provider.clone());

    let reply = get(&app, "/").await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.text(), "YouTube Music Streamer/Downloader");
    assert_eq!(provider.metadata_calls(), 0);
}

#[tokio::test]
async fn test_malformed_ids_rejected_without_lookup() {
    let provider = Arc::new(MockProvider::new(vec![]));
    let app = app_with(provider.clone());

    for route in ["stream", "download"] {
        for bad in ["short", "dQw4w9WgXcQx", "dQw4w9WgXc!", "dQw4w9WgX.Q"] {
            let reply = get(&app, &format!("/{}/{}", route, bad)).await;
            assert_eq!(reply.status, StatusCode::BAD_REQUEST, "{}/{}", route, bad);
            assert_eq!(reply.text(), "Invalid YouTube Music ID");
        }
    }

    assert_eq!(provider.metadata_calls(), 0);
    assert_eq!(provider.audio_calls(), 0);
}

#[tokio::test]
async fn test_stream_success() {
    let provider = Arc::new(
        MockProvider::new(vec![Ok(sample_metadata("Never Gonna Give You Up"))])
            .with_audio(Ok(chunks(&["ID3", "frame-1", "frame-2"]))),
    );
    let app = app_with(provider);

    let reply = get(&app, "/stream/dQw4w9WgXcQ").await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.headers[header::CONTENT_TYPE], "audio/mpeg");
    assert_eq!(
        reply.disposition(),
        "inline; filename=\"Never Gonna Give You Up.mp3\""
    );
    assert_eq!(reply.text(), "ID3frame-1frame-2");
}

#[tokio::test]
async fn test_padded_id_is_trimmed() {
    let provider = Arc::new(
        MockProvider::new(vec![Ok(sample_metadata("Song"))])
            .with_audio(Ok(chunks(&["ID3", "data"]))),
    );
    let app = app_with(provider.clone());

    let reply = get(&app, "/stream/%20dQw4w9WgXcQ%20").await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.text(), "ID3data");
    assert_eq!(provider.metadata_calls(), 1);
}

#[tokio::test]
async fn test_download_success() {
    let provider = Arc::new(
        MockProvider::new(vec![Ok(sample_metadata("Song"))])
            .with_audio(Ok(chunks(&["ID3", "data"]))),
    );
    let app = app_with(provider);

    let reply = get(&app, "/download/dQw4w9WgXcQ").await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.headers[header::CONTENT_TYPE], "audio/mpeg");
    assert!(reply.disposition().starts_with("attachment;"));
    assert_eq!(reply.text(), "ID3data");
}

#[tokio::test]
async fn test_gone_on_final_attempt_is_404_on_both_routes() {
    for (route, action) in [("stream", "streaming"), ("download", "downloading")] {
        let provider = Arc::new(MockProvider::new(vec![
            Err(upstream_error("flaky")),
            Err(upstream_error("flaky")),
            Err(gone()),
        ]));
        let app = app_with(provider.clone());

        let reply = get(&app, &format!("/{}/dQw4w9WgXcQ", route)).await;

        assert_eq!(reply.status, StatusCode::NOT_FOUND, "{}", action);
        assert_eq!(reply.text(), "Music is no longer available");
        assert_eq!(provider.metadata_calls(), 3);
        assert_eq!(provider.audio_calls(), 0);
    }
}

#[tokio::test]
async fn test_retrieval_failure_is_500_with_message() {
    let provider = Arc::new(MockProvider::new(vec![
        Err(upstream_error("one")),
        Err(upstream_error("two")),
        Err(upstream_error("status code 503")),
    ]));
    let app = app_with(provider.clone());

    let reply = get(&app, "/download/dQw4w9WgXcQ").await;

    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(reply.text(), "Error downloading music: status code 503");
    assert_eq!(provider.metadata_calls(), 3);
}

#[tokio::test]
async fn test_stream_error_before_first_byte_is_500() {
    let provider = Arc::new(
        MockProvider::new(vec![Ok(sample_metadata("Song"))])
            .with_audio(Ok(vec![Err(ProviderError::new(
                ProviderErrorKind::Transport,
                "connection reset",
            ))])),
    );
    let app = app_with(provider);

    let reply = get(&app, "/stream/dQw4w9WgXcQ").await;

    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(reply.text(), "Error streaming music");
    assert!(reply.headers.get(header::CONTENT_DISPOSITION).is_none());
}

#[tokio::test]
async fn test_stream_error_after_commit_keeps_single_status() {
    let mut script = chunks(&["ID3", "frame-1"]);
    script.push(Err(ProviderError::new(
        ProviderErrorKind::Transport,
        "connection reset",
    )));
    let provider =
        Arc::new(MockProvider::new(vec![Ok(sample_metadata("Song"))]).with_audio(Ok(script)));
    let app = app_with(provider);

    let reply = get(&app, "/stream/dQw4w9WgXcQ").await;

    // The 200 already went out; the body is cut instead of a second status
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.disposition().starts_with("inline;"));
    assert!(reply.body.is_err());
}

#[tokio::test]
async fn test_audio_open_gone_is_404() {
    let provider =
        Arc::new(MockProvider::new(vec![Ok(sample_metadata("Song"))]).with_audio(Err(gone())));
    let app = app_with(provider);

    let reply = get(&app, "/download/dQw4w9WgXcQ").await;

    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.text(), "Music is no longer available");
}

#[tokio::test]
async fn test_audio_open_failure_is_500() {
    let provider = Arc::new(
        MockProvider::new(vec![Ok(sample_metadata("Song"))])
            .with_audio(Err(upstream_error("status code 403"))),
    );
    let app = app_with(provider);

    let reply = get(&app, "/stream/dQw4w9WgXcQ").await;

    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(reply.text(), "Error streaming music");
}

#[tokio::test]
async fn test_metrics_reflect_requests() {
    let provider = Arc::new(MockProvider::new(vec![]));
    let state = Arc::new(AppState::new(fast_retry_config(), provider));
    let app = create_router(state.clone());

    get(&app, "/stream/bad").await;
    get(&app, "/").await;
    let reply = get(&app, "/metrics").await;

    assert_eq!(reply.status, StatusCode::OK);
    let text = reply.text();
    assert!(text.contains("relay_requests_by_endpoint{endpoint=\"/stream/{video_id}\"} 1"));
    assert!(text.contains("relay_errors_total{type=\"invalid_identifier\"} 1"));
    assert_eq!(state.metrics.error_count("invalid_identifier"), 1);
}

// The real player adapter against a mock upstream

async fn upstream_app() -> (MockUpstream, Router) {
    let upstream = MockUpstream::start().await;
    let provider =
        InnertubeProvider::with_base_url(upstream.base_url(), "en", &TransportConfig::default())
            .unwrap();
    let state = Arc::new(AppState::new(fast_retry_config(), Arc::new(provider)));
    (upstream, create_router(state))
}

#[tokio::test]
async fn test_upstream_playable_track() {
    let (upstream, app) = upstream_app().await;

    let reply = get(&app, &format!("/stream/{}", ids::PLAYABLE)).await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(
        reply.disposition(),
        format!("inline; filename=\"Track {}.mp3\"", ids::PLAYABLE)
    );
    assert_eq!(
        reply.headers[header::CONTENT_LENGTH],
        audio_payload().len().to_string().as_str()
    );
    assert_eq!(&reply.body.unwrap()[..], &audio_payload()[..]);
    assert_eq!(upstream.player_calls(), 1);
}

#[tokio::test]
async fn test_upstream_410_is_retried_then_404() {
    let (upstream, app) = upstream_app().await;

    let reply = get(&app, &format!("/download/{}", ids::REMOVED)).await;

    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.text(), "Music is no longer available");
    assert_eq!(upstream.player_calls(), 3);
}

#[tokio::test]
async fn test_upstream_terminated_video_is_404() {
    let (_upstream, app) = upstream_app().await;

    let reply = get(&app, &format!("/stream/{}", ids::TERMINATED)).await;

    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_upstream_recovers_within_retry_bound() {
    let (upstream, app) = upstream_app().await;

    let reply = get(&app, &format!("/stream/{}", ids::FLAKY)).await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(upstream.player_calls(), 3);
}

#[tokio::test]
async fn test_upstream_unplayable_reason_is_reported() {
    let (_upstream, app) = upstream_app().await;

    let reply = get(&app, &format!("/stream/{}", ids::AGE_GATED)).await;

    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        reply.text(),
        "Error streaming music: Sign in to confirm your age"
    );
}

#[tokio::test]
async fn test_upstream_audio_refused() {
    let (_upstream, app) = upstream_app().await;

    let reply = get(&app, &format!("/download/{}", ids::FORBIDDEN_AUDIO)).await;

    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(reply.text(), "Error downloading music");
}

// Streaming over a live socket

#[tokio::test]
async fn test_download_over_tcp() {
    let (_upstream, app) = upstream_app().await;

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let response = reqwest::get(format!("http://{}/download/{}", addr, ids::PLAYABLE))
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/mpeg");
    assert!(response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .starts_with("attachment;"));

    let body = response.bytes().await.unwrap();
    assert_eq!(&body[..], &audio_payload()[..]);
}
