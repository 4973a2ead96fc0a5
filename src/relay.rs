//! Byte relay from a remote source into a response body
//!
//! A relay has two phases:
//! - `prime` pulls the first chunk while the status code can still change
//! - `into_body` commits and hands the rest to a forwarding task
//!
//! The forwarding task owns the source stream. It writes into a bounded
//! channel whose receiver is the response body, so a slow client stalls the
//! source and a dropped client ends the task and releases the source.

use axum::body::Body;
use bytes::Bytes;
use futures_util::stream::{self, BoxStream};
use futures_util::StreamExt;
use std::io;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::metrics::{Metrics, RelayOutcome};
use crate::provider::ProviderError;

/// Chunks buffered between the source and the client
pub const RELAY_BUFFER_CHUNKS: usize = 8;

type Source = BoxStream<'static, Result<Bytes, ProviderError>>;

/// A source whose first chunk has already been read
pub struct PrimedRelay {
    first: Option<Bytes>,
    rest: Source,
}

impl std::fmt::Debug for PrimedRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrimedRelay")
            .field("first_len", &self.first.as_ref().map(Bytes::len))
            .finish_non_exhaustive()
    }
}

/// Labels attached to relay log lines
#[derive(Debug, Clone)]
pub struct RelayContext {
    pub video_id: String,
    pub action: &'static str,
    pub metrics: Arc<Metrics>,
}

/// Read the first chunk of `source`.
///
/// A failure here happens before anything is committed, so the caller can
/// still answer with an error status.
pub async fn prime(mut source: Source) -> Result<PrimedRelay, ProviderError> {
    let first = loop {
        match source.next().await {
            Some(Ok(chunk)) if chunk.is_empty() => continue,
            Some(Ok(chunk)) => break Some(chunk),
            Some(Err(e)) => return Err(e),
            None => break None,
        }
    };
    Ok(PrimedRelay {
        first,
        rest: source,
    })
}

impl PrimedRelay {
    /// Commit: spawn the forwarding task and return the response body.
    pub fn into_body(self, ctx: RelayContext) -> Body {
        let (tx, rx) = mpsc::channel(RELAY_BUFFER_CHUNKS);
        tokio::spawn(forward(self.first, self.rest, tx, ctx));

        Body::from_stream(stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        }))
    }
}

async fn forward(
    first: Option<Bytes>,
    mut source: Source,
    tx: mpsc::Sender<io::Result<Bytes>>,
    ctx: RelayContext,
) -> RelayOutcome {
    let _active = ctx.metrics.relay_started();
    let mut relayed: u64 = 0;

    let outcome = 'relay: {
        if let Some(chunk) = first {
            let len = chunk.len() as u64;
            if tx.send(Ok(chunk)).await.is_err() {
                break 'relay RelayOutcome::ClientClosed;
            }
            relayed += len;
        }

        loop {
            let next = tokio::select! {
                _ = tx.closed() => break 'relay RelayOutcome::ClientClosed,
                next = source.next() => next,
            };

            match next {
                Some(Ok(chunk)) => {
                    let len = chunk.len() as u64;
                    if tx.send(Ok(chunk)).await.is_err() {
                        break 'relay RelayOutcome::ClientClosed;
                    }
                    relayed += len;
                }
                Some(Err(e)) => {
                    // Headers are out; the only signal left is aborting the body
                    tracing::error!(
                        "Error {} {} after {} bytes: {}",
                        ctx.action,
                        ctx.video_id,
                        relayed,
                        e
                    );
                    let _ = tx.send(Err(io::Error::other(e.to_string()))).await;
                    break 'relay RelayOutcome::SourceFailed;
                }
                None => break 'relay RelayOutcome::Completed,
            }
        }
    };

    // Release the upstream connection before reporting
    drop(source);

    match outcome {
        RelayOutcome::Completed => {
            tracing::info!("Finished {} {} ({} bytes)", ctx.action, ctx.video_id, relayed)
        }
        RelayOutcome::ClientClosed => tracing::info!(
            "Client closed connection while {} {} ({} bytes sent)",
            ctx.action,
            ctx.video_id,
            relayed
        ),
        RelayOutcome::SourceFailed => ctx.metrics.record_error("stream_failure"),
    }

    ctx.metrics.record_bytes(relayed);
    ctx.metrics.record_outcome(outcome);
    outcome
}
