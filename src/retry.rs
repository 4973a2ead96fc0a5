//! Bounded metadata retrieval
//!
//! Attempts are sequential with a fixed pause between them. Each request
//! retries on its own; nothing is shared across requests.

use std::future::Future;
use std::time::Duration;

use crate::config::RetryConfig;
use crate::error::RelayError;
use crate::identifier::VideoId;
use crate::provider::{AudioProvider, Metadata};

/// Retry bound and fixed delay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            delay: Duration::from_millis(config.delay_ms),
        }
    }
}

/// Real-time delay used outside of tests
pub async fn tokio_sleep(delay: Duration) {
    tokio::time::sleep(delay).await
}

/// Fetch metadata, retrying failures up to the policy bound.
///
/// Only the error of the last attempt is classified: a gone signal becomes
/// `ResourceGone`, anything else is surfaced as `RetrievalFailure`.
pub async fn fetch_metadata_with_retry<S, F>(
    provider: &dyn AudioProvider,
    id: &VideoId,
    policy: RetryPolicy,
    sleep: S,
) -> Result<Metadata, RelayError>
where
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match provider.fetch_metadata(id).await {
            Ok(metadata) => {
                if attempt > 1 {
                    tracing::info!("Metadata for {} fetched on attempt {}", id, attempt);
                }
                return Ok(metadata);
            }
            Err(e) => {
                tracing::warn!(
                    "Attempt {} failed for {} ({}): {}",
                    attempt,
                    id,
                    e.kind.as_str(),
                    e
                );
                if attempt >= attempts {
                    return Err(RelayError::from(e));
                }
            }
        }

        sleep(policy.delay).await;
        attempt += 1;
    }
}
