use thiserror::Error;

use crate::provider::{ProviderError, ProviderErrorKind};

/// Process-level error type for the relay server
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Request-level failures, classified the way clients see them
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    #[error("Invalid YouTube Music ID")]
    InvalidIdentifier,

    #[error("Music is no longer available")]
    ResourceGone,

    #[error("{0}")]
    RetrievalFailure(String),

    #[error("{0}")]
    StreamFailure(String),
}

impl RelayError {
    /// Short label used for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::InvalidIdentifier => "invalid_identifier",
            RelayError::ResourceGone => "resource_gone",
            RelayError::RetrievalFailure(_) => "retrieval_failure",
            RelayError::StreamFailure(_) => "stream_failure",
        }
    }
}

impl From<ProviderError> for RelayError {
    fn from(err: ProviderError) -> Self {
        match err.kind {
            ProviderErrorKind::Gone => RelayError::ResourceGone,
            _ => RelayError::RetrievalFailure(err.to_string()),
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, ServerError>;
