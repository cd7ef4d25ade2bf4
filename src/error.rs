use std::fmt;

use hyper::StatusCode;
use thiserror::Error;

/// Why an upstream request did not produce a body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamFailure {
    Status(StatusCode),
    Transport(String),
}

impl fmt::Display for UpstreamFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpstreamFailure::Status(status) => write!(f, "HTTP status {}", status),
            UpstreamFailure::Transport(msg) => write!(f, "transport error: {}", msg),
        }
    }
}

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Upstream error for {url}: {reason}")]
    Upstream { url: String, reason: UpstreamFailure },
    #[error("Decode error for {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),
    #[error("Cache unavailable: {0}")]
    CacheUnavailable(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RelayError {
    pub fn upstream_status(url: impl Into<String>, status: StatusCode) -> Self {
        RelayError::Upstream {
            url: url.into(),
            reason: UpstreamFailure::Status(status),
        }
    }

    pub fn upstream_transport(url: impl Into<String>, msg: impl fmt::Display) -> Self {
        RelayError::Upstream {
            url: url.into(),
            reason: UpstreamFailure::Transport(msg.to_string()),
        }
    }

    /// HTTP status the front end answers with for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            RelayError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            RelayError::Upstream {
                reason: UpstreamFailure::Status(StatusCode::NOT_FOUND),
                ..
            } => StatusCode::NOT_FOUND,
            RelayError::Upstream { .. } | RelayError::Decode { .. } => StatusCode::BAD_GATEWAY,
            RelayError::CacheUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            RelayError::Config(_) | RelayError::Io(_) | RelayError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;
