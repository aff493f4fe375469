//! Error types for streaming sessions.

use fxstream_types::ApiError;
use thiserror::Error;

/// Errors returned by a stream session.
///
/// Transient transport failures never appear here: they are retried inside
/// the session until it is stopped.
#[derive(Error, Debug)]
pub enum StreamError {
    /// The server rejected the request; reconnecting would reproduce the error.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The session is already connected and handling messages.
    #[error("Stream is already running")]
    AlreadyRunning,

    /// Invalid construction argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

impl StreamError {
    /// Returns the API error, if the server rejected the request.
    #[must_use]
    pub const fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Api(err) => Some(err),
            _ => None,
        }
    }
}

/// Errors raised while decoding the payload of a single data frame.
///
/// These are isolated to the frame they occur in.
#[derive(Error, Debug)]
pub enum PayloadError {
    /// Payload is not valid JSON for the expected record.
    #[error("Malformed {kind} payload: {source}")]
    Json {
        /// Frame kind.
        kind: String,
        /// The underlying JSON error.
        source: serde_json::Error,
    },

    /// Data frame of a kind the feed does not carry.
    #[error("Unexpected frame kind '{0}'")]
    UnexpectedKind(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_accessor() {
        let err = StreamError::from(ApiError::new(1, "Invalid instrument", ""));
        assert_eq!(err.api_error().map(|e| e.code), Some(1));
        assert!(StreamError::AlreadyRunning.api_error().is_none());
    }
}
