//! Error types for fxstream records.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error object returned by the API.
///
/// The same shape is used for rejected requests (top-level `code`, `message`,
/// `moreInfo`) and for the body of a planned `disconnect` notice on a stream.
#[derive(Error, Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[error("API error {code}: {message}")]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Numeric error code. Zero means no error.
    #[serde(default)]
    pub code: i64,
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
    /// Link or hint with further details, frequently empty.
    #[serde(default)]
    pub more_info: String,
}

impl ApiError {
    /// Creates a new API error.
    #[must_use]
    pub fn new(code: i64, message: impl Into<String>, more_info: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            more_info: more_info.into(),
        }
    }

    /// Returns true if the code signals an actual error.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.code != 0
    }
}

/// Errors that can occur while decoding a timestamp.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimeError {
    /// Numeric timestamp outside the representable range.
    #[error("Timestamp out of range: {0}")]
    OutOfRange(String),

    /// String that is neither a UNIX timestamp nor RFC 3339.
    #[error("Invalid timestamp '{0}'")]
    Invalid(String),
}
