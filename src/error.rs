//! Error handling types for multidecoder.

use thiserror::Error;

/// Errors that can cross the CLI boundary.
///
/// Decoders themselves never produce this type: per the decoder contract,
/// a decoder that cannot make sense of a candidate simply skips it and
/// returns no hit for that candidate.
#[derive(Debug, Error)]
pub enum MultidecoderError {
    /// Reading the input file or stdin failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// `--keywords` did not point at a usable directory, or a keyword file
    /// could not be read.
    #[error("invalid configuration: {message}")]
    Config { message: String },

    /// JSON tree (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for operations that can cross the CLI boundary.
pub type MultidecoderResult<T> = Result<T, MultidecoderError>;

impl MultidecoderError {
    pub fn config(message: impl Into<String>) -> Self {
        MultidecoderError::Config {
            message: message.into(),
        }
    }
}
