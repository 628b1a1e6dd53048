//! Error types for the operation algebra.

use thiserror::Error;

/// Errors that can occur while applying, composing, transforming or decoding
/// operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OtError {
    /// An operation was used against input of the wrong length.
    #[error("Length mismatch: expected {expected} characters, found {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// A wire-format operation or selection could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),
}

impl From<serde_json::Error> for OtError {
    fn from(err: serde_json::Error) -> Self {
        OtError::Decode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, OtError>;
