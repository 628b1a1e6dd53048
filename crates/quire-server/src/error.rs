//! Error types for the server authority and editor session.

use quire_core::OtError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServerError {
    /// The client based its edit on a revision the server never had.
    #[error("Revision {revision} not in history (length {history})")]
    RevisionOutOfRange { revision: usize, history: usize },

    /// The authorization predicate refused the client.
    #[error("Client is not allowed to edit")]
    Unauthorized,

    #[error(transparent)]
    Operation(#[from] OtError),
}

impl From<serde_json::Error> for ServerError {
    fn from(err: serde_json::Error) -> Self {
        ServerError::Operation(OtError::from(err))
    }
}

/// Result type for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;
