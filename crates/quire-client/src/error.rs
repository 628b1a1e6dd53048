//! Error types for the client protocol and undo manager.

use quire_core::OtError;
use thiserror::Error;

/// Errors raised while driving the client state machine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The server skipped past the next revision this client expected.
    #[error("Invalid revision: expected at most {expected}, received {received}")]
    InvalidRevision { expected: usize, received: usize },

    /// An acknowledgement arrived while nothing was outstanding.
    #[error("There is no pending operation")]
    NoPendingOperation,

    /// Remote operations are ignored until the missed history is fetched.
    #[error("Ignored server-side change while resynchronizing")]
    ResyncInProgress,

    /// Missed history was delivered to a client that was not waiting for it.
    #[error("Client is not waiting for missed operations")]
    NotStale,

    #[error("Nothing to undo")]
    NothingToUndo,

    #[error("Nothing to redo")]
    NothingToRedo,

    #[error(transparent)]
    Operation(#[from] OtError),
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Operation(OtError::from(err))
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
