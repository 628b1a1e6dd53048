//! # Quire Server
//!
//! Server side of collaborative text editing.
//!
//! [`ServerAuthority`] holds the canonical document and its ordered history
//! and rebases every incoming edit onto it. [`EditorServer`] wraps one
//! authority into a session shared by many clients, with a participant
//! registry, an authorization predicate and a message sink.

pub mod authority;
pub mod editor_server;
pub mod error;
pub mod protocol;

pub use authority::ServerAuthority;
pub use editor_server::{
    AllowAll, ClientSink, EditorServer, MayWrite, ServerConfig, ServerConfigBuilder,
    SessionOperation,
};
pub use error::{Result, ServerError};
pub use protocol::{ClientId, DocSnapshot, ServerMessage, UserRecord};
