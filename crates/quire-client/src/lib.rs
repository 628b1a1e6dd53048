//! # Quire Client
//!
//! Client side of collaborative text editing.
//!
//! - [`Client`]: the revision protocol, keeping one edit in flight and
//!   buffering the rest
//! - [`UndoManager`]: undo/redo stacks that stay valid under remote edits
//! - [`EditorClient`]: glue between a text widget, the server connection and
//!   the two above
//!
//! # Quick Start
//!
//! ```rust
//! use quire_client::{Client, ClientSink, Result};
//! use quire_core::Operation;
//!
//! struct Doc {
//!     text: String,
//!     outbox: Vec<(usize, Operation)>,
//! }
//!
//! impl ClientSink<Operation> for Doc {
//!     fn send_operation(&mut self, revision: usize, operation: &Operation) {
//!         self.outbox.push((revision, operation.clone()));
//!     }
//!     fn apply_operation(&mut self, operation: &Operation) -> Result<()> {
//!         self.text = operation.apply(&self.text)?;
//!         Ok(())
//!     }
//!     fn get_operations(&mut self, _base: usize, _head: usize) {}
//! }
//!
//! let mut doc = Doc { text: "lorem".to_string(), outbox: Vec::new() };
//! let mut client = Client::new(0);
//!
//! let edit = Operation::new().retain(5).insert(" ipsum");
//! doc.text = edit.apply(&doc.text).unwrap();
//! client.apply_client(edit, &mut doc).unwrap();
//! assert_eq!(doc.outbox.len(), 1);
//!
//! client.server_ack(1, &mut doc).unwrap();
//! assert!(client.is_synchronized());
//! ```

pub mod editor;
pub mod error;
pub mod meta;
pub mod presence;
pub mod protocol;
pub mod undo;

pub use editor::{ClientConfig, ClientConfigBuilder, EditorAdapter, EditorClient, ServerAdapter};
pub use error::{ClientError, Result};
pub use meta::SelfMeta;
pub use presence::{CursorColors, RemoteClient, RemoteClientInfo, RemoteClients};
pub use protocol::{Client, ClientSink, ClientState};
pub use undo::{UndoManager, DEFAULT_MAX_ITEMS};
