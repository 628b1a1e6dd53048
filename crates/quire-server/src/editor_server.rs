//! Multi-client editing session around one [`ServerAuthority`].
//!
//! Owns the document, its history and the participant registry behind one
//! lock, so edits from different connections are applied one at a time and
//! their acknowledgements and broadcasts go out in history order.

use crate::authority::ServerAuthority;
use crate::error::{Result, ServerError};
use crate::protocol::{ClientId, DocSnapshot, ServerMessage, UserRecord};
use parking_lot::Mutex;
use quire_core::{Operation, Selection, WrappedOperation};
use std::collections::BTreeMap;
use tracing::{debug, error, info, warn};

/// An edit as stored by the session: the operation plus the author's
/// selection after it.
pub type SessionOperation = WrappedOperation<Option<Selection>>;

/// Delivers messages to connected clients.
pub trait ClientSink: Send + Sync {
    fn send(&self, to: &ClientId, message: ServerMessage);

    /// Send to every client in the session except `except`.
    fn broadcast(&self, except: &ClientId, message: ServerMessage);
}

/// Decides whether a client may edit or move its cursor.
pub trait MayWrite: Send + Sync {
    fn may_write(&self, client: &ClientId) -> bool;
}

/// Lets every client write.
#[derive(Clone, Copy, Debug, Default)]
pub struct AllowAll;

impl MayWrite for AllowAll {
    fn may_write(&self, _client: &ClientId) -> bool {
        true
    }
}

impl<F> MayWrite for F
where
    F: Fn(&ClientId) -> bool + Send + Sync,
{
    fn may_write(&self, client: &ClientId) -> bool {
        self(client)
    }
}

/// Configuration for an editing session.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Identifier of the shared document.
    pub document_id: String,
    /// Longest document, in characters, that an edit may grow it to.
    pub max_length: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            document_id: "default".to_string(),
            max_length: None,
        }
    }
}

/// Builder for server configuration.
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    pub fn document_id(mut self, id: impl Into<String>) -> Self {
        self.config.document_id = id.into();
        self
    }

    pub fn max_length(mut self, max_length: usize) -> Self {
        self.config.max_length = Some(max_length);
        self
    }

    pub fn build(self) -> ServerConfig {
        self.config
    }
}

impl Default for ServerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

struct DocumentState {
    authority: ServerAuthority<SessionOperation>,
    users: BTreeMap<ClientId, UserRecord>,
}

impl DocumentState {
    fn snapshot(&self, force: bool) -> DocSnapshot {
        DocSnapshot {
            text: self.authority.document().to_string(),
            revision: self.authority.revision(),
            clients: self.users.clone(),
            force,
        }
    }

    fn user(&mut self, client: &ClientId) -> &mut UserRecord {
        self.users.entry(client.clone()).or_default()
    }
}

/// A shared document with any number of connected clients.
pub struct EditorServer<S, P = AllowAll> {
    config: ServerConfig,
    state: Mutex<DocumentState>,
    sink: S,
    policy: P,
}

impl<S: ClientSink> EditorServer<S, AllowAll> {
    pub fn new(config: ServerConfig, document: impl Into<String>, sink: S) -> Self {
        Self::with_history(config, document, Vec::new(), sink)
    }

    /// Resume a session from a stored document and history.
    pub fn with_history(
        config: ServerConfig,
        document: impl Into<String>,
        history: Vec<SessionOperation>,
        sink: S,
    ) -> Self {
        let mut authority = ServerAuthority::with_history(document, history);
        authority.set_document_max_length(config.max_length);
        Self {
            config,
            state: Mutex::new(DocumentState {
                authority,
                users: BTreeMap::new(),
            }),
            sink,
            policy: AllowAll,
        }
    }
}

impl<S: ClientSink, P: MayWrite> EditorServer<S, P> {
    /// Replace the authorization predicate.
    pub fn with_policy<Q: MayWrite>(self, policy: Q) -> EditorServer<S, Q> {
        EditorServer {
            config: self.config,
            state: self.state,
            sink: self.sink,
            policy,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn document(&self) -> String {
        self.state.lock().authority.document().to_string()
    }

    pub fn revision(&self) -> usize {
        self.state.lock().authority.revision()
    }

    pub fn users(&self) -> BTreeMap<ClientId, UserRecord> {
        self.state.lock().users.clone()
    }

    /// State to hand a newly connected client.
    pub fn add_client(&self, client: &ClientId) -> DocSnapshot {
        let state = self.state.lock();
        info!(document = %self.config.document_id, %client, "Client joined");
        state.snapshot(false)
    }

    fn authorize(&self, client: &ClientId) -> Result<()> {
        if self.policy.may_write(client) {
            Ok(())
        } else {
            debug!(%client, "Client doesn't have the right to edit");
            Err(ServerError::Unauthorized)
        }
    }

    /// A client sent an edit in wire format.
    ///
    /// Malformed input is rejected without touching the document, and the
    /// sender gets a forced snapshot to reload from. Returns the rebased
    /// operation, or `None` if the length limit dropped it.
    pub fn on_operation(
        &self,
        client: &ClientId,
        revision: usize,
        operation: &serde_json::Value,
        selection: Option<&serde_json::Value>,
    ) -> Result<Option<Operation>> {
        self.authorize(client)?;
        let decoded = Operation::from_json(operation).and_then(|operation| {
            let selection = selection.map(Selection::from_json).transpose()?;
            Ok(WrappedOperation::new(operation, selection))
        });
        let wrapped = match decoded {
            Ok(wrapped) => wrapped,
            Err(err) => {
                error!(%client, %err, "Invalid operation received, resending document");
                let snapshot = self.state.lock().snapshot(true);
                self.sink.send(client, ServerMessage::Doc(snapshot));
                return Err(err.into());
            }
        };
        self.receive(client, revision, wrapped)
    }

    /// A client sent an already decoded edit.
    pub fn receive(
        &self,
        client: &ClientId,
        revision: usize,
        operation: SessionOperation,
    ) -> Result<Option<Operation>> {
        self.authorize(client)?;
        let mut state = self.state.lock();
        let rebased = match state.authority.receive_operation(revision, operation) {
            Ok(Some(rebased)) => rebased,
            Ok(None) => return Ok(None),
            Err(err) => {
                error!(%client, %err, "Rejected operation, resending document");
                self.sink.send(client, ServerMessage::Doc(state.snapshot(true)));
                return Err(err);
            }
        };

        state.user(client).selection = rebased.meta.clone();
        let revision = state.authority.revision();
        debug!(%client, revision, "Accepted operation");
        self.sink.send(client, ServerMessage::Ack { revision });
        self.sink.broadcast(
            client,
            ServerMessage::Operation {
                client_id: client.clone(),
                revision,
                operation: rebased.operation.clone(),
                selection: rebased.meta,
            },
        );
        Ok(Some(rebased.operation))
    }

    /// Send history `[base, head)` to a client that fell behind.
    pub fn on_get_operations(&self, client: &ClientId, base: usize, head: usize) {
        let state = self.state.lock();
        let operations: Vec<Operation> = state
            .authority
            .operations(base, head)
            .iter()
            .map(|op| op.operation.clone())
            .collect();
        if operations.len() != head.saturating_sub(base) {
            warn!(%client, base, head, available = operations.len(), "Requested history range is incomplete");
        }
        self.sink.send(client, ServerMessage::Operations { head, operations });
    }

    pub fn update_selection(&self, client: &ClientId, selection: Option<Selection>) -> Result<()> {
        self.authorize(client)?;
        let mut state = self.state.lock();
        state.user(client).selection = selection.clone();
        self.sink.broadcast(
            client,
            ServerMessage::Selection {
                client_id: client.clone(),
                selection,
            },
        );
        Ok(())
    }

    pub fn set_name(&self, client: &ClientId, name: impl Into<String>) {
        let name = name.into();
        let mut state = self.state.lock();
        state.user(client).name = Some(name.clone());
        self.sink.broadcast(
            client,
            ServerMessage::SetName {
                client_id: client.clone(),
                name,
            },
        );
    }

    pub fn set_color(&self, client: &ClientId, color: impl Into<String>) {
        let color = color.into();
        let mut state = self.state.lock();
        state.user(client).color = Some(color.clone());
        self.sink.broadcast(
            client,
            ServerMessage::SetColor {
                client_id: client.clone(),
                color,
            },
        );
    }

    pub fn on_disconnect(&self, client: &ClientId) {
        let mut state = self.state.lock();
        state.users.remove(client);
        info!(document = %self.config.document_id, %client, "Client left");
        self.sink.broadcast(
            client,
            ServerMessage::ClientLeft {
                client_id: client.clone(),
            },
        );
    }
}
