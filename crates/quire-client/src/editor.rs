//! Editor-facing controller.
//!
//! `EditorClient` sits between a text widget and the server connection. It
//! feeds local edits through the revision protocol, records them for undo,
//! applies remote edits back to the widget and tracks the cursors of the
//! other participants.

use crate::error::Result;
use crate::meta::SelfMeta;
use crate::presence::{RemoteClientInfo, RemoteClients};
use crate::protocol::{Client, ClientSink, ClientState};
use crate::undo::{UndoManager, DEFAULT_MAX_ITEMS};
use quire_core::{Edit, Operation, Selection, WrappedOperation};
use std::collections::HashMap;
use tracing::{debug, warn};

/// The text widget being edited.
pub trait EditorAdapter {
    /// Current document text.
    fn get_value(&self) -> String;

    /// Apply an edit made elsewhere. Must not report it back as a local change.
    fn apply_operation(&mut self, operation: &Operation) -> Result<()>;

    fn get_selection(&self) -> Selection;

    fn set_selection(&mut self, selection: &Selection);

    /// Draw another participant's selection.
    fn set_other_selection(&mut self, client_id: &str, selection: &Selection, color: &str);

    fn remove_other_selection(&mut self, client_id: &str);
}

/// The connection to the server.
pub trait ServerAdapter {
    fn send_operation(&mut self, revision: usize, operation: &Operation, selection: Option<&Selection>);

    fn send_selection(&mut self, selection: Option<&Selection>);

    /// Request the history `[base, head)` after a stale acknowledgement.
    fn get_operations(&mut self, base: usize, head: usize);
}

/// Configuration for an editor client.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Server revision the document was loaded at.
    pub revision: usize,
    /// Maximum entries on each undo stack.
    pub undo_depth: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            revision: 0,
            undo_depth: DEFAULT_MAX_ITEMS,
        }
    }
}

/// Builder for client configuration.
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
        }
    }

    pub fn revision(mut self, revision: usize) -> Self {
        self.config.revision = revision;
        self
    }

    pub fn undo_depth(mut self, depth: usize) -> Self {
        self.config.undo_depth = depth;
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}

impl Default for ClientConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

type UndoEntry = WrappedOperation<SelfMeta>;

/// Routes protocol callbacks to the editor, the server and the undo stacks.
struct Bridge<'a, A, S> {
    editor: &'a mut A,
    server: &'a mut S,
    undo_manager: &'a mut UndoManager<UndoEntry>,
    selection: &'a mut Option<Selection>,
}

impl<A: EditorAdapter, S: ServerAdapter> ClientSink<Operation> for Bridge<'_, A, S> {
    fn send_operation(&mut self, revision: usize, operation: &Operation) {
        self.server.send_operation(revision, operation, self.selection.as_ref());
    }

    fn apply_operation(&mut self, operation: &Operation) -> Result<()> {
        self.editor.apply_operation(operation)?;
        *self.selection = Some(self.editor.get_selection());
        self.undo_manager.transform(operation)
    }

    fn get_operations(&mut self, base: usize, head: usize) {
        self.server.get_operations(base, head);
    }
}

/// Collaborative editing session for one text widget.
pub struct EditorClient<A, S> {
    client: Client<Operation>,
    undo_manager: UndoManager<UndoEntry>,
    editor: A,
    server: S,
    selection: Option<Selection>,
    clients: RemoteClients,
}

impl<A: EditorAdapter, S: ServerAdapter> EditorClient<A, S> {
    pub fn new(
        config: ClientConfig,
        clients: HashMap<String, RemoteClientInfo>,
        editor: A,
        server: S,
    ) -> Self {
        let mut editor_client = Self {
            client: Client::new(config.revision),
            undo_manager: UndoManager::new(config.undo_depth),
            editor,
            server,
            selection: None,
            clients: RemoteClients::from_infos(clients),
        };
        editor_client.redraw_remote_selections();
        editor_client
    }

    fn split(&mut self) -> (&mut Client<Operation>, Bridge<'_, A, S>) {
        (
            &mut self.client,
            Bridge {
                editor: &mut self.editor,
                server: &mut self.server,
                undo_manager: &mut self.undo_manager,
                selection: &mut self.selection,
            },
        )
    }

    pub fn revision(&self) -> usize {
        self.client.revision()
    }

    pub fn state(&self) -> &ClientState<Operation> {
        self.client.state()
    }

    pub fn editor(&self) -> &A {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut A {
        &mut self.editor
    }

    pub fn server(&self) -> &S {
        &self.server
    }

    pub fn server_mut(&mut self) -> &mut S {
        &mut self.server
    }

    pub fn undo_manager(&self) -> &UndoManager<UndoEntry> {
        &self.undo_manager
    }

    pub fn remote_clients(&self) -> &RemoteClients {
        &self.clients
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    // ------------------------------------------------------------------
    // Editor events
    // ------------------------------------------------------------------

    /// The user edited the document. `inverse` reverts `operation` on the
    /// document as it is now.
    pub fn on_change(&mut self, operation: Operation, inverse: Operation) -> Result<()> {
        let selection_before = self.selection.take();
        self.selection = Some(self.editor.get_selection());

        let compose = self
            .undo_manager
            .last_undo()
            .map_or(false, |top| inverse.should_be_composed_with_inverted(&top.operation));
        let inverse_meta = SelfMeta::new(self.selection.clone(), selection_before);

        // The widget already shows the edit, so it goes out even if it can't
        // be recorded for undo.
        let (client, mut bridge) = self.split();
        client.apply_client(operation, &mut bridge)?;

        if let Err(err) = self
            .undo_manager
            .add(WrappedOperation::new(inverse, inverse_meta), compose)
        {
            warn!(%err, "Local edit not recorded for undo");
        }
        Ok(())
    }

    /// Undo the last local edit. Does nothing when there is nothing to undo.
    pub fn undo(&mut self) -> Result<()> {
        if !self.undo_manager.can_undo() {
            return Ok(());
        }
        let editor = &mut self.editor;
        let mut applied = None;
        self.undo_manager.perform_undo(|entry| {
            let inverse = entry.invert(&editor.get_value())?;
            editor.apply_operation(&entry.operation)?;
            applied = Some(entry.clone());
            Ok(inverse)
        })?;
        self.finish_unredo(applied)
    }

    /// Redo the last undone edit. Does nothing when there is nothing to redo.
    pub fn redo(&mut self) -> Result<()> {
        if !self.undo_manager.can_redo() {
            return Ok(());
        }
        let editor = &mut self.editor;
        let mut applied = None;
        self.undo_manager.perform_redo(|entry| {
            let inverse = entry.invert(&editor.get_value())?;
            editor.apply_operation(&entry.operation)?;
            applied = Some(entry.clone());
            Ok(inverse)
        })?;
        self.finish_unredo(applied)
    }

    fn finish_unredo(&mut self, applied: Option<UndoEntry>) -> Result<()> {
        let Some(entry) = applied else {
            return Ok(());
        };
        let (operation, meta) = entry.into_parts();
        self.selection = meta.selection_after;
        if let Some(selection) = &self.selection {
            self.editor.set_selection(selection);
        }
        let (client, mut bridge) = self.split();
        client.apply_client(operation, &mut bridge)
    }

    pub fn on_selection_change(&mut self) {
        let previous = self.selection.take();
        let current = self.editor.get_selection();
        self.selection = Some(current.clone());
        if previous.as_ref() == Some(&current) {
            return;
        }
        self.send_selection(Some(&current));
    }

    pub fn on_blur(&mut self) {
        self.selection = None;
        self.send_selection(None);
    }

    fn send_selection(&mut self, selection: Option<&Selection>) {
        // The selection goes out with the buffered edit instead.
        if matches!(self.client.state(), ClientState::AwaitingWithBuffer { .. }) {
            return;
        }
        self.server.send_selection(selection);
    }

    // ------------------------------------------------------------------
    // Server events
    // ------------------------------------------------------------------

    pub fn server_ack(&mut self, revision: usize) -> Result<()> {
        let (client, mut bridge) = self.split();
        client.server_ack(revision, &mut bridge)
    }

    pub fn server_operation(&mut self, revision: usize, operation: &Operation) -> Result<()> {
        let (client, mut bridge) = self.split();
        client.apply_server(revision, operation, &mut bridge)
    }

    /// Missed history after a stale acknowledgement.
    pub fn server_operations(&mut self, head: usize, operations: &[Operation]) -> Result<()> {
        let (client, mut bridge) = self.split();
        client.apply_operations(head, operations, &mut bridge)
    }

    pub fn server_reconnect(&mut self) {
        let (client, mut bridge) = self.split();
        client.server_reconnect(&mut bridge);
    }

    /// Another participant moved their cursor, or blurred when `None`.
    pub fn server_selection(&mut self, client_id: &str, selection: Option<Selection>) {
        match selection {
            Some(selection) => {
                let selection = self.client.transform_selection(&selection);
                let remote = self.clients.get_or_insert(client_id);
                remote.update_selection(selection.clone());
                let color = remote.selection_color().to_string();
                self.editor.set_other_selection(client_id, &selection, &color);
            }
            None => {
                self.clients.get_or_insert(client_id).remove_selection();
                self.editor.remove_other_selection(client_id);
            }
        }
    }

    /// Full participant list from the server; anyone missing has left.
    pub fn server_clients(&mut self, infos: HashMap<String, RemoteClientInfo>) {
        for client_id in self.clients.ids() {
            if !infos.contains_key(&client_id) {
                self.client_left(&client_id);
            }
        }
        for (client_id, info) in infos {
            if let Some(name) = &info.name {
                self.clients.get_or_insert(&client_id).set_name(name);
            }
            self.server_selection(&client_id, info.selection);
        }
    }

    pub fn client_left(&mut self, client_id: &str) {
        if self.clients.remove(client_id).is_some() {
            debug!(client_id, "Remote client left");
            self.editor.remove_other_selection(client_id);
        }
    }

    pub fn set_name(&mut self, client_id: &str, name: &str) {
        if self.clients.get_or_insert(client_id).set_name(name) {
            self.redraw_remote_selection(client_id);
        }
    }

    pub fn set_color(&mut self, client_id: &str, color: &str) {
        self.clients.get_or_insert(client_id).set_color(color);
        self.redraw_remote_selection(client_id);
    }

    fn redraw_remote_selection(&mut self, client_id: &str) {
        if let Some(remote) = self.clients.get(client_id) {
            if let Some(selection) = &remote.selection {
                self.editor
                    .set_other_selection(client_id, selection, remote.selection_color());
            }
        }
    }

    fn redraw_remote_selections(&mut self) {
        for client_id in self.clients.ids() {
            self.redraw_remote_selection(&client_id);
        }
    }
}
