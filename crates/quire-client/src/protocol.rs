//! Client revision protocol.
//!
//! A client keeps at most one edit in flight. While it waits for the server to
//! acknowledge that edit, further local edits are composed into a single
//! buffer, and remote edits are transformed past both before being applied.
//!
//! ```text
//!                  apply_client
//!   Synchronized ───────────────▶ AwaitingConfirm ──apply_client──▶ AwaitingWithBuffer
//!        ▲                          │        ▲                            │
//!        └────────server_ack────────┘        └─────────server_ack─────────┘
//!
//!   server_ack skipping revisions ─▶ Stale / StaleWithBuffer ─apply_operations─▶ ...
//! ```

use crate::error::{ClientError, Result};
use quire_core::{Edit, Operation, Selection};
use tracing::{debug, warn};

/// The outside world as seen by the protocol: the transport that carries
/// edits to the server and the local document they are applied to.
pub trait ClientSink<E: Edit> {
    /// Send a local edit to the server, based on `revision`.
    fn send_operation(&mut self, revision: usize, operation: &E);

    /// Apply a (transformed) remote edit to the local document.
    fn apply_operation(&mut self, operation: &Operation) -> Result<()>;

    /// Request the server history `[base, head)` that this client missed.
    fn get_operations(&mut self, base: usize, head: usize);
}

/// Where the client stands relative to the server.
#[derive(Clone, Debug, PartialEq)]
pub enum ClientState<E> {
    /// Every local edit has been acknowledged.
    Synchronized,
    /// One edit is in flight.
    AwaitingConfirm { outstanding: E },
    /// One edit is in flight and later local edits are buffered.
    AwaitingWithBuffer { outstanding: E, buffer: E },
    /// The acknowledgement skipped revisions; missed history has been
    /// requested and the acknowledged edit must be rebased past it.
    Stale { acknowledged: E, resync_target: usize },
    /// Same as `Stale`, with local edits buffered meanwhile.
    StaleWithBuffer {
        acknowledged: E,
        buffer: E,
        resync_target: usize,
    },
}

impl<E> ClientState<E> {
    pub fn name(&self) -> &'static str {
        match self {
            ClientState::Synchronized => "Synchronized",
            ClientState::AwaitingConfirm { .. } => "AwaitingConfirm",
            ClientState::AwaitingWithBuffer { .. } => "AwaitingWithBuffer",
            ClientState::Stale { .. } => "Stale",
            ClientState::StaleWithBuffer { .. } => "StaleWithBuffer",
        }
    }
}

/// The client half of the revision protocol.
#[derive(Clone, Debug)]
pub struct Client<E = Operation> {
    /// Number of server operations incorporated so far.
    revision: usize,
    state: ClientState<E>,
}

impl<E: Edit> Client<E> {
    pub fn new(revision: usize) -> Self {
        Self {
            revision,
            state: ClientState::Synchronized,
        }
    }

    pub fn revision(&self) -> usize {
        self.revision
    }

    pub fn state(&self) -> &ClientState<E> {
        &self.state
    }

    pub fn is_synchronized(&self) -> bool {
        matches!(self.state, ClientState::Synchronized)
    }

    /// The edit currently waiting for acknowledgement, if any.
    pub fn outstanding(&self) -> Option<&E> {
        match &self.state {
            ClientState::AwaitingConfirm { outstanding }
            | ClientState::AwaitingWithBuffer { outstanding, .. } => Some(outstanding),
            ClientState::Stale { acknowledged, .. }
            | ClientState::StaleWithBuffer { acknowledged, .. } => Some(acknowledged),
            ClientState::Synchronized => None,
        }
    }

    /// Local edits not yet sent.
    pub fn buffer(&self) -> Option<&E> {
        match &self.state {
            ClientState::AwaitingWithBuffer { buffer, .. }
            | ClientState::StaleWithBuffer { buffer, .. } => Some(buffer),
            _ => None,
        }
    }

    pub fn has_buffer(&self) -> bool {
        self.buffer().is_some()
    }

    fn set_state(&mut self, state: ClientState<E>) {
        if self.state.name() != state.name() {
            debug!(from = self.state.name(), to = state.name(), revision = self.revision, "Client state change");
        }
        self.state = state;
    }

    fn check_revision(&self, received: usize) -> Result<()> {
        if received > self.revision + 1 {
            return Err(ClientError::InvalidRevision {
                expected: self.revision + 1,
                received,
            });
        }
        Ok(())
    }

    /// The user changed the document.
    pub fn apply_client<S: ClientSink<E>>(&mut self, operation: E, sink: &mut S) -> Result<()> {
        let next = match &self.state {
            ClientState::Synchronized => {
                sink.send_operation(self.revision, &operation);
                ClientState::AwaitingConfirm {
                    outstanding: operation,
                }
            }
            ClientState::AwaitingConfirm { outstanding } => ClientState::AwaitingWithBuffer {
                outstanding: outstanding.clone(),
                buffer: operation,
            },
            ClientState::AwaitingWithBuffer {
                outstanding,
                buffer,
            } => ClientState::AwaitingWithBuffer {
                outstanding: outstanding.clone(),
                buffer: buffer.compose(&operation)?,
            },
            ClientState::Stale {
                acknowledged,
                resync_target,
            } => ClientState::StaleWithBuffer {
                acknowledged: acknowledged.clone(),
                buffer: operation,
                resync_target: *resync_target,
            },
            ClientState::StaleWithBuffer {
                acknowledged,
                buffer,
                resync_target,
            } => ClientState::StaleWithBuffer {
                acknowledged: acknowledged.clone(),
                buffer: buffer.compose(&operation)?,
                resync_target: *resync_target,
            },
        };
        self.set_state(next);
        Ok(())
    }

    /// Another client's edit arrived from the server at `revision`.
    pub fn apply_server<S: ClientSink<E>>(
        &mut self,
        revision: usize,
        operation: &Operation,
        sink: &mut S,
    ) -> Result<()> {
        let next = match &self.state {
            ClientState::Synchronized => {
                self.check_revision(revision)?;
                sink.apply_operation(operation)?;
                ClientState::Synchronized
            }
            ClientState::AwaitingConfirm { outstanding } => {
                self.check_revision(revision)?;
                let (outstanding, applicable) = outstanding.transform_with(operation)?;
                sink.apply_operation(&applicable)?;
                ClientState::AwaitingConfirm { outstanding }
            }
            ClientState::AwaitingWithBuffer {
                outstanding,
                buffer,
            } => {
                self.check_revision(revision)?;
                let (outstanding, past_outstanding) = outstanding.transform_with(operation)?;
                let (buffer, applicable) = buffer.transform_with(&past_outstanding)?;
                sink.apply_operation(&applicable)?;
                ClientState::AwaitingWithBuffer {
                    outstanding,
                    buffer,
                }
            }
            ClientState::Stale { .. } | ClientState::StaleWithBuffer { .. } => {
                return Err(ClientError::ResyncInProgress);
            }
        };
        self.revision = revision;
        self.set_state(next);
        Ok(())
    }

    /// The server acknowledged the outstanding edit at `revision`.
    pub fn server_ack<S: ClientSink<E>>(&mut self, revision: usize, sink: &mut S) -> Result<()> {
        let skipped = revision > self.revision + 1;
        let next = match &self.state {
            ClientState::AwaitingConfirm { outstanding } if skipped => ClientState::Stale {
                acknowledged: outstanding.clone(),
                resync_target: revision,
            },
            ClientState::AwaitingWithBuffer {
                outstanding,
                buffer,
            } if skipped => ClientState::StaleWithBuffer {
                acknowledged: outstanding.clone(),
                buffer: buffer.clone(),
                resync_target: revision,
            },
            ClientState::AwaitingConfirm { .. } => {
                self.revision = revision;
                ClientState::Synchronized
            }
            ClientState::AwaitingWithBuffer { buffer, .. } => {
                self.revision = revision;
                sink.send_operation(self.revision, buffer);
                ClientState::AwaitingConfirm {
                    outstanding: buffer.clone(),
                }
            }
            ClientState::Synchronized
            | ClientState::Stale { .. }
            | ClientState::StaleWithBuffer { .. } => {
                return Err(ClientError::NoPendingOperation);
            }
        };
        if skipped {
            // The acknowledged edit sits at `revision - 1`; everything before
            // it that we have not seen must be fetched.
            debug!(base = self.revision, head = revision - 1, "Requesting missed operations");
            sink.get_operations(self.revision, revision - 1);
        }
        self.set_state(next);
        Ok(())
    }

    /// Missed history arrived after a stale acknowledgement. `operations` are
    /// the server operations from this client's revision up to, but not
    /// including, the acknowledged edit.
    pub fn apply_operations<S: ClientSink<E>>(
        &mut self,
        head: usize,
        operations: &[Operation],
        sink: &mut S,
    ) -> Result<()> {
        let (mut acknowledged, mut buffer, resync_target) = match &self.state {
            ClientState::Stale {
                acknowledged,
                resync_target,
            } => (acknowledged.clone(), None, *resync_target),
            ClientState::StaleWithBuffer {
                acknowledged,
                buffer,
                resync_target,
            } => (acknowledged.clone(), Some(buffer.clone()), *resync_target),
            _ => return Err(ClientError::NotStale),
        };
        if head + 1 != resync_target {
            warn!(head, resync_target, "Missed operations end at an unexpected revision");
        }

        // Rebase the whole batch before touching the document, so a bad
        // history leaves the client stale and retryable.
        let mut applicable = Vec::with_capacity(operations.len());
        for operation in operations {
            let (rebased, past_acknowledged) = acknowledged.transform_with(operation)?;
            acknowledged = rebased;
            applicable.push(match buffer.take() {
                Some(pending) => {
                    let (rebased, past_buffer) = pending.transform_with(&past_acknowledged)?;
                    buffer = Some(rebased);
                    past_buffer
                }
                None => past_acknowledged,
            });
        }
        for operation in &applicable {
            sink.apply_operation(operation)?;
        }

        self.revision = resync_target;
        let next = match buffer {
            Some(buffer) => {
                sink.send_operation(self.revision, &buffer);
                ClientState::AwaitingConfirm {
                    outstanding: buffer,
                }
            }
            None => ClientState::Synchronized,
        };
        self.set_state(next);
        Ok(())
    }

    /// The connection came back; resend whatever is still unacknowledged.
    pub fn server_reconnect<S: ClientSink<E>>(&mut self, sink: &mut S) {
        match &self.state {
            ClientState::AwaitingConfirm { outstanding }
            | ClientState::AwaitingWithBuffer { outstanding, .. } => {
                debug!(revision = self.revision, "Resending outstanding operation");
                sink.send_operation(self.revision, outstanding);
            }
            _ => {}
        }
    }

    /// Map a selection reported by the server into local coordinates, which
    /// may be ahead of the server by the outstanding edit and the buffer.
    pub fn transform_selection(&self, selection: &Selection) -> Selection {
        match &self.state {
            ClientState::AwaitingConfirm { outstanding } => {
                selection.transform(outstanding.operation())
            }
            ClientState::AwaitingWithBuffer {
                outstanding,
                buffer,
            } => selection
                .transform(outstanding.operation())
                .transform(buffer.operation()),
            _ => selection.clone(),
        }
    }
}
