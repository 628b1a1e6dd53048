//! Undo/Redo for collaborative editing.
//!
//! Entries are the *inverses* of local edits. When a remote edit lands, every
//! entry is transformed past it so that undoing later still applies to the
//! current document and only reverts the local user's own change.

use crate::error::{ClientError, Result};
use quire_core::{Edit, Operation};
use std::collections::VecDeque;
use tracing::debug;

/// Default number of entries kept on each stack.
pub const DEFAULT_MAX_ITEMS: usize = 50;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum UndoState {
    Normal,
    Undoing,
    Redoing,
}

/// Bounded undo and redo stacks of invertible edits.
#[derive(Clone, Debug)]
pub struct UndoManager<E> {
    max_items: usize,
    state: UndoState,
    /// Set after an undo or redo so the next local edit starts a new entry.
    dont_compose: bool,
    undo_stack: VecDeque<E>,
    redo_stack: VecDeque<E>,
}

impl<E: Edit> UndoManager<E> {
    pub fn new(max_items: usize) -> Self {
        Self {
            max_items,
            state: UndoState::Normal,
            dont_compose: false,
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
        }
    }

    fn push_bounded(stack: &mut VecDeque<E>, entry: E, max_items: usize) {
        stack.push_back(entry);
        while stack.len() > max_items {
            stack.pop_front();
        }
    }

    /// Record the inverse of an edit.
    ///
    /// While an undo is in progress the entry goes to the redo stack, and
    /// while a redo is in progress it goes to the undo stack. Otherwise it is
    /// pushed onto the undo stack, or composed into the top entry when
    /// `compose` is set, and the redo stack is cleared.
    pub fn add(&mut self, operation: E, compose: bool) -> Result<()> {
        match self.state {
            UndoState::Undoing => {
                Self::push_bounded(&mut self.redo_stack, operation, self.max_items);
                self.dont_compose = true;
            }
            UndoState::Redoing => {
                Self::push_bounded(&mut self.undo_stack, operation, self.max_items);
                self.dont_compose = true;
            }
            UndoState::Normal => {
                let top = if compose && !self.dont_compose {
                    self.undo_stack.pop_back()
                } else {
                    None
                };
                let entry = match top {
                    Some(top) => match operation.compose(&top) {
                        Ok(merged) => merged,
                        Err(err) => {
                            self.undo_stack.push_back(top);
                            return Err(err.into());
                        }
                    },
                    None => operation,
                };
                Self::push_bounded(&mut self.undo_stack, entry, self.max_items);
                self.dont_compose = false;
                self.redo_stack.clear();
            }
        }
        Ok(())
    }

    /// Rebase every stored entry past a remote edit that was just applied.
    /// Entries that no longer change anything are dropped.
    pub fn transform(&mut self, operation: &Operation) -> Result<()> {
        let undo_stack = Self::transform_stack(&self.undo_stack, operation)?;
        let redo_stack = Self::transform_stack(&self.redo_stack, operation)?;
        let dropped = self.undo_stack.len() + self.redo_stack.len() - undo_stack.len() - redo_stack.len();
        if dropped > 0 {
            debug!(dropped, "Dropped undo entries made empty by a remote edit");
        }
        self.undo_stack = undo_stack;
        self.redo_stack = redo_stack;
        Ok(())
    }

    /// The top entry sits on the current document. Walking down, each entry
    /// is transformed against the remote edit as rebased past the entries
    /// above it.
    fn transform_stack(stack: &VecDeque<E>, operation: &Operation) -> Result<VecDeque<E>> {
        let mut remote = operation.clone();
        let mut transformed = VecDeque::with_capacity(stack.len());
        for entry in stack.iter().rev() {
            let (entry, rest) = entry.transform_with(&remote)?;
            if !entry.is_noop() {
                transformed.push_front(entry);
            }
            remote = rest;
        }
        Ok(transformed)
    }

    /// Pop the top undo entry and hand it to `apply`, which must apply it to
    /// the document and return its inverse. The inverse becomes a redo entry.
    pub fn perform_undo<F>(&mut self, apply: F) -> Result<()>
    where
        F: FnOnce(&E) -> Result<E>,
    {
        let entry = self.undo_stack.pop_back().ok_or(ClientError::NothingToUndo)?;
        self.state = UndoState::Undoing;
        let result = apply(&entry).and_then(|inverse| self.add(inverse, false));
        self.state = UndoState::Normal;
        if result.is_err() {
            self.undo_stack.push_back(entry);
        }
        result
    }

    /// Mirror of [`perform_undo`](Self::perform_undo) for the redo stack.
    pub fn perform_redo<F>(&mut self, apply: F) -> Result<()>
    where
        F: FnOnce(&E) -> Result<E>,
    {
        let entry = self.redo_stack.pop_back().ok_or(ClientError::NothingToRedo)?;
        self.state = UndoState::Redoing;
        let result = apply(&entry).and_then(|inverse| self.add(inverse, false));
        self.state = UndoState::Normal;
        if result.is_err() {
            self.redo_stack.push_back(entry);
        }
        result
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn is_undoing(&self) -> bool {
        self.state == UndoState::Undoing
    }

    pub fn is_redoing(&self) -> bool {
        self.state == UndoState::Redoing
    }

    /// The entry the next undo would apply.
    pub fn last_undo(&self) -> Option<&E> {
        self.undo_stack.back()
    }

    pub fn last_redo(&self) -> Option<&E> {
        self.redo_stack.back()
    }

    pub fn undo_stack_size(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_stack_size(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn max_items(&self) -> usize {
        self.max_items
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.dont_compose = false;
    }
}

impl<E: Edit> Default for UndoManager<E> {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ITEMS)
    }
}
