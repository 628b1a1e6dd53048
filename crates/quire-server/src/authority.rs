//! The server authority: the single ordered history of a document.
//!
//! Every accepted edit is rebased past the history its author had not seen,
//! applied, and appended. The history order is the canonical order of all
//! edits. Callers must serialize access per document.

use crate::error::{Result, ServerError};
use quire_core::Edit;
use tracing::{debug, warn};

#[derive(Clone, Debug)]
pub struct ServerAuthority<E> {
    document: String,
    history: Vec<E>,
    /// Edits that would grow the document past this many characters are dropped.
    max_length: Option<usize>,
}

impl<E: Edit> ServerAuthority<E> {
    pub fn new(document: impl Into<String>) -> Self {
        Self::with_history(document, Vec::new())
    }

    /// Resume from a document and the history that produced it.
    pub fn with_history(document: impl Into<String>, history: Vec<E>) -> Self {
        Self {
            document: document.into(),
            history,
            max_length: None,
        }
    }

    pub fn set_document_max_length(&mut self, max_length: Option<usize>) {
        self.max_length = max_length;
    }

    pub fn max_length(&self) -> Option<usize> {
        self.max_length
    }

    pub fn document(&self) -> &str {
        &self.document
    }

    pub fn history(&self) -> &[E] {
        &self.history
    }

    /// Number of accepted edits.
    pub fn revision(&self) -> usize {
        self.history.len()
    }

    /// History entries `[base, head)`, clamped to what exists.
    pub fn operations(&self, base: usize, head: usize) -> &[E] {
        let head = head.min(self.history.len());
        let base = base.min(head);
        &self.history[base..head]
    }

    /// Accept an edit made against `revision`.
    ///
    /// Returns the rebased edit now at the end of the history, or `None` when
    /// the edit was dropped for growing the document past the length limit.
    pub fn receive_operation(&mut self, revision: usize, operation: E) -> Result<Option<E>> {
        if revision > self.history.len() {
            warn!(revision, history = self.history.len(), "Operation revision not in history");
            return Err(ServerError::RevisionOutOfRange {
                revision,
                history: self.history.len(),
            });
        }

        let mut operation = operation;
        for concurrent in &self.history[revision..] {
            operation = E::transform(&operation, concurrent)?.0;
        }

        let document = operation.apply(&self.document)?;
        if let Some(max_length) = self.max_length {
            let new_length = document.chars().count();
            if new_length > max_length && new_length > self.document.chars().count() {
                debug!(new_length, max_length, "Dropping operation over document length limit");
                return Ok(None);
            }
        }

        self.document = document;
        self.history.push(operation.clone());
        Ok(Some(operation))
    }
}
