//! Selection snapshots attached to local edits, used to restore the caret
//! on undo and redo.

use quire_core::{Meta, Operation, Selection};

/// The selection before and after a local edit.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SelfMeta {
    pub selection_before: Option<Selection>,
    pub selection_after: Option<Selection>,
}

impl SelfMeta {
    pub fn new(selection_before: Option<Selection>, selection_after: Option<Selection>) -> Self {
        Self {
            selection_before,
            selection_after,
        }
    }
}

impl Meta for SelfMeta {
    fn invert(&self, _doc: &str) -> Self {
        Self::new(self.selection_after.clone(), self.selection_before.clone())
    }

    fn compose(&self, other: &Self) -> Self {
        Self::new(self.selection_before.clone(), other.selection_after.clone())
    }

    fn transform(&self, op: &Operation) -> Self {
        Self::new(
            self.selection_before.as_ref().map(|s| s.transform(op)),
            self.selection_after.as_ref().map(|s| s.transform(op)),
        )
    }
}
