//! The `Edit` trait: what the client protocol, undo manager and server
//! authority need from an edit, whether it is a bare [`Operation`] or one
//! carrying metadata.

use crate::error::Result;
use crate::operation::Operation;
use std::fmt::Debug;

pub trait Edit: Clone + Debug {
    /// The text operation carried by this edit.
    fn operation(&self) -> &Operation;

    fn apply(&self, doc: &str) -> Result<String> {
        self.operation().apply(doc)
    }

    fn invert(&self, doc: &str) -> Result<Self>;

    fn compose(&self, other: &Self) -> Result<Self>;

    /// Transform two concurrent edits; see [`Operation::transform`].
    fn transform(a: &Self, b: &Self) -> Result<(Self, Self)>;

    /// Transform against a concurrent bare operation, returning this edit
    /// rebased past `other` and `other` rebased past this edit.
    fn transform_with(&self, other: &Operation) -> Result<(Self, Operation)>;

    fn is_noop(&self) -> bool {
        self.operation().is_noop()
    }
}

/// Transform `a` against `b` with `a` winning insert ties.
pub fn transform<E: Edit>(a: &E, b: &E) -> Result<(E, E)> {
    E::transform(a, b)
}

impl Edit for Operation {
    fn operation(&self) -> &Operation {
        self
    }

    fn invert(&self, doc: &str) -> Result<Self> {
        Operation::invert(self, doc)
    }

    fn compose(&self, other: &Self) -> Result<Self> {
        Operation::compose(self, other)
    }

    fn transform(a: &Self, b: &Self) -> Result<(Self, Self)> {
        Operation::transform(a, b)
    }

    fn transform_with(&self, other: &Operation) -> Result<(Self, Operation)> {
        Operation::transform(self, other)
    }
}
