//! Metadata carried alongside an operation.
//!
//! A metadata type opts into custom behaviour by overriding the trait's
//! default methods; the defaults leave the metadata unchanged on invert and
//! transform and let the later edit's metadata win on compose.

use crate::operation::Operation;
use crate::selection::Selection;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Debug;

pub trait Meta: Clone + Debug {
    /// Metadata for the inverse of the edit, given the pre-edit document.
    fn invert(&self, _doc: &str) -> Self {
        self.clone()
    }

    /// Metadata for this edit followed by an edit carrying `other`.
    fn compose(&self, other: &Self) -> Self {
        other.clone()
    }

    /// Metadata after the edit is rebased past a concurrent `op`.
    fn transform(&self, _op: &Operation) -> Self {
        self.clone()
    }
}

impl Meta for () {}

impl Meta for Selection {
    fn compose(&self, other: &Self) -> Self {
        Selection::compose(self, other)
    }

    fn transform(&self, op: &Operation) -> Self {
        Selection::transform(self, op)
    }
}

impl<M: Meta> Meta for Option<M> {
    fn invert(&self, doc: &str) -> Self {
        self.as_ref().map(|meta| meta.invert(doc))
    }

    fn compose(&self, other: &Self) -> Self {
        match (self, other) {
            (Some(a), Some(b)) => Some(a.compose(b)),
            _ => other.clone(),
        }
    }

    fn transform(&self, op: &Operation) -> Self {
        self.as_ref().map(|meta| meta.transform(op))
    }
}

/// Free-form key/value metadata. Composing merges both maps, with the later
/// edit's values replacing earlier ones.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetaMap(pub BTreeMap<String, serde_json::Value>);

impl MetaMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }
}

impl Meta for MetaMap {
    fn compose(&self, other: &Self) -> Self {
        let mut merged = self.0.clone();
        merged.extend(other.0.iter().map(|(k, v)| (k.clone(), v.clone())));
        MetaMap(merged)
    }
}
