//! Cursor and selection ranges, kept in step with the document by
//! transforming them through the same operations as the text.

use crate::error::Result;
use crate::operation::{char_len, Operation, Primitive};
use serde::{Deserialize, Serialize};

/// A single range. `anchor` stays put while `head` follows the caret.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub anchor: usize,
    pub head: usize,
}

impl Range {
    pub fn new(anchor: usize, head: usize) -> Self {
        Self { anchor, head }
    }

    /// A zero-width range at `position`.
    pub fn cursor(position: usize) -> Self {
        Self::new(position, position)
    }

    pub fn is_empty(&self) -> bool {
        self.anchor == self.head
    }

    pub fn start(&self) -> usize {
        self.anchor.min(self.head)
    }

    pub fn end(&self) -> usize {
        self.anchor.max(self.head)
    }

    /// Map both ends through `op`.
    pub fn transform(&self, op: &Operation) -> Range {
        let anchor = transform_index(self.anchor, op);
        if self.is_empty() {
            return Range::cursor(anchor);
        }
        Range::new(anchor, transform_index(self.head, op))
    }
}

/// Where `index` ends up after `op` is applied. A position at an insert
/// point moves past the inserted text; a position inside a deleted span
/// collapses to the start of the span.
fn transform_index(index: usize, op: &Operation) -> usize {
    let mut new_index = index;
    let mut remaining = index;
    for primitive in op.ops() {
        match primitive {
            Primitive::Retain(n) => {
                if *n > remaining {
                    break;
                }
                remaining -= n;
            }
            Primitive::Insert(text) => new_index += char_len(text),
            Primitive::Delete(n) => {
                new_index = new_index.saturating_sub(remaining.min(*n));
                if *n > remaining {
                    break;
                }
                remaining -= n;
            }
        }
    }
    new_index
}

/// A set of ranges, usually one per caret.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selection {
    pub ranges: Vec<Range>,
}

impl Selection {
    pub fn new(ranges: Vec<Range>) -> Self {
        Self { ranges }
    }

    /// A selection holding a single empty range at `position`.
    pub fn create_cursor(position: usize) -> Self {
        Self::new(vec![Range::cursor(position)])
    }

    /// True if any range covers at least one character.
    pub fn something_selected(&self) -> bool {
        self.ranges.iter().any(|range| !range.is_empty())
    }

    /// Selections do not accumulate: the later one replaces the earlier.
    pub fn compose(&self, other: &Selection) -> Selection {
        other.clone()
    }

    pub fn transform(&self, op: &Operation) -> Selection {
        Selection::new(self.ranges.iter().map(|range| range.transform(op)).collect())
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({ "ranges": self.ranges })
    }

    pub fn from_json(value: &serde_json::Value) -> Result<Selection> {
        Ok(Selection::deserialize(value)?)
    }
}
