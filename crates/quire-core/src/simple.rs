//! Single-edit view of an operation: one insert or one delete at an
//! absolute position.
//!
//! Useful for editor bindings that consume edits one at a time rather than
//! walking a full retain/insert/delete sequence.

use crate::error::{OtError, Result};
use crate::operation::{char_len, split_at_char, Operation, Primitive};
use std::cmp::Ordering;
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SimpleOperation {
    Insert { text: String, position: usize },
    Delete { count: usize, position: usize },
    Noop,
}

use SimpleOperation::{Delete, Insert, Noop};

impl SimpleOperation {
    pub fn insert(text: impl Into<String>, position: usize) -> Self {
        Insert {
            text: text.into(),
            position,
        }
    }

    pub fn delete(count: usize, position: usize) -> Self {
        Delete { count, position }
    }

    pub fn apply(&self, doc: &str) -> Result<String> {
        let len = char_len(doc);
        match self {
            Insert { text, position } => {
                if *position > len {
                    return Err(OtError::LengthMismatch {
                        expected: *position,
                        actual: len,
                    });
                }
                let (head, tail) = split_at_char(doc, *position);
                Ok(format!("{}{}{}", head, text, tail))
            }
            Delete { count, position } => {
                if position + count > len {
                    return Err(OtError::LengthMismatch {
                        expected: position + count,
                        actual: len,
                    });
                }
                let (head, rest) = split_at_char(doc, *position);
                Ok(format!("{}{}", head, split_at_char(rest, *count).1))
            }
            Noop => Ok(doc.to_string()),
        }
    }

    /// Transform two concurrent edits so that `a'` applies after `b` and `b'`
    /// after `a`, both ending in the same document.
    ///
    /// Concurrent inserts at one position are ordered by their text; identical
    /// inserts collapse into one. An insert inside a concurrently deleted span
    /// is deleted along with it.
    pub fn transform(a: &Self, b: &Self) -> (Self, Self) {
        match (a, b) {
            (Noop, _) | (_, Noop) => (a.clone(), b.clone()),

            (
                Insert {
                    text: ta,
                    position: pa,
                },
                Insert {
                    text: tb,
                    position: pb,
                },
            ) => match pa.cmp(pb).then_with(|| ta.cmp(tb)) {
                Ordering::Less => (a.clone(), Self::insert(tb.clone(), pb + char_len(ta))),
                Ordering::Greater => (Self::insert(ta.clone(), pa + char_len(tb)), b.clone()),
                Ordering::Equal => (Noop, Noop),
            },

            (Insert { text, position: pa }, Delete { count, position: pb }) => {
                if pa <= pb {
                    (a.clone(), Self::delete(*count, pb + char_len(text)))
                } else if *pa >= pb + count {
                    (Self::insert(text.clone(), pa - count), b.clone())
                } else {
                    (Noop, Self::delete(count + char_len(text), *pb))
                }
            }

            (Delete { count, position: pa }, Insert { text, position: pb }) => {
                if pa >= pb {
                    (Self::delete(*count, pa + char_len(text)), b.clone())
                } else if pa + count <= *pb {
                    (a.clone(), Self::insert(text.clone(), pb - count))
                } else {
                    (Self::delete(count + char_len(text), *pa), Noop)
                }
            }

            (
                Delete {
                    count: ca,
                    position: pa,
                },
                Delete {
                    count: cb,
                    position: pb,
                },
            ) => {
                let (ca, pa, cb, pb) = (*ca, *pa, *cb, *pb);
                match pa.cmp(&pb) {
                    Ordering::Equal => match ca.cmp(&cb) {
                        Ordering::Equal => (Noop, Noop),
                        Ordering::Less => (Noop, Self::delete(cb - ca, pb)),
                        Ordering::Greater => (Self::delete(ca - cb, pa), Noop),
                    },
                    Ordering::Less => {
                        if pa + ca <= pb {
                            (a.clone(), Self::delete(cb, pb - ca))
                        } else if pa + ca >= pb + cb {
                            (Self::delete(ca - cb, pa), Noop)
                        } else {
                            (
                                Self::delete(pb - pa, pa),
                                Self::delete(pb + cb - (pa + ca), pa),
                            )
                        }
                    }
                    Ordering::Greater => {
                        if pa >= pb + cb {
                            (Self::delete(ca, pa - cb), b.clone())
                        } else if pa + ca <= pb + cb {
                            (Noop, Self::delete(cb - ca, pb))
                        } else {
                            (
                                Self::delete(pa + ca - (pb + cb), pb),
                                Self::delete(pa - pb, pb),
                            )
                        }
                    }
                }
            }
        }
    }

    /// Split an operation into simple edits that, applied in order, have the
    /// same effect as the operation.
    pub fn from_operation(operation: &Operation) -> Vec<SimpleOperation> {
        let mut simple = Vec::new();
        let mut index = 0;
        for op in operation.ops() {
            match op {
                Primitive::Retain(n) => index += n,
                Primitive::Insert(text) => {
                    simple.push(Self::insert(text.clone(), index));
                    index += char_len(text);
                }
                Primitive::Delete(n) => simple.push(Self::delete(*n, index)),
            }
        }
        simple
    }
}

impl fmt::Display for SimpleOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Insert { text, position } => write!(f, "Insert({:?}, {})", text, position),
            Delete { count, position } => write!(f, "Delete({}, {})", count, position),
            Noop => write!(f, "Noop()"),
        }
    }
}
