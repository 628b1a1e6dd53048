//! Text Operation - retain/insert/delete edits over a character sequence.
//!
//! An operation walks a document from left to right:
//! - `Retain(n)` copies the next `n` characters
//! - `Insert(s)` emits `s`
//! - `Delete(n)` skips the next `n` characters
//!
//! Lengths are counted in Unicode scalar values, so an operation built against
//! a document's `chars()` applies cleanly regardless of UTF-8 byte widths.
//!
//! # Wire format
//!
//! ```text
//! [3, "abc", -2, 4]   // retain 3, insert "abc", delete 2, retain 4
//! ```

use crate::error::{OtError, Result};
use serde::de::{self, Deserializer};
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single step of an [`Operation`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Primitive {
    /// Keep the next `n` characters.
    Retain(usize),
    /// Insert the given text at the current position.
    Insert(String),
    /// Remove the next `n` characters.
    Delete(usize),
}

impl Primitive {
    pub fn is_retain(&self) -> bool {
        matches!(self, Primitive::Retain(_))
    }

    pub fn is_insert(&self) -> bool {
        matches!(self, Primitive::Insert(_))
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, Primitive::Delete(_))
    }
}

pub(crate) fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Split `text` after `n` characters.
pub(crate) fn split_at_char(text: &str, n: usize) -> (&str, &str) {
    match text.char_indices().nth(n) {
        Some((idx, _)) => text.split_at(idx),
        None => (text, ""),
    }
}

/// What remains of a retain/delete after `used` of its `count` characters
/// were consumed, or the next primitive once it is exhausted.
fn remainder<I>(count: usize, used: usize, kind: fn(usize) -> Primitive, rest: &mut I) -> Option<Primitive>
where
    I: Iterator<Item = Primitive>,
{
    if count > used {
        Some(kind(count - used))
    } else {
        rest.next()
    }
}

/// A sequence of primitives transforming one document into another.
///
/// Adjacent primitives of the same kind are always merged and zero-length
/// primitives are never stored, so two operations with the same effect compare
/// equal.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Operation {
    ops: Vec<Primitive>,
    /// Length of the document this operation applies to.
    base_len: usize,
    /// Length of the document this operation produces.
    target_len: usize,
}

impl Operation {
    /// Create an empty operation (applies to the empty document).
    pub fn new() -> Self {
        Self::default()
    }

    /// The primitives of this operation.
    pub fn ops(&self) -> &[Primitive] {
        &self.ops
    }

    /// Required input length.
    pub fn base_len(&self) -> usize {
        self.base_len
    }

    /// Produced output length.
    pub fn target_len(&self) -> usize {
        self.target_len
    }

    /// Builder form of [`push_retain`](Self::push_retain).
    pub fn retain(mut self, n: usize) -> Self {
        self.push_retain(n);
        self
    }

    /// Builder form of [`push_insert`](Self::push_insert).
    pub fn insert(mut self, text: impl AsRef<str>) -> Self {
        self.push_insert(text.as_ref());
        self
    }

    /// Builder form of [`push_delete`](Self::push_delete).
    pub fn delete(mut self, n: usize) -> Self {
        self.push_delete(n);
        self
    }

    /// Skip over `n` characters.
    pub fn push_retain(&mut self, n: usize) {
        if n == 0 {
            return;
        }
        self.base_len += n;
        self.target_len += n;
        if let Some(Primitive::Retain(last)) = self.ops.last_mut() {
            *last += n;
        } else {
            self.ops.push(Primitive::Retain(n));
        }
    }

    /// Insert `text` at the current position.
    ///
    /// An insert directly after a delete is stored in front of it, so
    /// "delete then insert" and "insert then delete" share one representation.
    pub fn push_insert(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.target_len += char_len(text);
        match self.ops.as_mut_slice() {
            [.., Primitive::Insert(last)] => {
                last.push_str(text);
                return;
            }
            [.., Primitive::Insert(previous), Primitive::Delete(_)] => {
                previous.push_str(text);
                return;
            }
            _ => {}
        }
        if matches!(self.ops.last(), Some(Primitive::Delete(_))) {
            let at = self.ops.len() - 1;
            self.ops.insert(at, Primitive::Insert(text.to_string()));
        } else {
            self.ops.push(Primitive::Insert(text.to_string()));
        }
    }

    /// Delete the next `n` characters.
    pub fn push_delete(&mut self, n: usize) {
        if n == 0 {
            return;
        }
        self.base_len += n;
        if let Some(Primitive::Delete(last)) = self.ops.last_mut() {
            *last += n;
        } else {
            self.ops.push(Primitive::Delete(n));
        }
    }

    /// True when the operation leaves every document unchanged.
    pub fn is_noop(&self) -> bool {
        self.ops.iter().all(Primitive::is_retain)
    }

    fn check_input(&self, doc: &str) -> Result<()> {
        let actual = char_len(doc);
        if actual != self.base_len {
            return Err(OtError::LengthMismatch {
                expected: self.base_len,
                actual,
            });
        }
        Ok(())
    }

    /// Apply this operation to `doc`.
    pub fn apply(&self, doc: &str) -> Result<String> {
        self.check_input(doc)?;
        let mut result = String::with_capacity(doc.len());
        let mut rest = doc;
        for op in &self.ops {
            match op {
                Primitive::Retain(n) => {
                    let (kept, tail) = split_at_char(rest, *n);
                    result.push_str(kept);
                    rest = tail;
                }
                Primitive::Insert(text) => result.push_str(text),
                Primitive::Delete(n) => rest = split_at_char(rest, *n).1,
            }
        }
        Ok(result)
    }

    /// Build the operation that reverts this one. `doc` must be the document
    /// *before* this operation was applied; deleted text is recovered from it.
    pub fn invert(&self, doc: &str) -> Result<Operation> {
        self.check_input(doc)?;
        let mut inverse = Operation::new();
        let mut rest = doc;
        for op in &self.ops {
            match op {
                Primitive::Retain(n) => {
                    inverse.push_retain(*n);
                    rest = split_at_char(rest, *n).1;
                }
                Primitive::Insert(text) => inverse.push_delete(char_len(text)),
                Primitive::Delete(n) => {
                    let (deleted, tail) = split_at_char(rest, *n);
                    inverse.push_insert(deleted);
                    rest = tail;
                }
            }
        }
        Ok(inverse)
    }

    /// Combine `self` followed by `other` into a single operation.
    pub fn compose(&self, other: &Operation) -> Result<Operation> {
        let mismatch = OtError::LengthMismatch {
            expected: self.target_len,
            actual: other.base_len,
        };
        if self.target_len != other.base_len {
            return Err(mismatch);
        }

        let mut composed = Operation::new();
        let mut ops1 = self.ops.iter().cloned();
        let mut ops2 = other.ops.iter().cloned();
        let mut op1 = ops1.next();
        let mut op2 = ops2.next();

        loop {
            match (op1.take(), op2.take()) {
                (None, None) => break,
                (Some(Primitive::Delete(n)), pending) => {
                    composed.push_delete(n);
                    op1 = ops1.next();
                    op2 = pending;
                }
                (pending, Some(Primitive::Insert(text))) => {
                    composed.push_insert(&text);
                    op1 = pending;
                    op2 = ops2.next();
                }
                (None, Some(_)) | (Some(_), None) => return Err(mismatch),
                (Some(Primitive::Retain(a)), Some(Primitive::Retain(b))) => {
                    let n = a.min(b);
                    composed.push_retain(n);
                    op1 = remainder(a, n, Primitive::Retain, &mut ops1);
                    op2 = remainder(b, n, Primitive::Retain, &mut ops2);
                }
                (Some(Primitive::Insert(text)), Some(Primitive::Delete(b))) => {
                    let len = char_len(&text);
                    let n = len.min(b);
                    op1 = if len > n {
                        Some(Primitive::Insert(split_at_char(&text, n).1.to_string()))
                    } else {
                        ops1.next()
                    };
                    op2 = remainder(b, n, Primitive::Delete, &mut ops2);
                }
                (Some(Primitive::Insert(text)), Some(Primitive::Retain(b))) => {
                    let len = char_len(&text);
                    let n = len.min(b);
                    let (head, tail) = split_at_char(&text, n);
                    composed.push_insert(head);
                    op1 = if len > n {
                        Some(Primitive::Insert(tail.to_string()))
                    } else {
                        ops1.next()
                    };
                    op2 = remainder(b, n, Primitive::Retain, &mut ops2);
                }
                (Some(Primitive::Retain(a)), Some(Primitive::Delete(b))) => {
                    let n = a.min(b);
                    composed.push_delete(n);
                    op1 = remainder(a, n, Primitive::Retain, &mut ops1);
                    op2 = remainder(b, n, Primitive::Delete, &mut ops2);
                }
            }
        }

        Ok(composed)
    }

    /// Transform two concurrent operations against each other.
    ///
    /// Returns `(a', b')` such that `a.compose(b') == b.compose(a')`. When both
    /// sides insert at the same position, `a`'s text ends up first.
    pub fn transform(a: &Operation, b: &Operation) -> Result<(Operation, Operation)> {
        let mismatch = OtError::LengthMismatch {
            expected: a.base_len,
            actual: b.base_len,
        };
        if a.base_len != b.base_len {
            return Err(mismatch);
        }

        let mut a_prime = Operation::new();
        let mut b_prime = Operation::new();
        let mut ops1 = a.ops.iter().cloned();
        let mut ops2 = b.ops.iter().cloned();
        let mut op1 = ops1.next();
        let mut op2 = ops2.next();

        loop {
            match (op1.take(), op2.take()) {
                (None, None) => break,
                (Some(Primitive::Insert(text)), pending) => {
                    a_prime.push_insert(&text);
                    b_prime.push_retain(char_len(&text));
                    op1 = ops1.next();
                    op2 = pending;
                }
                (pending, Some(Primitive::Insert(text))) => {
                    a_prime.push_retain(char_len(&text));
                    b_prime.push_insert(&text);
                    op1 = pending;
                    op2 = ops2.next();
                }
                (None, Some(_)) | (Some(_), None) => return Err(mismatch),
                (Some(Primitive::Retain(x)), Some(Primitive::Retain(y))) => {
                    let n = x.min(y);
                    a_prime.push_retain(n);
                    b_prime.push_retain(n);
                    op1 = remainder(x, n, Primitive::Retain, &mut ops1);
                    op2 = remainder(y, n, Primitive::Retain, &mut ops2);
                }
                (Some(Primitive::Delete(x)), Some(Primitive::Delete(y))) => {
                    // Both sides removed the same characters.
                    let n = x.min(y);
                    op1 = remainder(x, n, Primitive::Delete, &mut ops1);
                    op2 = remainder(y, n, Primitive::Delete, &mut ops2);
                }
                (Some(Primitive::Delete(x)), Some(Primitive::Retain(y))) => {
                    let n = x.min(y);
                    a_prime.push_delete(n);
                    op1 = remainder(x, n, Primitive::Delete, &mut ops1);
                    op2 = remainder(y, n, Primitive::Retain, &mut ops2);
                }
                (Some(Primitive::Retain(x)), Some(Primitive::Delete(y))) => {
                    let n = x.min(y);
                    b_prime.push_delete(n);
                    op1 = remainder(x, n, Primitive::Retain, &mut ops1);
                    op2 = remainder(y, n, Primitive::Delete, &mut ops2);
                }
            }
        }

        Ok((a_prime, b_prime))
    }

    /// The single non-retain primitive of an operation shaped like
    /// `[retain] primitive [retain]`.
    fn simple_primitive(&self) -> Option<&Primitive> {
        match self.ops.as_slice() {
            [only] => Some(only),
            [Primitive::Retain(_), second] => Some(second),
            [first, Primitive::Retain(_)] => Some(first),
            [Primitive::Retain(_), middle, Primitive::Retain(_)] => Some(middle),
            _ => None,
        }
    }

    fn start_index(&self) -> usize {
        match self.ops.first() {
            Some(Primitive::Retain(n)) => *n,
            _ => 0,
        }
    }

    /// Whether `other`, made right after `self`, belongs in the same undo
    /// step: consecutive typing or consecutive backspace/delete presses.
    pub fn should_be_composed_with(&self, other: &Operation) -> bool {
        if self.is_noop() || other.is_noop() {
            return true;
        }
        let start_a = self.start_index();
        let start_b = other.start_index();
        match (self.simple_primitive(), other.simple_primitive()) {
            (Some(Primitive::Insert(a)), Some(Primitive::Insert(_))) => {
                start_a + char_len(a) == start_b
            }
            (Some(Primitive::Delete(_)), Some(Primitive::Delete(b))) => {
                // Backspace moves left, the delete key stays in place.
                start_b + b == start_a || start_a == start_b
            }
            _ => false,
        }
    }

    /// Like [`should_be_composed_with`](Self::should_be_composed_with), but for
    /// inverted operations: `a.should_be_composed_with(b)` equals
    /// `b⁻¹.should_be_composed_with_inverted(a⁻¹)`.
    pub fn should_be_composed_with_inverted(&self, other: &Operation) -> bool {
        if self.is_noop() || other.is_noop() {
            return true;
        }
        let start_a = self.start_index();
        let start_b = other.start_index();
        match (self.simple_primitive(), other.simple_primitive()) {
            (Some(Primitive::Insert(a)), Some(Primitive::Insert(_))) => {
                start_a + char_len(a) == start_b || start_a == start_b
            }
            (Some(Primitive::Delete(_)), Some(Primitive::Delete(b))) => start_b + b == start_a,
            _ => false,
        }
    }

    /// Encode as the flat wire list.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Array(
            self.ops
                .iter()
                .map(|op| match op {
                    Primitive::Retain(n) => serde_json::Value::from(*n as i64),
                    Primitive::Insert(text) => serde_json::Value::from(text.as_str()),
                    Primitive::Delete(n) => serde_json::Value::from(-(*n as i64)),
                })
                .collect(),
        )
    }

    /// Decode from the flat wire list.
    pub fn from_json(value: &serde_json::Value) -> Result<Operation> {
        Ok(Operation::deserialize(value)?)
    }

    fn from_wire(elements: Vec<WirePrimitive>) -> Result<Operation> {
        if elements.is_empty() {
            return Err(OtError::Decode("empty operation".to_string()));
        }
        let mut operation = Operation::new();
        for element in elements {
            match element {
                WirePrimitive::Count(n) if n > 0 => operation.push_retain(n as usize),
                WirePrimitive::Count(n) if n < 0 => operation.push_delete(n.unsigned_abs() as usize),
                WirePrimitive::Count(n) => {
                    return Err(OtError::Decode(format!("unknown operation: {}", n)));
                }
                WirePrimitive::Text(text) => operation.push_insert(&text),
            }
        }
        Ok(operation)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, op) in self.ops.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match op {
                Primitive::Retain(n) => write!(f, "retain {}", n)?,
                Primitive::Insert(text) => write!(f, "insert '{}'", text)?,
                Primitive::Delete(n) => write!(f, "delete {}", n)?,
            }
        }
        Ok(())
    }
}

/// One element of the wire list.
#[derive(Deserialize)]
#[serde(untagged)]
enum WirePrimitive {
    Count(i64),
    Text(String),
}

impl Serialize for Operation {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.ops.len()))?;
        for op in &self.ops {
            match op {
                Primitive::Retain(n) => seq.serialize_element(&(*n as i64))?,
                Primitive::Insert(text) => seq.serialize_element(text)?,
                Primitive::Delete(n) => seq.serialize_element(&-(*n as i64))?,
            }
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for Operation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let elements = Vec::<WirePrimitive>::deserialize(deserializer)?;
        Operation::from_wire(elements).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lengths() {
        let mut o = Operation::new();
        assert_eq!(o.base_len(), 0);
        assert_eq!(o.target_len(), 0);

        o.push_retain(5);
        assert_eq!((o.base_len(), o.target_len()), (5, 5));
        o.push_insert("abc");
        assert_eq!((o.base_len(), o.target_len()), (5, 8));
        o.push_retain(2);
        assert_eq!((o.base_len(), o.target_len()), (7, 10));
        o.push_delete(2);
        assert_eq!((o.base_len(), o.target_len()), (9, 10));
    }

    #[test]
    fn test_chaining_skips_empty_primitives() {
        let o = Operation::new()
            .retain(5)
            .retain(0)
            .insert("lorem")
            .insert("")
            .delete(3)
            .delete(3)
            .delete(0);
        assert_eq!(o.ops().len(), 3);
        assert!(Operation::new().retain(0).insert("").delete(0).ops().is_empty());
    }

    #[test]
    fn test_ops_merging() {
        let mut o = Operation::new();
        o.push_retain(2);
        o.push_retain(3);
        assert_eq!(o.ops(), &[Primitive::Retain(5)]);

        o.push_insert("abc");
        o.push_insert("xyz");
        assert_eq!(o.ops().last(), Some(&Primitive::Insert("abcxyz".into())));

        o.push_delete(1);
        o.push_delete(1);
        assert_eq!(o.ops().len(), 3);
        assert_eq!(o.ops().last(), Some(&Primitive::Delete(2)));
    }

    #[test]
    fn test_insert_after_delete_is_reordered() {
        let a = Operation::new().delete(1).insert("lo").retain(2).retain(3);
        let b = Operation::new().insert("l").insert("o").delete(1).retain(5);
        assert_eq!(a, b);
        assert_eq!(a.ops()[0], Primitive::Insert("lo".into()));

        let c = a.clone().delete(1);
        let d = b.clone().retain(1);
        assert_ne!(c, d);
    }

    #[test]
    fn test_is_noop() {
        let o = Operation::new();
        assert!(o.is_noop());
        let o = o.retain(5).retain(3);
        assert!(o.is_noop());
        assert!(!o.insert("lorem").is_noop());
    }

    #[test]
    fn test_apply_and_length_mismatch() {
        let o = Operation::new().retain(6).delete(1).insert("D").retain(4);
        assert_eq!(o.apply("lorem dolor").unwrap(), "lorem Dolor");
        assert_eq!(
            o.apply("lorem"),
            Err(OtError::LengthMismatch {
                expected: 11,
                actual: 5
            })
        );
    }

    #[test]
    fn test_apply_counts_characters_not_bytes() {
        let o = Operation::new().retain(2).insert("ß").delete(1).retain(1);
        assert_eq!(o.apply("héllo").map(|_| ()), Err(OtError::LengthMismatch { expected: 4, actual: 5 }));
        let o = Operation::new().retain(2).insert("ß").delete(1).retain(2);
        assert_eq!(o.apply("héllo").unwrap(), "héßlo");
    }

    #[test]
    fn test_invert() {
        let doc = "Looremipsum";
        let o = Operation::new().retain(2).delete(1).retain(8);
        let inverse = o.invert(doc).unwrap();
        assert_eq!(inverse, Operation::new().retain(2).insert("o").retain(8));
        assert_eq!(inverse.apply(&o.apply(doc).unwrap()).unwrap(), doc);
    }

    #[test]
    fn test_compose() {
        let a = Operation::new().retain(5).insert(" ").retain(5);
        let b = Operation::new().retain(6).delete(1).insert("I").retain(4);
        let ab = a.compose(&b).unwrap();
        assert_eq!(ab.apply("Loremipsum").unwrap(), "Lorem Ipsum");
        assert!(a.compose(&a).is_err());
    }

    #[test]
    fn test_transform_tie_break_puts_first_argument_first() {
        let a = Operation::new().retain(2).insert("a");
        let b = Operation::new().retain(2).insert("b");
        let (a_prime, b_prime) = Operation::transform(&a, &b).unwrap();
        let left = b_prime.apply(&a.apply("xy").unwrap()).unwrap();
        let right = a_prime.apply(&b.apply("xy").unwrap()).unwrap();
        assert_eq!(left, "xyab");
        assert_eq!(left, right);
    }

    #[test]
    fn test_transform_requires_same_base() {
        let a = Operation::new().retain(2);
        let b = Operation::new().retain(3);
        assert!(Operation::transform(&a, &b).is_err());
    }

    #[test]
    fn test_display() {
        let o = Operation::new().retain(2).insert("lorem").delete(5).retain(5);
        assert_eq!(o.to_string(), "retain 2, insert 'lorem', delete 5, retain 5");
    }

    #[test]
    fn test_from_json() {
        let o = Operation::from_json(&json!([2, -1, -1, "cde"])).unwrap();
        assert_eq!(o.ops().len(), 3);
        assert_eq!(o.base_len(), 4);
        assert_eq!(o.target_len(), 5);
        assert_eq!(o.to_json(), json!([2, "cde", -2]));
    }

    #[test]
    fn test_from_json_rejects_malformed_lists() {
        for bad in [
            json!([2, -1, -1, "cde", { "insert": "x" }]),
            json!([2, -1, -1, "cde", null]),
            json!([2, 0]),
            json!([]),
            json!("retain 2"),
        ] {
            assert!(
                matches!(Operation::from_json(&bad), Err(OtError::Decode(_))),
                "expected decode failure for {}",
                bad
            );
        }
    }

    #[test]
    fn test_serde_round_trip() {
        let o = Operation::new().retain(3).insert("héllo").delete(2).retain(1);
        let encoded = serde_json::to_string(&o).unwrap();
        assert_eq!(encoded, r#"[3,"héllo",-2,1]"#);
        let decoded: Operation = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, o);
    }

    #[test]
    fn test_should_be_composed_with() {
        let a = Operation::new().retain(3);
        let b = Operation::new().retain(1).insert("tag").retain(2);
        assert!(a.should_be_composed_with(&b));
        assert!(b.should_be_composed_with(&a));

        let a = Operation::new().retain(1).insert("a").retain(2);
        let b = Operation::new().retain(2).insert("b").retain(2);
        assert!(a.should_be_composed_with(&b));
        let a = a.delete(3);
        assert!(!a.should_be_composed_with(&b));

        let a = Operation::new().retain(1).insert("b").retain(2);
        let b = Operation::new().retain(1).insert("a").retain(3);
        assert!(!a.should_be_composed_with(&b));

        let a = Operation::new().retain(4).delete(3).retain(10);
        let b = Operation::new().retain(2).delete(2).retain(10);
        assert!(a.should_be_composed_with(&b));
        let b = Operation::new().retain(4).delete(7).retain(3);
        assert!(a.should_be_composed_with(&b));
        let b = Operation::new().retain(2).delete(9).retain(3);
        assert!(!a.should_be_composed_with(&b));
    }
}
