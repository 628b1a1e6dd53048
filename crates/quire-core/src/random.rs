//! Random documents and operations for randomized tests and stress runs.

use crate::operation::{char_len, Operation};
use rand::Rng;

/// `n` characters of lowercase letters and newlines, with the occasional
/// multi-byte character.
pub fn random_string<R: Rng + ?Sized>(rng: &mut R, n: usize) -> String {
    (0..n)
        .map(|_| {
            let roll: f64 = rng.gen();
            if roll < 0.15 {
                '\n'
            } else if roll < 0.2 {
                ['é', 'ß', 'ø', '€'][rng.gen_range(0..4)]
            } else {
                rng.gen_range(b'a'..=b'z') as char
            }
        })
        .collect()
}

/// A random operation whose base length matches `doc`.
pub fn random_operation<R: Rng + ?Sized>(rng: &mut R, doc: &str) -> Operation {
    let len = char_len(doc);
    let mut operation = Operation::new();
    while operation.base_len() < len {
        let left = len - operation.base_len();
        let n = 1 + rng.gen_range(0..left.min(20));
        let roll: f64 = rng.gen();
        if roll < 0.2 {
            operation.push_insert(&random_string(rng, n));
        } else if roll < 0.4 {
            operation.push_delete(n);
        } else {
            operation.push_retain(n);
        }
    }
    if rng.gen_bool(0.3) {
        let tail = random_string(rng, 10);
        operation.push_insert(&format!("1{}", tail));
    }
    operation
}

/// A keystroke-sized edit at a random position of `doc`: up to five inserted
/// characters, or up to three deleted ones.
pub fn random_edit<R: Rng + ?Sized>(rng: &mut R, doc: &str) -> Operation {
    let len = char_len(doc);
    let position = rng.gen_range(0..=len);
    let mut operation = Operation::new().retain(position);
    if position < len && rng.gen_bool(0.4) {
        let n = 1 + rng.gen_range(0..(len - position).min(3));
        operation.push_delete(n);
        operation.push_retain(len - position - n);
    } else {
        let n = 1 + rng.gen_range(0..5);
        let text = random_string(rng, n);
        operation.push_insert(&text);
        operation.push_retain(len - position);
    }
    operation
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_random_operation_fits_document() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..100 {
            let doc = random_string(&mut rng, 40);
            assert_eq!(char_len(&doc), 40);
            let op = random_operation(&mut rng, &doc);
            assert_eq!(op.base_len(), 40);
            assert!(op.apply(&doc).is_ok());
        }
    }

    #[test]
    fn test_random_edit_is_small() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut doc = String::new();
        for _ in 0..200 {
            let before = char_len(&doc);
            let op = random_edit(&mut rng, &doc);
            assert_eq!(op.base_len(), before);
            doc = op.apply(&doc).unwrap();
            let after = char_len(&doc);
            assert!(after <= before + 5);
            assert!(after + 3 >= before);
        }
    }

    #[test]
    fn test_random_operation_on_empty_document() {
        let mut rng = StdRng::seed_from_u64(2);
        let op = random_operation(&mut rng, "");
        assert_eq!(op.base_len(), 0);
    }
}
